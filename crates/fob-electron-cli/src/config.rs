//! Turning command-line flags into an [`InlineConfig`] and a
//! [`ProcessContext`].
//!
//! Flags are layered over the defaults with figment, the same way a config
//! file would be. The user's `electron.fob.config.*` file is loaded later by
//! the resolver and sits underneath these overrides.

use std::path::{Path, PathBuf};

use figment::{Figment, providers::Serialized};
use fob_electron_config::{
    BuildOptions, ConfigCommand, InlineConfig, LaunchOptions, Phase, ProcessContext,
    RuntimeOverrides, TargetConfig, Toggle, WatchOptions,
};

use crate::cli::SharedArgs;
use crate::error::{CliError, Result};

/// Inline overrides expressed by the flags alone.
fn flag_overrides(shared: &SharedArgs, watch: bool) -> InlineConfig {
    let build = BuildOptions {
        out_dir: shared.out_dir.clone(),
        sourcemap: shared.sourcemap.then_some(Toggle::Enabled(true)),
        watch: watch.then(WatchOptions::default),
        ..Default::default()
    };

    InlineConfig {
        config_file: shared.config.clone(),
        ignore_config_warning: shared.ignore_config_warning,
        log_level: shared.log_level.map(|level| level.as_str().to_string()),
        clear_screen: shared.clear_screen,
        target: TargetConfig {
            mode: shared.mode.clone(),
            build: (build != BuildOptions::default()).then_some(build),
            ..Default::default()
        },
    }
}

/// Layer the flags over the default inline config.
///
/// `watch` is only set by `dev -w`.
pub fn inline_config(shared: &SharedArgs, watch: bool) -> Result<InlineConfig> {
    Figment::new()
        .merge(Serialized::defaults(InlineConfig::default()))
        .merge(Serialized::defaults(flag_overrides(shared, watch)))
        .extract()
        .map_err(|e| CliError::InvalidOptions(e.to_string()))
}

/// Absolute project root from the positional `[root]`.
pub fn project_root(root: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match root {
        Some(root) if root.is_absolute() => root.to_path_buf(),
        Some(root) => path_clean::clean(cwd.join(root)),
        None => cwd,
    })
}

/// Build the context for one workflow.
///
/// Launch flags win over the `ELECTRON_*`, `V8_INSPECTOR_*`,
/// `REMOTE_DEBUGGING_PORT` and `NO_SANDBOX` environment variables.
pub fn process_context(
    shared: &SharedArgs,
    phase: Phase,
    command: ConfigCommand,
    launch: LaunchOptions,
) -> Result<ProcessContext> {
    let root = project_root(shared.root.as_deref())?;
    let launch = LaunchOptions {
        entry: launch.entry.or_else(|| shared.entry.clone()),
        ..launch
    }
    .or(LaunchOptions::from_env()?);

    Ok(ProcessContext::new(root, phase, command)
        .with_runtime(RuntimeOverrides::from_env())
        .with_launch(launch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LogLevel;
    use serial_test::serial;

    fn shared() -> SharedArgs {
        SharedArgs {
            config: Some(PathBuf::from("configs/electron.fob.config.ts")),
            log_level: Some(LogLevel::Warn),
            mode: Some("staging".to_string()),
            sourcemap: true,
            out_dir: Some(PathBuf::from("dist")),
            ..Default::default()
        }
    }

    #[test]
    fn flags_land_in_inline_config() {
        let inline = inline_config(&shared(), true).unwrap();
        assert_eq!(
            inline.config_file,
            Some(PathBuf::from("configs/electron.fob.config.ts"))
        );
        assert_eq!(inline.log_level.as_deref(), Some("warn"));
        assert_eq!(inline.mode(), Some("staging"));
        assert_eq!(inline.out_dir(), Some(Path::new("dist")));
        assert!(inline.target.is_watch());

        let build = inline.target.build().unwrap();
        assert_eq!(build.sourcemap, Some(Toggle::Enabled(true)));
    }

    #[test]
    fn no_flags_means_no_overrides() {
        let inline = inline_config(&SharedArgs::default(), false).unwrap();
        assert_eq!(inline, InlineConfig::default());
    }

    #[test]
    fn relative_root_is_resolved_against_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            project_root(Some(Path::new("./app/../web"))).unwrap(),
            cwd.join("web")
        );
        assert_eq!(project_root(None).unwrap(), cwd);
    }

    #[test]
    #[serial]
    fn entry_flag_wins_over_environment() {
        unsafe { std::env::set_var("ELECTRON_ENTRY", "from-env.js") };
        let args = SharedArgs {
            entry: Some(PathBuf::from("from-flag.js")),
            ..Default::default()
        };
        let process = process_context(
            &args,
            Phase::Production,
            ConfigCommand::Build,
            LaunchOptions::default(),
        );
        unsafe { std::env::remove_var("ELECTRON_ENTRY") };

        let process = process.unwrap();
        assert_eq!(process.launch.entry, Some(PathBuf::from("from-flag.js")));
        assert_eq!(process.phase, Phase::Production);
    }
}

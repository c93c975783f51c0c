#[cfg(test)]
mod tests {
    use crate::cli::validation::parse_port;
    use crate::cli::{Cli, Command, LogLevel};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("9222"), Ok("9222".to_string()));
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("abc").is_err());
    }

    #[test]
    fn test_no_subcommand_means_dev() {
        let cli = Cli::try_parse_from(["fob-electron"]).unwrap();
        assert!(matches!(cli.command(), Command::Dev(_)));
    }

    #[test]
    fn test_root_without_subcommand() {
        let cli = Cli::try_parse_from(["fob-electron", "app", "-w", "--rendererOnly"]).unwrap();
        match cli.command() {
            Command::Dev(args) => {
                assert_eq!(args.shared.root, Some(PathBuf::from("app")));
                assert!(args.watch);
                assert!(args.renderer_only);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_serve_alias() {
        let cli = Cli::try_parse_from(["fob-electron", "serve", "--noSandbox"]).unwrap();
        match cli.command() {
            Command::Dev(args) => assert!(args.no_sandbox),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_inspect_defaults_to_5858() {
        let cli = Cli::try_parse_from(["fob-electron", "dev", "--inspect"]).unwrap();
        match cli.command() {
            Command::Dev(args) => {
                assert_eq!(args.inspect.as_deref(), Some("5858"));
                assert_eq!(args.inspect_brk, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["fob-electron", "dev", "--inspectBrk=9230"]).unwrap();
        match cli.command() {
            Command::Dev(args) => assert_eq!(args.inspect_brk.as_deref(), Some("9230")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_build_shared_flags() {
        let cli = Cli::try_parse_from([
            "fob-electron",
            "build",
            "app",
            "-c",
            "custom.config.ts",
            "-l",
            "warn",
            "-m",
            "staging",
            "--sourcemap",
            "--outDir",
            "dist",
            "--entry",
            "dist/main.js",
        ])
        .unwrap();

        assert_eq!(cli.shared().log_level, Some(LogLevel::Warn));
        match cli.command() {
            Command::Build(args) => {
                let shared = args.shared;
                assert_eq!(shared.root, Some(PathBuf::from("app")));
                assert_eq!(shared.config, Some(PathBuf::from("custom.config.ts")));
                assert_eq!(shared.mode.as_deref(), Some("staging"));
                assert!(shared.sourcemap);
                assert_eq!(shared.out_dir, Some(PathBuf::from("dist")));
                assert_eq!(shared.entry, Some(PathBuf::from("dist/main.js")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_preview_flags_and_passthrough() {
        let cli = Cli::try_parse_from([
            "fob-electron",
            "preview",
            "--skipBuild",
            "--noSandbox",
            "--",
            "--enable-logging",
        ])
        .unwrap();

        match cli.command() {
            Command::Preview(args) => {
                assert!(args.skip_build);
                assert!(args.no_sandbox);
                assert_eq!(args.electron_args, vec!["--enable-logging"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_build_rejects_dev_only_flags() {
        assert!(Cli::try_parse_from(["fob-electron", "build", "--watch"]).is_err());
        assert!(Cli::try_parse_from(["fob-electron", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_clear_screen_value() {
        let cli = Cli::try_parse_from(["fob-electron", "--clearScreen", "false"]).unwrap();
        assert_eq!(cli.shared().clear_screen, Some(false));
        let cli = Cli::try_parse_from(["fob-electron", "--clearScreen"]).unwrap();
        assert_eq!(cli.shared().clear_screen, Some(true));
    }
}

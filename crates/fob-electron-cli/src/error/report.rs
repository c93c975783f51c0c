//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundler(e) => bundler_error_to_miette(e),
        CliError::Failed { during, source } => {
            cli_error_to_miette(*source).wrap_err(format!("error during {during}"))
        }
        CliError::Config(e) => miette::miette!("{}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert fob-electron-bundler Error to miette Report
pub fn bundler_error_to_miette(err: fob_electron_bundler::Error) -> Report {
    // The bundler error carries its own code and help text.
    Report::new(err)
}

pub mod app;
pub mod cli;
pub mod commands;
pub mod infra;
pub mod oauth;
pub mod psd2;
pub mod shared;

use commands::oauth_check::{self, RunOutcome};
use std::process::ExitCode;

const EXIT_SETUP_FAILED: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

/// Loads settings, runs the check and maps the outcome to a process exit code.
///
/// Step failures (state mismatch, timeout, HTTP errors) are reported on the console and still
/// count as a completed run; only setup failures and interrupts change the exit code.
pub async fn run(cli: cli::Cli) -> ExitCode {
    let settings = match infra::settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_SETUP_FAILED);
        }
    };

    match oauth_check::run(&settings, &cli.options()).await {
        Ok(RunOutcome::Completed(report)) => {
            if report.token.is_ok() {
                println!("Check completed successfully");
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_SETUP_FAILED)
        }
    }
}

use clap::Parser;
use piraeus_oauth_check_lib::{app::logging, cli::Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    // Panic payloads may echo tokens; only the location is logged.
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(location = %location, "PANIC: piraeus-oauth-check panicked at {location}");
    }));

    piraeus_oauth_check_lib::run(Cli::parse()).await
}

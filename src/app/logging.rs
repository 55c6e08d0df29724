//! Usage: Tracing subscriber setup (stderr, `RUST_LOG` aware).

use tracing_subscriber::EnvFilter;

/// Our own events at info, dependencies at warn. The operator trace goes to stdout separately.
const DEFAULT_FILTER: &str = "warn,piraeus_oauth_check_lib=info,piraeus_oauth_check=info";

pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if let Err(err) = result {
        eprintln!("logging already initialised: {err}");
    }
}

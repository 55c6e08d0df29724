//! Usage: Command-line arguments.

use crate::commands::oauth_check::OAuthCheckOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Check the Piraeus Bank OAuth flow: open the browser, capture the callback and exchange
/// the authorization code for an access token
#[derive(Parser, Debug, Clone)]
#[command(name = "piraeus-oauth-check")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port for the local callback server
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Seconds to wait for the OAuth callback
    #[arg(long, default_value_t = 300, value_name = "SECONDS")]
    pub timeout: u64,

    /// Don't open a browser, just print the URL
    #[arg(long)]
    pub no_browser: bool,

    /// After getting a token, create a PSD2 consent and list accounts
    #[arg(long)]
    pub test_api: bool,

    /// Settings file (TOML); `piraeus-oauth.toml` is used when present
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn options(&self) -> OAuthCheckOptions {
        OAuthCheckOptions {
            port: self.port,
            timeout: Duration::from_secs(self.timeout),
            open_browser: !self.no_browser,
            test_api: self.test_api,
        }
    }
}

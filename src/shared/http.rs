//! Usage: Shared reqwest client construction and transport-error classification.

use crate::shared::error::{AppError, AppResult, INTERNAL_ERROR, NETWORK_ERROR, TLS_ERROR};
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(format!(
            "piraeus-oauth-check/{}",
            env!("CARGO_PKG_VERSION")
        ))
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
}

/// Plain HTTPS client for the OAuth endpoints.
pub fn oauth_http_client() -> AppResult<reqwest::Client> {
    client_builder()
        .build()
        .map_err(|e| AppError::new(INTERNAL_ERROR, format!("oauth client init failed: {e}")))
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(next) = current {
        parts.push(next.to_string());
        current = next.source();
    }
    parts.join(": ")
}

fn looks_like_tls_failure(chain: &str) -> bool {
    let lc = chain.to_ascii_lowercase();
    ["certificate", "handshake", "tls", "alert", "rustls"]
        .iter()
        .any(|needle| lc.contains(needle))
}

/// Maps a failed `send()` to `TLS_ERROR` (handshake/certificate problems) or `NETWORK_ERROR`.
pub(crate) fn classify_send_error(step: &str, err: reqwest::Error) -> AppError {
    let chain = error_chain_text(&err);
    if err.is_timeout() {
        return AppError::new(
            NETWORK_ERROR,
            format!(
                "{step} timed out after {}s: {chain}",
                REQUEST_TIMEOUT.as_secs()
            ),
        )
        .with_source(err);
    }
    if err.is_connect() && looks_like_tls_failure(&chain) {
        return AppError::new(TLS_ERROR, format!("{step} tls handshake failed: {chain}"))
            .with_source(err);
    }
    AppError::new(NETWORK_ERROR, format!("{step} request failed: {chain}")).with_source(err)
}

/// Reads the body of a response that already arrived; read failures are network errors.
pub(crate) async fn read_body(step: &str, response: reqwest::Response) -> AppResult<String> {
    response.text().await.map_err(|e| {
        AppError::new(
            NETWORK_ERROR,
            format!("{step} response read failed: {}", error_chain_text(&e)),
        )
        .with_source(e)
    })
}

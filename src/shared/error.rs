//! Usage: Unified error model for the flow (every failure carries a `CODE: message` pair).

use std::sync::Arc;

pub type AppResult<T> = Result<T, AppError>;

/// Missing client credentials or an unreadable settings file.
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
/// The callback port is already taken.
pub const BIND_ERROR: &str = "BIND_ERROR";
/// Callback state missing or different from the one we generated.
pub const STATE_MISMATCH: &str = "STATE_MISMATCH";
/// The provider redirected back with `error=...`.
pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
pub const TIMEOUT: &str = "TIMEOUT";
/// Non-success HTTP status from the token, consent or accounts endpoint.
pub const HTTP_ERROR: &str = "HTTP_ERROR";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Client certificate or private key file not found.
pub const CERT_MISSING: &str = "CERT_MISSING";
pub const TLS_ERROR: &str = "TLS_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    code: String,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

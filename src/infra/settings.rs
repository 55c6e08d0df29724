//! Usage: Flow settings (client credentials, endpoints, mTLS material) and their loading order.
//!
//! Sources, later wins: built-in defaults, optional TOML file, `.env`, process environment.
//! `.env` never overrides variables already present in the environment.

use crate::shared::error::{AppError, AppResult, CONFIG_ERROR};
use crate::shared::security::mask_token;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "piraeus-oauth.toml";
/// Read from the working directory only; parent directories are not searched.
const DOTENV_FILE: &str = ".env";
pub const DEFAULT_OAUTH_BASE_URL: &str =
    "https://api.rapidlink.piraeusbank.gr/piraeusbank/production/v3/oauth/oauth2";
pub const DEFAULT_PSD2_BASE_URL: &str =
    "https://api.rapidlink.piraeusbank.gr/piraeusbank/production/psd2/v3.1";
pub const DEFAULT_SCOPE: &str = "sandboxapi offline_access";
pub const DEFAULT_CERTIFICATE_PATH: &str = "certificate.crt";
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "private.key";

pub const ENV_CLIENT_ID: &str = "PIRAEUS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "PIRAEUS_CLIENT_SECRET";
pub const ENV_CERT_PATH: &str = "PIRAEUS_CERT_PATH";
pub const ENV_KEY_PATH: &str = "PIRAEUS_KEY_PATH";
pub const ENV_OAUTH_BASE_URL: &str = "PIRAEUS_OAUTH_BASE_URL";
pub const ENV_PSD2_BASE_URL: &str = "PIRAEUS_PSD2_BASE_URL";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_base_url: String,
    pub psd2_base_url: String,
    pub scope: String,
    pub certificate_path: PathBuf,
    pub private_key_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            psd2_base_url: DEFAULT_PSD2_BASE_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            certificate_path: PathBuf::from(DEFAULT_CERTIFICATE_PATH),
            private_key_path: PathBuf::from(DEFAULT_PRIVATE_KEY_PATH),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask_token(&self.client_secret))
            .field("oauth_base_url", &self.oauth_base_url)
            .field("psd2_base_url", &self.psd2_base_url)
            .field("scope", &self.scope)
            .field("certificate_path", &self.certificate_path)
            .field("private_key_path", &self.private_key_path)
            .finish()
    }
}

impl Settings {
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.oauth_base_url)
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.oauth_base_url)
    }

    pub fn consents_url(&self) -> String {
        format!("{}/consents", self.psd2_base_url)
    }

    pub fn accounts_url(&self) -> String {
        format!("{}/accounts", self.psd2_base_url)
    }

    /// Fails with `CONFIG_ERROR` unless both client credentials are present.
    pub fn validate(&self) -> AppResult<()> {
        if self.client_id.is_empty() {
            return Err(AppError::new(
                CONFIG_ERROR,
                format!("{ENV_CLIENT_ID} is not set; add it to the environment, .env or the config file"),
            ));
        }
        if self.client_secret.is_empty() {
            return Err(AppError::new(
                CONFIG_ERROR,
                format!("{ENV_CLIENT_SECRET} is not set; add it to the environment, .env or the config file"),
            ));
        }
        Ok(())
    }
}

/// Loads settings from `config_path` (or `piraeus-oauth.toml` when present), `./.env` and the
/// process environment, then validates the credentials.
pub fn load(config_path: Option<&Path>) -> AppResult<Settings> {
    let file_content = read_config_file(config_path)?;

    match dotenvy::from_path(DOTENV_FILE) {
        Ok(()) => tracing::debug!("loaded {}", DOTENV_FILE),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!("ignoring unreadable .env: {}", err),
    }

    let settings = resolve(file_content.as_deref(), |key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

fn read_config_file(config_path: Option<&Path>) -> AppResult<Option<String>> {
    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), "read settings file");
            Ok(Some(content))
        }
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AppError::new(
            CONFIG_ERROR,
            format!("failed to read config file {}: {err}", path.display()),
        )
        .with_source(err)),
    }
}

/// Merges defaults, the TOML document and environment lookups. Does not validate.
pub(crate) fn resolve(
    file_content: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> AppResult<Settings> {
    let mut settings = match file_content {
        Some(content) => parse_settings_toml(content)?,
        None => Settings::default(),
    };

    let non_empty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = non_empty(ENV_CLIENT_ID) {
        settings.client_id = v;
    }
    if let Some(v) = non_empty(ENV_CLIENT_SECRET) {
        settings.client_secret = v;
    }
    if let Some(v) = non_empty(ENV_OAUTH_BASE_URL) {
        settings.oauth_base_url = v;
    }
    if let Some(v) = non_empty(ENV_PSD2_BASE_URL) {
        settings.psd2_base_url = v;
    }
    if let Some(v) = non_empty(ENV_CERT_PATH) {
        settings.certificate_path = PathBuf::from(v);
    }
    if let Some(v) = non_empty(ENV_KEY_PATH) {
        settings.private_key_path = PathBuf::from(v);
    }

    sanitize(&mut settings);
    Ok(settings)
}

fn parse_settings_toml(content: &str) -> AppResult<Settings> {
    toml::from_str(content).map_err(|e| {
        AppError::new(CONFIG_ERROR, format!("invalid config file: {e}")).with_source(e)
    })
}

fn sanitize(settings: &mut Settings) {
    settings.client_id = settings.client_id.trim().to_string();
    settings.client_secret = settings.client_secret.trim().to_string();
    settings.scope = settings.scope.trim().to_string();
    if settings.scope.is_empty() {
        settings.scope = DEFAULT_SCOPE.to_string();
    }
    settings.oauth_base_url = sanitize_base_url(&settings.oauth_base_url, DEFAULT_OAUTH_BASE_URL);
    settings.psd2_base_url = sanitize_base_url(&settings.psd2_base_url, DEFAULT_PSD2_BASE_URL);
}

fn sanitize_base_url(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

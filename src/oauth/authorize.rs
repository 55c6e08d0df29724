//! Usage: Authorization request construction (state generation + authorize URL).

use crate::infra::settings::Settings;
use crate::shared::error::{AppError, AppResult, INTERNAL_ERROR};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::Url;

const STATE_BYTES: usize = 32;
pub const CALLBACK_PATH: &str = "/callback";

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub redirect_uri: String,
}

pub fn make_redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{CALLBACK_PATH}")
}

/// 32 random bytes from the OS, URL-safe base64 without padding.
pub(crate) fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn build_authorization_request(
    settings: &Settings,
    redirect_uri: &str,
) -> AppResult<AuthorizationRequest> {
    let state = generate_state();
    let url = build_authorize_url(
        &settings.authorize_url(),
        &settings.client_id,
        &settings.scope,
        redirect_uri,
        &state,
    )?;
    Ok(AuthorizationRequest {
        url,
        state,
        redirect_uri: redirect_uri.to_string(),
    })
}

fn build_authorize_url(
    authorize_url: &str,
    client_id: &str,
    scope: &str,
    redirect_uri: &str,
    state: &str,
) -> AppResult<String> {
    let mut url = Url::parse(authorize_url).map_err(|e| {
        AppError::new(INTERNAL_ERROR, format!("invalid authorize url {authorize_url}: {e}"))
    })?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("scope", scope)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state);
    Ok(url.to_string())
}

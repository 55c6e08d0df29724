//! Usage: PSD2 consent/accounts calls used to prove an access token works.
//!
//! Both endpoints sit behind mutual TLS and the IBM API gateway, so every request carries
//! `x-ibm-client-id` and a fresh `X-Request-ID`.

pub mod accounts;
pub mod consent;
pub mod mtls;
pub mod probe;

use crate::infra::settings::Settings;
use crate::oauth::token_exchange::sanitize_error_body_snippet;
use crate::shared::error::{AppError, AppResult, HTTP_ERROR, INTERNAL_ERROR};
use crate::shared::http::{classify_send_error, read_body};
use accounts::AccountsResult;
use consent::{ConsentRequest, ConsentResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

const HEADER_REQUEST_ID: &str = "X-Request-ID";
const HEADER_CLIENT_ID: &str = "x-ibm-client-id";
const HEADER_CONSENT_ID: &str = "Consent-ID";
const JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct Psd2Client {
    http: reqwest::Client,
    client_id: String,
    consents_url: String,
    accounts_url: String,
}

impl Psd2Client {
    pub fn new(http: reqwest::Client, settings: &Settings) -> Self {
        Self {
            http,
            client_id: settings.client_id.clone(),
            consents_url: settings.consents_url(),
            accounts_url: settings.accounts_url(),
        }
    }

    /// Loads the client certificate and key named in `settings` and builds an mTLS client.
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let http = mtls::build_mtls_client(&settings.certificate_path, &settings.private_key_path)?;
        Ok(Self::new(http, settings))
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        access_token: &str,
    ) -> reqwest::RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%request_id, %url, "psd2 request");
        self.http
            .request(method, url)
            .bearer_auth(access_token)
            .header(HEADER_REQUEST_ID, request_id)
            .header(HEADER_CLIENT_ID, &self.client_id)
            .header(ACCEPT, JSON)
    }

    /// Creates a recurring all-accounts consent. 200 and 201 both count as success.
    pub async fn create_consent(&self, access_token: &str) -> AppResult<ConsentResult> {
        let body = ConsentRequest::all_accounts(chrono::Local::now().date_naive());
        let body = serde_json::to_vec(&body).map_err(|e| {
            AppError::new(INTERNAL_ERROR, format!("consent body encode failed: {e}"))
        })?;

        let response = self
            .request(reqwest::Method::POST, &self.consents_url, access_token)
            .header(CONTENT_TYPE, JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_send_error("consent creation", e))?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "consent endpoint responded");
        let text = read_body("consent creation", response).await?;
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(status_error("consent creation", status, &text));
        }
        Ok(ConsentResult::from_value(parse_json("consent", &text)?))
    }

    /// Lists accounts; `consent_id` is sent as `Consent-ID` when present.
    pub async fn list_accounts(
        &self,
        access_token: &str,
        consent_id: Option<&str>,
    ) -> AppResult<AccountsResult> {
        let mut request = self.request(reqwest::Method::GET, &self.accounts_url, access_token);
        if let Some(consent_id) = consent_id {
            request = request.header(HEADER_CONSENT_ID, consent_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error("accounts request", e))?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "accounts endpoint responded");
        let text = read_body("accounts request", response).await?;
        if status != StatusCode::OK {
            return Err(status_error("accounts request", status, &text));
        }
        AccountsResult::from_value(parse_json("accounts", &text)?)
    }
}

fn status_error(step: &str, status: StatusCode, body: &str) -> AppError {
    AppError::new(
        HTTP_ERROR,
        format!(
            "{step} failed with status={} body={}",
            status.as_u16(),
            sanitize_error_body_snippet(body)
        ),
    )
}

fn parse_json(what: &str, text: &str) -> AppResult<Value> {
    serde_json::from_str(text).map_err(|e| {
        AppError::new(HTTP_ERROR, format!("{what} response json invalid: {e}")).with_source(e)
    })
}

//! Usage: Authorization-code for token exchange against the provider token endpoint.

use crate::shared::error::{AppError, AppResult, HTTP_ERROR};
use crate::shared::http::{classify_send_error, read_body};
use crate::shared::security::{abbreviate_token, is_sensitive_key, mask_token};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::fmt;

const ERROR_BODY_SNIPPET_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct TokenExchangeRequest {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub code: String,
    pub redirect_uri: String,
}

/// Decoded token endpoint payload. Fields the provider adds beyond the standard ones are kept
/// in `extra` untouched.
#[derive(Clone, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub extra: Map<String, Value>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &mask_token(&self.access_token))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(mask_token),
            )
            .field("scope", &self.scope)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TokenResponse {
    /// Human-readable report lines; tokens are abbreviated, sensitive extras masked.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Access Token: {}", abbreviate_token(&self.access_token)),
            format!("Token Type: {}", non_empty_or_na(&self.token_type)),
            match self.expires_in {
                Some(secs) => format!("Expires In: {secs} seconds"),
                None => "Expires In: N/A".to_string(),
            },
        ];
        if let Some(refresh) = self.refresh_token.as_deref() {
            lines.push(format!("Refresh Token: {}", abbreviate_token(refresh)));
        }
        if let Some(scope) = self.scope.as_deref() {
            lines.push(format!("Scope: {scope}"));
        }
        for (key, value) in &self.extra {
            let rendered = match value {
                Value::String(s) if is_sensitive_key(key) => mask_token(s),
                Value::String(s) => s.clone(),
                other => {
                    let mut other = other.clone();
                    redact_sensitive_json_fields(&mut other);
                    other.to_string()
                }
            };
            lines.push(format!("{key}: {rendered}"));
        }
        lines
    }
}

fn non_empty_or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Single attempt, no retry. Only HTTP 200 counts as success.
pub async fn exchange_code_for_token(
    client: &reqwest::Client,
    req: &TokenExchangeRequest,
) -> AppResult<TokenResponse> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", req.code.trim()),
        ("client_id", req.client_id.trim()),
        ("client_secret", req.client_secret.trim()),
        ("redirect_uri", req.redirect_uri.trim()),
    ];

    tracing::debug!(token_uri = %req.token_uri, "exchanging authorization code");
    let response = client
        .post(req.token_uri.trim())
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| classify_send_error("token exchange", e))?;

    let status = response.status();
    tracing::info!(status = status.as_u16(), "token endpoint responded");
    let body = read_body("token exchange", response).await?;
    parse_token_response(status, &body)
}

pub(crate) fn parse_token_response(status: StatusCode, body: &str) -> AppResult<TokenResponse> {
    if status != StatusCode::OK {
        let (error_code, error_message) = parse_oauth_error_details(body);
        let mut msg = format!("token endpoint returned status={}", status.as_u16());
        if let Some(code) = error_code {
            msg.push_str(" code=");
            msg.push_str(code.as_str());
        }
        if let Some(detail) = error_message {
            msg.push_str(" message=");
            msg.push_str(detail.chars().take(240).collect::<String>().as_str());
        }
        msg.push_str(" body=");
        msg.push_str(sanitize_error_body_snippet(body).as_str());
        return Err(AppError::new(HTTP_ERROR, msg));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        AppError::new(HTTP_ERROR, format!("token response json invalid: {e}")).with_source(e)
    })?;
    let Value::Object(mut map) = value else {
        return Err(AppError::new(HTTP_ERROR, "token response is not a json object"));
    };

    let access_token = take_non_empty_string(&mut map, "access_token")
        .ok_or_else(|| AppError::new(HTTP_ERROR, "token response missing access_token"))?;
    let token_type = take_non_empty_string(&mut map, "token_type").unwrap_or_default();
    let expires_in = map.remove("expires_in").as_ref().and_then(parse_i64_lossy);
    let refresh_token = take_non_empty_string(&mut map, "refresh_token");
    let scope = take_non_empty_string(&mut map, "scope");

    Ok(TokenResponse {
        access_token,
        token_type,
        expires_in,
        refresh_token,
        scope,
        extra: map,
    })
}

fn take_non_empty_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    let value = map.remove(key)?;
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        other => {
            // Not a string: keep it visible to the operator rather than dropping it.
            map.insert(key.to_string(), other);
            None
        }
    }
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

pub(crate) fn sanitize_error_body_snippet(body: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(ERROR_BODY_SNIPPET_CHARS).collect();
        }
    }
    body.chars().take(ERROR_BODY_SNIPPET_CHARS).collect()
}

fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut code = non_empty(value.get("code"));
    let mut message = non_empty(value.get("error_description"))
        .or_else(|| non_empty(value.get("moreInformation")));

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            if code.is_none() {
                code = Some(err_str.trim().to_string());
            }
        } else if let Some(err_obj) = error_value.as_object() {
            if code.is_none() {
                code = non_empty(err_obj.get("code")).or_else(|| non_empty(err_obj.get("type")));
            }
            if message.is_none() {
                message = non_empty(err_obj.get("message"));
            }
        }
    }

    (code, message)
}

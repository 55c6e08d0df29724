//! Usage: PSD2 account list payloads.

use crate::oauth::token_exchange::redact_sensitive_json_fields;
use crate::shared::error::{AppError, AppResult, HTTP_ERROR};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub iban: Option<String>,
    pub currency: Option<String>,
    pub product: Option<String>,
    pub cash_account_type: Option<String>,
    pub name: Option<String>,
    pub resource_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountRecord {
    pub fn summary_lines(&self) -> Vec<String> {
        let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        vec![
            format!("IBAN: {}", na(&self.iban)),
            format!("Currency: {}", na(&self.currency)),
            format!("Product: {}", na(&self.product)),
            format!("Type: {}", na(&self.cash_account_type)),
            format!("Name: {}", na(&self.name)),
            format!("Resource ID: {}", na(&self.resource_id)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountsResult {
    pub accounts: Vec<AccountRecord>,
    pub raw: Value,
}

impl AccountsResult {
    pub(crate) fn from_value(raw: Value) -> AppResult<Self> {
        let accounts = match raw.get("accounts") {
            None | Some(Value::Null) => Vec::new(),
            Some(list) => Vec::<AccountRecord>::deserialize(list).map_err(|e| {
                AppError::new(HTTP_ERROR, format!("accounts response malformed: {e}"))
                    .with_source(e)
            })?,
        };
        Ok(Self { accounts, raw })
    }

    /// The whole response as indented JSON, secrets masked.
    pub fn pretty_response(&self) -> String {
        let mut redacted = self.raw.clone();
        redact_sensitive_json_fields(&mut redacted);
        serde_json::to_string_pretty(&redacted).unwrap_or_else(|_| redacted.to_string())
    }
}

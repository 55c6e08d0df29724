//! Usage: PSD2 consent creation payloads.

use crate::oauth::token_exchange::redact_sensitive_json_fields;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use serde_json::Value;

pub(crate) const CONSENT_VALIDITY_DAYS: u64 = 90;
const FREQUENCY_PER_DAY: u32 = 255;
const ALL_ACCOUNTS: &str = "allAccounts";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConsentAccess {
    accounts: Vec<Value>,
    balances: Vec<Value>,
    all_psd2: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConsentRequest {
    access: ConsentAccess,
    recurring_indicator: bool,
    valid_until: String,
    frequency_per_day: u32,
    combined_service_indicator: bool,
}

impl ConsentRequest {
    /// Recurring all-accounts consent valid for 90 days from `today`.
    pub(crate) fn all_accounts(today: NaiveDate) -> Self {
        let valid_until = today
            .checked_add_days(Days::new(CONSENT_VALIDITY_DAYS))
            .unwrap_or(NaiveDate::MAX);
        Self {
            access: ConsentAccess {
                accounts: Vec::new(),
                balances: Vec::new(),
                all_psd2: ALL_ACCOUNTS,
            },
            recurring_indicator: true,
            valid_until: valid_until.format("%Y-%m-%d").to_string(),
            frequency_per_day: FREQUENCY_PER_DAY,
            combined_service_indicator: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsentResult {
    pub consent_id: Option<String>,
    pub consent_status: Option<String>,
    pub raw: Value,
}

impl ConsentResult {
    pub(crate) fn from_value(raw: Value) -> Self {
        let field = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            consent_id: field("consentId"),
            consent_status: field("consentStatus"),
            raw,
        }
    }

    /// One `key: value` line per top-level field of the response, secrets masked.
    pub fn response_lines(&self) -> Vec<String> {
        let mut redacted = self.raw.clone();
        redact_sensitive_json_fields(&mut redacted);
        match redacted {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| match value {
                    Value::String(text) => format!("{key}: {text}"),
                    other => format!("{key}: {other}"),
                })
                .collect(),
            other => vec![other.to_string()],
        }
    }
}

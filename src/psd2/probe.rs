//! Usage: Consent-then-accounts sequence run after a successful token exchange.

use super::accounts::AccountsResult;
use super::consent::ConsentResult;
use super::Psd2Client;
use crate::shared::error::AppResult;

#[derive(Debug)]
pub struct ProbeOutcome {
    pub consent: AppResult<ConsentResult>,
    /// `None` when the accounts call was skipped (no consent id).
    pub accounts: Option<AppResult<AccountsResult>>,
}

impl ProbeOutcome {
    pub fn accounts_skipped(&self) -> bool {
        self.accounts.is_none()
    }
}

/// Strictly sequential: the accounts call only runs when consent creation yields an id.
pub async fn run_probe(client: &Psd2Client, access_token: &str) -> ProbeOutcome {
    let consent = client.create_consent(access_token).await;

    let consent_id = match &consent {
        Ok(result) => result.consent_id.clone(),
        Err(err) => {
            tracing::warn!("consent creation failed: {}", err);
            None
        }
    };

    let Some(consent_id) = consent_id else {
        tracing::info!("no consent id; skipping accounts request");
        return ProbeOutcome {
            consent,
            accounts: None,
        };
    };

    let accounts = client.list_accounts(access_token, Some(&consent_id)).await;
    if let Err(err) = &accounts {
        tracing::warn!("accounts request failed: {}", err);
    }
    ProbeOutcome {
        consent,
        accounts: Some(accounts),
    }
}

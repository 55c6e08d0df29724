//! Usage: Poll the callback slot until a result arrives or the timeout elapses.

use crate::oauth::callback_server::{CallbackPayload, CallbackSlot};
use crate::shared::error::{AppError, AppResult, PROVIDER_ERROR, STATE_MISMATCH, TIMEOUT};
use crate::shared::security::constant_time_eq;
use std::time::Duration;
use tokio::time::Instant;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Waits for the callback and returns the authorization code once its state checks out.
///
/// A timeout too large to form a deadline waits without one.
pub async fn await_callback(
    slot: &CallbackSlot,
    expected_state: &str,
    timeout: Duration,
) -> AppResult<String> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(payload) = slot.get() {
            return resolve_payload(payload, expected_state);
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(AppError::new(
                        TIMEOUT,
                        format!("no callback received within {}s", timeout.as_secs()),
                    ));
                }
                POLL_INTERVAL.min(deadline - now)
            }
            None => POLL_INTERVAL,
        };
        tokio::time::sleep(pause).await;
    }
}

fn resolve_payload(payload: &CallbackPayload, expected_state: &str) -> AppResult<String> {
    match payload {
        CallbackPayload::Code { code, state } => {
            let matches = state
                .as_deref()
                .is_some_and(|s| constant_time_eq(s.as_bytes(), expected_state.as_bytes()));
            if !matches {
                tracing::warn!("oauth callback state mismatch");
                return Err(AppError::new(
                    STATE_MISMATCH,
                    "callback state does not match the request (possible CSRF); token exchange skipped",
                ));
            }
            Ok(code.clone())
        }
        CallbackPayload::Error { error, description } => Err(AppError::new(
            PROVIDER_ERROR,
            format!(
                "provider returned error={error}: {}",
                description.as_deref().unwrap_or("no description")
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_payload(state: Option<&str>) -> CallbackPayload {
        CallbackPayload::Code {
            code: "the-code".to_string(),
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn matching_state_yields_code() {
        let code = resolve_payload(&code_payload(Some("s1")), "s1").expect("code");
        assert_eq!(code, "the-code");
    }

    #[test]
    fn mismatched_or_missing_state_is_rejected() {
        let err = resolve_payload(&code_payload(Some("other")), "s1").expect_err("mismatch");
        assert!(err.is(STATE_MISMATCH));
        let err = resolve_payload(&code_payload(None), "s1").expect_err("missing");
        assert!(err.is(STATE_MISMATCH));
    }

    #[test]
    fn provider_error_is_reported_with_description() {
        let err = resolve_payload(
            &CallbackPayload::Error {
                error: "access_denied".to_string(),
                description: Some("user cancelled".to_string()),
            },
            "s1",
        )
        .expect_err("provider error");
        assert!(err.is(PROVIDER_ERROR));
        assert!(err.message().contains("access_denied"));
        assert!(err.message().contains("user cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_code_already_in_slot_without_waiting() {
        let slot = CallbackSlot::default();
        slot.store(code_payload(Some("s1")));
        let started = Instant::now();
        let code = await_callback(&slot, "s1", Duration::from_secs(300))
            .await
            .expect("code");
        assert_eq!(code, "the-code");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_the_deadline_and_not_before() {
        let slot = CallbackSlot::default();
        let started = Instant::now();
        let err = await_callback(&slot, "s1", Duration::from_secs(5))
            .await
            .expect_err("timeout");
        assert!(err.is(TIMEOUT));
        assert_eq!(err.message(), "no callback received within 5s");
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed <= Duration::from_secs(5) + POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn late_callback_is_seen_on_the_next_poll() {
        let slot = std::sync::Arc::new(CallbackSlot::default());
        let writer = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            writer.store(code_payload(Some("s1")));
        });

        let started = Instant::now();
        let code = await_callback(&slot, "s1", Duration::from_secs(60))
            .await
            .expect("code");
        assert_eq!(code, "the-code");
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2500));
        assert!(elapsed <= Duration::from_millis(2500) + POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_timeout_still_resolves_a_stored_result() {
        let slot = CallbackSlot::default();
        slot.store(CallbackPayload::Error {
            error: "access_denied".to_string(),
            description: None,
        });
        let err = await_callback(&slot, "s1", Duration::from_secs(u64::MAX))
            .await
            .expect_err("provider error");
        assert!(err.is(PROVIDER_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_timeout_keeps_polling_until_the_callback_arrives() {
        let slot = std::sync::Arc::new(CallbackSlot::default());
        let writer = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            writer.store(code_payload(Some("s1")));
        });

        let code = await_callback(&slot, "s1", Duration::MAX)
            .await
            .expect("code");
        assert_eq!(code, "the-code");
    }
}

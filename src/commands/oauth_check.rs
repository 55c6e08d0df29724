//! Usage: End-to-end OAuth check (listener, browser, callback, token exchange, PSD2 probe).
//!
//! The listener is shut down on every path out of `run_until`, including interrupts, so the
//! callback port is free again when the command returns.

use crate::infra::settings::Settings;
use crate::oauth::authorize::{build_authorization_request, make_redirect_uri};
use crate::oauth::await_callback::await_callback;
use crate::oauth::browser::{AuthorizationPresenter, SystemBrowser};
use crate::oauth::callback_server::CallbackListener;
use crate::oauth::token_exchange::{exchange_code_for_token, TokenExchangeRequest, TokenResponse};
use crate::psd2::probe::{run_probe, ProbeOutcome};
use crate::psd2::Psd2Client;
use crate::shared::error::{AppError, AppResult};
use crate::shared::http::oauth_http_client;
use std::future::Future;
use std::time::Duration;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone)]
pub struct OAuthCheckOptions {
    pub port: u16,
    pub timeout: Duration,
    pub open_browser: bool,
    pub test_api: bool,
}

impl Default for OAuthCheckOptions {
    fn default() -> Self {
        Self {
            port: 8000,
            timeout: Duration::from_secs(300),
            open_browser: true,
            test_api: false,
        }
    }
}

#[derive(Debug)]
pub struct FlowReport {
    /// Token, or the first failure on the way to it.
    pub token: AppResult<TokenResponse>,
    /// Present only when the token exchange succeeded and the API check was requested.
    pub probe: Option<ProbeOutcome>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(FlowReport),
    Interrupted,
}

/// Runs the check until it completes or Ctrl-C arrives.
pub async fn run(settings: &Settings, options: &OAuthCheckOptions) -> AppResult<RunOutcome> {
    let presenter = SystemBrowser {
        open_in_browser: options.open_browser,
    };
    run_until(settings, options, &presenter, interrupt_signal()).await
}

/// Same as [`run`] with a caller-supplied presenter and interrupt future.
/// `options.open_browser` is only consulted by [`run`]'s system browser presenter.
pub async fn run_until(
    settings: &Settings,
    options: &OAuthCheckOptions,
    presenter: &dyn AuthorizationPresenter,
    interrupt: impl Future<Output = ()>,
) -> AppResult<RunOutcome> {
    settings.validate()?;

    println!("Starting Piraeus Bank OAuth check");
    let listener = CallbackListener::start(options.port).await?;
    let redirect_uri = make_redirect_uri(listener.port());
    println!("Local server started on port {}", listener.port());
    println!("Callback URL: {redirect_uri}");

    let outcome = tokio::select! {
        report = drive_flow(settings, options, presenter, &listener, &redirect_uri) => {
            RunOutcome::Completed(report)
        }
        () = interrupt => {
            println!();
            println!("Check interrupted by user");
            RunOutcome::Interrupted
        }
    };

    println!("Stopping local server...");
    listener.shutdown().await;
    Ok(outcome)
}

async fn interrupt_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler unavailable: {}", err);
        std::future::pending::<()>().await;
    }
}

async fn drive_flow(
    settings: &Settings,
    options: &OAuthCheckOptions,
    presenter: &dyn AuthorizationPresenter,
    listener: &CallbackListener,
    redirect_uri: &str,
) -> FlowReport {
    let token = obtain_token(settings, options, presenter, listener, redirect_uri).await;
    match &token {
        Ok(token) => print_token(token),
        Err(err) => print_failure("No access token obtained", err),
    }

    let probe = match (&token, options.test_api) {
        (Ok(token), true) => Some(run_api_checks(settings, &token.access_token).await),
        _ => None,
    };

    FlowReport { token, probe }
}

async fn obtain_token(
    settings: &Settings,
    options: &OAuthCheckOptions,
    presenter: &dyn AuthorizationPresenter,
    listener: &CallbackListener,
    redirect_uri: &str,
) -> AppResult<TokenResponse> {
    let request = build_authorization_request(settings, redirect_uri)?;
    println!("OAuth URL: {}", request.url);
    presenter.present(&request);

    println!(
        "Waiting for callback (timeout: {}s)...",
        options.timeout.as_secs()
    );
    let slot = listener.slot();
    let code = await_callback(&slot, &request.state, options.timeout).await?;
    println!("Authorization code received, state validated");

    println!("Exchanging authorization code for access token...");
    let client = oauth_http_client()?;
    exchange_code_for_token(
        &client,
        &TokenExchangeRequest {
            token_uri: settings.token_url(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            code,
            redirect_uri: request.redirect_uri,
        },
    )
    .await
}

async fn run_api_checks(settings: &Settings, access_token: &str) -> ProbeOutcome {
    println!();
    println!("Testing API calls with the access token");
    println!("{}", "=".repeat(RULE_WIDTH));

    let outcome = match Psd2Client::from_settings(settings) {
        Ok(client) => {
            println!("Creating PSD2 consent...");
            run_probe(&client, access_token).await
        }
        Err(err) => ProbeOutcome {
            consent: Err(err),
            accounts: None,
        },
    };

    print_probe(&outcome);
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("API testing completed");
    outcome
}

fn print_token(token: &TokenResponse) {
    println!();
    println!("OAuth token exchange successful");
    println!("{}", "=".repeat(RULE_WIDTH));
    for line in token.summary_lines() {
        println!("{line}");
    }
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn print_probe(outcome: &ProbeOutcome) {
    match &outcome.consent {
        Ok(consent) => {
            println!("Consent created");
            println!(
                "Consent ID: {}",
                consent.consent_id.as_deref().unwrap_or("N/A")
            );
            println!(
                "Status: {}",
                consent.consent_status.as_deref().unwrap_or("N/A")
            );
            println!();
            println!("Consent Response:");
            for line in consent.response_lines() {
                println!("  {line}");
            }
        }
        Err(err) => print_failure("Consent creation failed", err),
    }

    match &outcome.accounts {
        None => println!("Skipping accounts request (no consent id)"),
        Some(Ok(accounts)) => {
            println!("Retrieved {} account(s)", accounts.accounts.len());
            for (idx, account) in accounts.accounts.iter().enumerate() {
                println!();
                println!("Account {}:", idx + 1);
                for line in account.summary_lines() {
                    println!("  {line}");
                }
            }
            println!();
            println!("Full Accounts Response:");
            println!("{}", accounts.pretty_response());
        }
        Some(Err(err)) => print_failure("Failed to get accounts", err),
    }
}

fn print_failure(context: &str, err: &AppError) {
    tracing::debug!(code = err.code(), "{}", context);
    eprintln!("{context}: {err}");
}

use piraeus_oauth_check_lib::infra::settings::Settings;
use piraeus_oauth_check_lib::psd2::probe::run_probe;
use piraeus_oauth_check_lib::psd2::Psd2Client;
use piraeus_oauth_check_lib::shared::error::{CERT_MISSING, HTTP_ERROR};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Psd2Client {
    let settings = Settings {
        client_id: "client-1".to_string(),
        client_secret: "secret-1".to_string(),
        psd2_base_url: server.uri(),
        ..Settings::default()
    };
    Psd2Client::new(reqwest::Client::new(), &settings)
}

#[tokio::test]
async fn consent_id_is_forwarded_to_accounts_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consents"))
        .and(header("authorization", "Bearer tok"))
        .and(header("x-ibm-client-id", "client-1"))
        .and(header_exists("x-request-id"))
        .and(body_partial_json(json!({
            "access": {"allPsd2": "allAccounts"},
            "recurringIndicator": true,
            "frequencyPerDay": 255,
            "combinedServiceIndicator": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "consentId": "c-42",
            "consentStatus": "received"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("authorization", "Bearer tok"))
        .and(header("consent-id", "c-42"))
        .and(header("x-ibm-client-id", "client-1"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{
                "resourceId": "r-1",
                "iban": "GR1601101250000000012300695",
                "currency": "EUR"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = run_probe(&client_for(&server), "tok").await;

    let consent = outcome.consent.as_ref().expect("consent");
    assert_eq!(consent.consent_id.as_deref(), Some("c-42"));
    assert_eq!(consent.consent_status.as_deref(), Some("received"));
    let accounts = outcome
        .accounts
        .as_ref()
        .expect("accounts attempted")
        .as_ref()
        .expect("accounts");
    assert_eq!(accounts.accounts.len(), 1);
    assert_eq!(accounts.accounts[0].currency.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn consent_without_id_skips_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "consentStatus": "rejected"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = run_probe(&client_for(&server), "tok").await;
    assert!(outcome.consent.is_ok());
    assert!(outcome.accounts_skipped());
}

#[tokio::test]
async fn consent_failure_skips_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consents"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = run_probe(&client_for(&server), "tok").await;
    let err = outcome.consent.as_ref().expect_err("403");
    assert!(err.is(HTTP_ERROR));
    assert!(err.to_string().contains("status=403"));
    assert!(outcome.accounts_skipped());
}

#[tokio::test]
async fn accounts_failure_is_reported_after_successful_consent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consents"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"consentId": "c-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("consent not authorised"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = run_probe(&client_for(&server), "tok").await;
    assert!(outcome.consent.is_ok());
    let accounts = outcome.accounts.expect("attempted");
    assert!(accounts.expect_err("401").is(HTTP_ERROR));
}

#[test]
fn mtls_client_requires_certificate_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings {
        client_id: "c".to_string(),
        client_secret: "s".to_string(),
        certificate_path: dir.path().join("missing.crt"),
        private_key_path: dir.path().join("missing.key"),
        ..Settings::default()
    };
    let err = Psd2Client::from_settings(&settings).expect_err("missing cert");
    assert!(err.is(CERT_MISSING));
}

mod support;

use piraeus_oauth_check_lib::infra::settings::{self, DEFAULT_CONFIG_FILE};
use piraeus_oauth_check_lib::shared::error::CONFIG_ERROR;
use std::path::PathBuf;

#[test]
fn explicit_config_file_is_overridden_by_environment() {
    let mut env = support::TestEnv::new();
    let path = env.write(
        "custom.toml",
        r#"
client_id = "file-client"
client_secret = "file-secret"
oauth_base_url = "https://sandbox.example/oauth2/"
certificate_path = "certs/client.crt"
"#,
    );
    env.set_var("PIRAEUS_CLIENT_SECRET", "env-secret");
    env.set_var("PIRAEUS_KEY_PATH", "certs/env.key");

    let loaded = settings::load(Some(&path)).expect("settings");
    assert_eq!(loaded.client_id, "file-client");
    assert_eq!(loaded.client_secret, "env-secret");
    assert_eq!(loaded.token_url(), "https://sandbox.example/oauth2/token");
    assert_eq!(loaded.certificate_path, PathBuf::from("certs/client.crt"));
    assert_eq!(loaded.private_key_path, PathBuf::from("certs/env.key"));
}

#[test]
fn default_config_file_and_dotenv_are_picked_up_from_working_directory() {
    let env = support::TestEnv::new();
    env.write(DEFAULT_CONFIG_FILE, "client_id = \"from-toml\"\n");
    env.write(".env", "PIRAEUS_CLIENT_SECRET=from-dotenv\n");

    let loaded = settings::load(None).expect("settings");
    assert_eq!(loaded.client_id, "from-toml");
    assert_eq!(loaded.client_secret, "from-dotenv");
    assert!(env.dir().join(".env").exists());
}

#[test]
fn missing_credentials_name_the_variable() {
    let _env = support::TestEnv::new();

    let err = settings::load(None).expect_err("no credentials");
    assert!(err.is(CONFIG_ERROR));
    assert!(err.to_string().contains("PIRAEUS_CLIENT_ID"));
}

#[test]
fn missing_client_secret_is_reported_separately() {
    let mut env = support::TestEnv::new();
    env.set_var("PIRAEUS_CLIENT_ID", "only-id");

    let err = settings::load(None).expect_err("no secret");
    assert!(err.is(CONFIG_ERROR));
    assert!(err.to_string().contains("PIRAEUS_CLIENT_SECRET"));
}

#[test]
fn explicit_config_path_must_exist() {
    let env = support::TestEnv::new();
    let missing = env.dir().join("nope.toml");

    let err = settings::load(Some(&missing)).expect_err("missing file");
    assert!(err.is(CONFIG_ERROR));
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn malformed_config_file_is_a_config_error() {
    let env = support::TestEnv::new();
    let path = env.write("bad.toml", "client_id = [unterminated");

    let err = settings::load(Some(&path)).expect_err("bad toml");
    assert!(err.is(CONFIG_ERROR));
}

#[test]
fn dotenv_in_parent_directory_is_not_read() {
    let mut env = support::TestEnv::new();
    env.write(".env", "PIRAEUS_CLIENT_SECRET=from-parent\n");
    let nested = env.dir().join("nested");
    std::fs::create_dir(&nested).expect("mkdir");
    std::env::set_current_dir(&nested).expect("enter nested dir");
    env.set_var("PIRAEUS_CLIENT_ID", "env-client");

    let err = settings::load(None).expect_err("secret only in parent .env");
    assert!(err.is(CONFIG_ERROR));
    assert!(err.to_string().contains("PIRAEUS_CLIENT_SECRET"));
    assert!(std::env::var_os("PIRAEUS_CLIENT_SECRET").is_none());
}

#![allow(dead_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub const SETTINGS_ENV_KEYS: [&str; 6] = [
    "PIRAEUS_CLIENT_ID",
    "PIRAEUS_CLIENT_SECRET",
    "PIRAEUS_CERT_PATH",
    "PIRAEUS_KEY_PATH",
    "PIRAEUS_OAUTH_BASE_URL",
    "PIRAEUS_PSD2_BASE_URL",
];

#[derive(Default)]
struct EnvRestore {
    saved: Vec<(&'static str, Option<OsString>)>,
    cwd: Option<PathBuf>,
}

impl EnvRestore {
    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        if let Some(cwd) = self.cwd.take() {
            let _ = std::env::set_current_dir(cwd);
        }
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Serialises tests that touch process env / cwd, runs them inside a scratch directory with
/// all `PIRAEUS_*` variables cleared, and restores everything on drop.
pub struct TestEnv {
    _env: EnvRestore,
    dir: TempDir,
    _lock: MutexGuard<'static, ()>,
}

impl TestEnv {
    pub fn new() -> Self {
        let lock = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");

        let mut env = EnvRestore::default();
        for key in SETTINGS_ENV_KEYS {
            env.remove_var(key);
        }
        env.cwd = Some(std::env::current_dir().expect("cwd"));
        std::env::set_current_dir(dir.path()).expect("enter tempdir");

        Self {
            _env: env,
            dir,
            _lock: lock,
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write file");
        path
    }

    pub fn set_var(&mut self, key: &'static str, value: &str) {
        self._env.set_var(key, value);
    }
}

/// Finds a currently free loopback port.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

/// Sends a GET to the callback listener, retrying briefly while it starts up.
pub async fn hit_callback(port: u16, query: &str) -> reqwest::Response {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}/callback?{query}");
    let mut last_err = None;
    for _ in 0..50 {
        match client.get(&url).send().await {
            Ok(response) => return response,
            Err(err) => {
                last_err = Some(err);
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }
    panic!("callback listener never answered: {last_err:?}");
}

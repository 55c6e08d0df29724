//! Usage: Mutual-TLS client for the PSD2 endpoints (certificate + private key from disk).

use crate::shared::error::{AppError, AppResult, CERT_MISSING, TLS_ERROR};
use crate::shared::http::client_builder;
use std::path::Path;

/// Builds a client presenting `cert_path` + `key_path` (both PEM).
pub fn build_mtls_client(cert_path: &Path, key_path: &Path) -> AppResult<reqwest::Client> {
    let cert = read_material(cert_path, "client certificate")?;
    let key = read_material(key_path, "private key")?;

    let mut pem = cert;
    if !pem.ends_with(b"\n") {
        pem.push(b'\n');
    }
    pem.extend_from_slice(&key);

    let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
        AppError::new(
            TLS_ERROR,
            format!(
                "client identity from {} + {} is not usable: {e}",
                cert_path.display(),
                key_path.display()
            ),
        )
        .with_source(e)
    })?;

    client_builder().identity(identity).build().map_err(|e| {
        AppError::new(TLS_ERROR, format!("mtls client init failed: {e}")).with_source(e)
    })
}

fn read_material(path: &Path, label: &str) -> AppResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        let reason = if err.kind() == std::io::ErrorKind::NotFound {
            "not found"
        } else {
            "not readable"
        };
        AppError::new(
            CERT_MISSING,
            format!(
                "{label} {reason} at {}; make sure the certificate and private key files exist in the working directory or set PIRAEUS_CERT_PATH / PIRAEUS_KEY_PATH",
                path.display()
            ),
        )
        .with_source(err)
    })
}

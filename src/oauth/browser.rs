//! Usage: Hand the authorization URL to the user (system browser or printed link).

use crate::oauth::authorize::AuthorizationRequest;
use crate::shared::error::{AppError, AppResult, INTERNAL_ERROR};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Browser,
    Printed,
}

/// Hands a freshly built authorization request to whoever completes the login.
pub trait AuthorizationPresenter {
    fn present(&self, request: &AuthorizationRequest) -> Presentation;
}

/// Presents through the system browser, or prints the URL when `open_in_browser` is off.
#[derive(Debug, Clone, Copy)]
pub struct SystemBrowser {
    pub open_in_browser: bool,
}

impl AuthorizationPresenter for SystemBrowser {
    fn present(&self, request: &AuthorizationRequest) -> Presentation {
        present_to_user(&request.url, self.open_in_browser)
    }
}

/// Opens `url` in the default browser when asked to; any launch failure falls back to
/// printing the URL. Never fails.
pub fn present_to_user(url: &str, open_in_browser: bool) -> Presentation {
    if !open_in_browser {
        println!("Open this URL in your browser to continue:");
        println!("  {url}");
        return Presentation::Printed;
    }

    println!("Opening browser for authentication...");
    match open_browser(url) {
        Ok(()) => Presentation::Browser,
        Err(err) => {
            tracing::warn!("browser launch failed, falling back to printed url: {}", err);
            println!("Could not open a browser ({err}).");
            println!("Open this URL manually:");
            println!("  {url}");
            Presentation::Printed
        }
    }
}

fn open_browser(url: &str) -> AppResult<()> {
    #[cfg(target_os = "windows")]
    {
        build_windows_open_browser_command(url)
            .spawn()
            .map_err(launch_failed)?;
        return Ok(());
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(url)
            .spawn()
            .map_err(launch_failed)?;
        return Ok(());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open")
            .arg(url)
            .spawn()
            .map_err(launch_failed)?;
        return Ok(());
    }

    #[allow(unreachable_code)]
    Err(AppError::new(
        INTERNAL_ERROR,
        "browser open is unsupported on this platform",
    ))
}

#[allow(dead_code)]
fn launch_failed(err: std::io::Error) -> AppError {
    AppError::new(INTERNAL_ERROR, format!("failed to open browser: {err}")).with_source(err)
}

#[cfg(target_os = "windows")]
fn build_windows_open_browser_command(url: &str) -> Command {
    let mut cmd = Command::new("rundll32.exe");
    // `explorer <url>` may open File Explorer for some URL shapes.
    cmd.arg("url.dll,FileProtocolHandler").arg(url);
    cmd
}

//! Browser opening

/// Opens URLs in the user's default browser
pub trait UrlOpener: Send + Sync {
    /// Open a URL, fire-and-forget
    fn open(&self, url: &str);
}

/// Opens URLs via the platform's default opener
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) {
        let result = open_command(url).spawn();
        match result {
            Ok(_) => tracing::debug!(url, "opened in browser"),
            Err(e) => tracing::warn!(url, error = %e, "failed to open browser"),
        }
    }
}

#[cfg(target_os = "windows")]
fn open_command(url: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(target_os = "macos")]
fn open_command(url: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn open_command(url: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

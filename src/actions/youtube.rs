//! Video search and download via yt-dlp

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::exec::run_argv;

/// Timeout for URL resolution
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a full download
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Result of a download attempt
#[derive(Debug, Clone, Default)]
pub struct DownloadOutcome {
    /// Exit code; -1 when the downloader is unavailable or failed
    pub code: i32,

    /// Saved filename, when known
    pub filename: String,

    /// Failure description, when any
    pub error: String,
}

impl DownloadOutcome {
    /// Whether the download completed
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.code == 0
    }
}

/// Resolves and downloads videos for spoken queries
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Resolve the top search hit to a playable URL
    ///
    /// Falls back to a generic results-page URL when direct resolution
    /// fails, so the returned URL is always openable.
    async fn resolve_top_url(&self, query: &str) -> String;

    /// Download the query or URL into the destination folder
    async fn download(&self, query_or_url: &str, dest: &Path) -> DownloadOutcome;
}

/// yt-dlp subprocess wrapper
pub struct YtDlp {
    binary: Option<PathBuf>,
}

impl YtDlp {
    /// Locate yt-dlp on the PATH; absence is tolerated until a download
    /// is requested
    #[must_use]
    pub fn new() -> Self {
        let binary = which::which("yt-dlp").ok();
        match &binary {
            Some(path) => tracing::debug!(path = %path.display(), "yt-dlp found"),
            None => tracing::debug!("yt-dlp not found on PATH"),
        }
        Self { binary }
    }

    /// Wrap a bare query in a single-result search target
    fn search_target(query_or_url: &str) -> String {
        if query_or_url.starts_with("http://") || query_or_url.starts_with("https://") {
            query_or_url.to_string()
        } else {
            format!("ytsearch1:{query_or_url}")
        }
    }

    /// Generic results-page URL for a query
    fn results_url(query: &str) -> String {
        format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        )
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoSource for YtDlp {
    async fn resolve_top_url(&self, query: &str) -> String {
        let Some(ref binary) = self.binary else {
            return Self::results_url(query);
        };

        let args = vec![
            "--no-playlist".to_string(),
            "--skip-download".to_string(),
            "--print".to_string(),
            "id".to_string(),
            Self::search_target(query),
        ];
        let out = run_argv(&binary.display().to_string(), &args, RESOLVE_TIMEOUT).await;

        let id = out.stdout.lines().next().unwrap_or("").trim();
        if out.ok() && !id.is_empty() {
            format!("https://www.youtube.com/watch?v={id}")
        } else {
            tracing::debug!(code = out.code, stderr = %out.stderr, "URL resolution failed, using results page");
            Self::results_url(query)
        }
    }

    async fn download(&self, query_or_url: &str, dest: &Path) -> DownloadOutcome {
        let Some(ref binary) = self.binary else {
            return DownloadOutcome {
                code: -1,
                filename: String::new(),
                error: "yt-dlp not installed".to_string(),
            };
        };

        let template = dest.join("%(title).100s-%(id)s.%(ext)s");
        let args = vec![
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "-f".to_string(),
            "bestaudio+bv*+ba/best".to_string(),
            "-o".to_string(),
            template.display().to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            Self::search_target(query_or_url),
        ];
        let out = run_argv(&binary.display().to_string(), &args, DOWNLOAD_TIMEOUT).await;

        let filename = out
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string();

        DownloadOutcome {
            code: out.code,
            filename,
            error: out.stderr,
        }
    }
}

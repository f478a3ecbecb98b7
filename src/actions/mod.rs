//! External action collaborators
//!
//! Weather lookup, video search/download, browser opening, and spoken
//! feedback. Each is a trait seam injected into the handler flow at
//! construction, with a production implementation alongside.

mod browser;
mod weather;
mod youtube;

pub use browser::{SystemBrowser, UrlOpener};
pub use weather::{OpenWeatherClient, WeatherProvider};
pub use youtube::{DownloadOutcome, VideoSource, YtDlp};

/// Speaks (or prints) assistant feedback to the user
pub trait Announcer: Send + Sync {
    /// Deliver one line of feedback
    fn say(&self, text: &str);
}

/// Console announcer — prints feedback instead of synthesizing speech
pub struct ConsoleAnnouncer;

impl Announcer for ConsoleAnnouncer {
    fn say(&self, text: &str) {
        if !text.is_empty() {
            println!("[assistant] {text}");
        }
    }
}

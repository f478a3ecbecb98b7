//! Configuration management for the deejay assistant

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

/// Default wake phrase patterns, matched case-insensitively as regex
/// alternatives
pub const DEFAULT_WAKE_PHRASES: &[&str] = &[
    "hey dj",
    "hey deejay",
    "hey d j",
    r"hey d\.j",
    "hey assistant",
    "ok dj",
    "yo dj",
    "dj",
    "yo",
];

/// Whitelisted OS commands and whether each accepts arguments
pub const ALLOWED_COMMANDS: &[(&str, bool)] = &[
    ("ipconfig", true),
    ("ping", true),
    ("tracert", true),
    ("nslookup", true),
    ("systeminfo", false),
    ("whoami", false),
    ("tasklist", false),
    ("calc", false),
    ("shutdown", true),
    ("lock", false),
    ("music", false),
];

/// Maximum joined-argument length accepted by the sanitizer
pub const MAX_ARGS_LEN: usize = 120;

/// Shell metacharacters rejected in whitelisted command arguments
pub const FORBIDDEN_CHARS: &str = "&|;><$`";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Wake detection tunables
    pub wake: WakeConfig,

    /// Active listening tunables
    pub listen: ListenConfig,

    /// Speech-to-text service configuration
    pub stt: SttConfig,

    /// Allow arbitrary (non-whitelisted) command execution after spoken
    /// confirmation
    pub allow_arbitrary: bool,

    /// Allow video downloads
    pub allow_download: bool,

    /// OpenWeatherMap API key
    pub openweather_key: Option<String>,

    /// Destination folder for downloaded files
    pub download_dir: PathBuf,

    /// Data directory holding the command journals
    pub data_dir: PathBuf,
}

/// Wake detection tunables
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Wake phrase patterns (regex fragments)
    pub phrases: Vec<String>,

    /// Background capture window length
    pub chunk: Duration,

    /// Overlap fraction between successive capture windows
    pub overlap: f32,

    /// Minimum elapsed time between two accepted wake triggers
    pub debounce: Duration,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_WAKE_PHRASES.iter().map(ToString::to_string).collect(),
            chunk: Duration::from_millis(3500),
            overlap: 0.5,
            debounce: Duration::from_secs(3),
        }
    }
}

/// Active listening tunables
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Capture window when listening for a command
    pub command_window: Duration,

    /// Capture window when listening for a spoken confirmation
    pub confirm_window: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            command_window: Duration::from_secs(10),
            confirm_window: Duration::from_secs(6),
        }
    }
}

/// Speech-to-text service configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Transcription endpoint URL (Whisper-compatible)
    pub url: String,

    /// Model identifier
    pub model: String,

    /// API key, if the endpoint requires one
    pub api_key: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key: None,
        }
    }
}

/// Session permissions resolved from CLI flags
///
/// Flags are OR'd with the config file values — a flag can enable a
/// feature for one session but never disable a file-enabled one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFlags {
    /// `--allow-arbitrary` was passed
    pub allow_arbitrary: bool,

    /// `--allow-download` was passed
    pub allow_download: bool,
}

impl Config {
    /// Load configuration with precedence env > config file > default
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load(flags: SessionFlags, openweather_key: Option<String>) -> Result<Self> {
        let fc = file::load_config_file();

        let wake_default = WakeConfig::default();
        let wake = WakeConfig {
            phrases: fc.wake.phrases.unwrap_or(wake_default.phrases),
            chunk: fc
                .wake
                .chunk_secs
                .filter(|s| s.is_finite() && *s > 0.0)
                .map_or(wake_default.chunk, Duration::from_secs_f32),
            overlap: fc.wake.overlap.unwrap_or(wake_default.overlap).clamp(0.0, 0.9),
            debounce: fc
                .wake
                .debounce_secs
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map_or(wake_default.debounce, Duration::from_secs_f32),
        };

        let listen_default = ListenConfig::default();
        let listen = ListenConfig {
            command_window: fc
                .listen
                .command_window_secs
                .map_or(listen_default.command_window, Duration::from_secs),
            confirm_window: fc
                .listen
                .confirm_window_secs
                .map_or(listen_default.confirm_window, Duration::from_secs),
        };

        let stt_default = SttConfig::default();
        let stt = SttConfig {
            url: std::env::var("DEEJAY_STT_URL")
                .ok()
                .or(fc.stt.url)
                .unwrap_or(stt_default.url),
            model: std::env::var("DEEJAY_STT_MODEL")
                .ok()
                .or(fc.stt.model)
                .unwrap_or(stt_default.model),
            api_key: std::env::var("OPENAI_API_KEY").ok().or(fc.stt.api_key),
        };

        let allow_arbitrary = flags.allow_arbitrary || fc.arbitrary.enabled.unwrap_or(false);
        let allow_download = flags.allow_download || fc.downloads.enabled.unwrap_or(false);

        let openweather_key = openweather_key
            .or_else(|| std::env::var("OPENWEATHER_API_KEY").ok())
            .or(fc.weather.api_key);

        let download_dir = std::env::var("DEEJAY_DOWNLOAD_DIR")
            .ok()
            .or(fc.downloads.dest_dir)
            .map_or_else(|| PathBuf::from("."), PathBuf::from);

        let data_dir = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("deejay"));
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self {
            wake,
            listen,
            stt,
            allow_arbitrary,
            allow_download,
            openweather_key,
            download_dir,
            data_dir,
        })
    }

    /// Look up a whitelist entry, returning whether it accepts arguments
    #[must_use]
    pub fn whitelist_entry(command: &str) -> Option<bool> {
        ALLOWED_COMMANDS
            .iter()
            .find(|(name, _)| *name == command)
            .map(|(_, accepts_args)| *accepts_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_lookup() {
        assert_eq!(Config::whitelist_entry("ping"), Some(true));
        assert_eq!(Config::whitelist_entry("lock"), Some(false));
        assert_eq!(Config::whitelist_entry("rm"), None);
    }

    #[test]
    fn wake_defaults() {
        let wake = WakeConfig::default();
        assert_eq!(wake.chunk, Duration::from_millis(3500));
        assert!(wake.phrases.iter().any(|p| p == "hey dj"));
    }
}

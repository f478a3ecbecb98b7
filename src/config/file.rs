//! TOML configuration file loading
//!
//! Supports `~/.config/deejay/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct DeejayConfigFile {
    /// Wake detection tunables
    #[serde(default)]
    pub wake: WakeFileConfig,

    /// Active listening tunables
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Speech-to-text service configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Weather lookup configuration
    #[serde(default)]
    pub weather: WeatherFileConfig,

    /// Video download configuration
    #[serde(default)]
    pub downloads: DownloadsFileConfig,

    /// Arbitrary command execution configuration
    #[serde(default)]
    pub arbitrary: ArbitraryFileConfig,
}

/// Wake detection tunables
#[derive(Debug, Default, Deserialize)]
pub struct WakeFileConfig {
    /// Wake phrase patterns (regex fragments, matched case-insensitively)
    pub phrases: Option<Vec<String>>,

    /// Background capture window length in seconds
    pub chunk_secs: Option<f32>,

    /// Overlap fraction between successive capture windows (0.0 - 0.9)
    pub overlap: Option<f32>,

    /// Minimum seconds between two accepted wake triggers
    pub debounce_secs: Option<f32>,
}

/// Active listening tunables
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    /// Seconds of audio captured when listening for a command
    pub command_window_secs: Option<u64>,

    /// Seconds of audio captured when listening for a confirmation
    pub confirm_window_secs: Option<u64>,
}

/// Speech-to-text service configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// Transcription endpoint URL
    pub url: Option<String>,

    /// Model identifier (e.g. "whisper-1")
    pub model: Option<String>,

    /// API key (env `OPENAI_API_KEY` takes precedence)
    pub api_key: Option<String>,
}

/// Weather lookup configuration
#[derive(Debug, Default, Deserialize)]
pub struct WeatherFileConfig {
    /// OpenWeatherMap API key (env `OPENWEATHER_API_KEY` takes precedence)
    pub api_key: Option<String>,
}

/// Video download configuration
#[derive(Debug, Default, Deserialize)]
pub struct DownloadsFileConfig {
    /// Allow downloads without the `--allow-download` flag
    pub enabled: Option<bool>,

    /// Destination folder for downloaded files
    pub dest_dir: Option<String>,
}

/// Arbitrary command execution configuration
#[derive(Debug, Default, Deserialize)]
pub struct ArbitraryFileConfig {
    /// Allow arbitrary commands without the `--allow-arbitrary` flag
    pub enabled: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `DeejayConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file() -> DeejayConfigFile {
    let Some(path) = config_file_path() else {
        return DeejayConfigFile::default();
    };

    if !path.exists() {
        return DeejayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                DeejayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            DeejayConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/deejay/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("deejay").join("config.toml"))
}

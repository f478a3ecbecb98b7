//! Error types for the deejay assistant

use thiserror::Error;

/// Result type alias for deejay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
///
/// Outcomes that are part of normal operation (no speech in a chunk, an
/// utterance that maps to no intent, a declined confirmation) are modelled
/// as enum values at their call sites, not as errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text service error
    #[error("STT error: {0}")]
    Stt(String),

    /// Command validation error
    #[error("validation error: {0}")]
    Validation(String),

    /// Weather lookup error
    #[error("weather error: {0}")]
    Weather(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

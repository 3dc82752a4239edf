//! Error types for tap acquisition and player sessions

use crate::config::ConfigError;
use crate::player::PlaybackError;

/// Error type for audio tap operations
#[derive(thiserror::Error, Debug)]
pub enum TapError {
    /// No audio-processing primitive is available; nothing can fall back from this
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// A single acquisition method could not produce a source
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Analysis parameters the context cannot be built with
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The player reported that the content itself cannot be played
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),
}

impl TapError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        TapError::SourceUnavailable(reason.into())
    }

    /// True when the error should stop the whole acquisition chain.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TapError::UnsupportedEnvironment(_) | TapError::Config(_))
    }
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;

//! Error types for Solace

use std::time::Duration;

use thiserror::Error;

/// Result type alias for Solace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Solace
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing local input
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or rejected credential
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Network or backend failure, including mid-stream interruption
    #[error("transport error: {0}")]
    Transport(String),

    /// Playback sink and TTS configuration disagree on sampling rate
    #[error("sampling rate mismatch: sink plays at {sink} Hz, TTS configured for {config} Hz")]
    ConfigMismatch { sink: u32, config: u32 },

    /// Operation cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Transport error for a remote call that exceeded its time limit
    #[must_use]
    pub fn timed_out(what: &str, limit: Duration) -> Self {
        Self::Transport(format!("{what} timed out after {limit:?}"))
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub const fn is_config_mismatch(&self) -> bool {
        matches!(self, Self::ConfigMismatch { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Transport(format!("request timed out: {e}"));
        }
        Self::Transport(e.to_string())
    }
}

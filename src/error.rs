//! Error types for Chanchito

use thiserror::Error;

/// Result type alias for Chanchito operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Chanchito
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Gyro sensor error
    #[error("sensor error: {0}")]
    Sensor(String),

    /// Push button error
    #[error("button error: {0}")]
    Button(String),

    /// Serial face display error
    #[error("face display error: {0}")]
    Face(String),

    /// Finance backend error
    #[error("backend error: {0}")]
    Backend(String),

    /// Chat completion error
    #[error("narrator error: {0}")]
    Narrator(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Malformed recording
    #[error("replay error at line {line}: {message}")]
    Replay {
        /// 1-based line number in the recording
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

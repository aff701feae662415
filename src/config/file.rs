//! TOML configuration file loading
//!
//! Supports `~/.config/chanchito/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.
//!
//! ```toml
//! trigger = "both"
//!
//! [gesture]
//! high_threshold = 250.0
//! low_threshold = 30.0
//! max_window_ms = 3000
//!
//! [face]
//! port = "/dev/ttyS0"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::sampler::TriggerMode;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ChanchitoConfigFile {
    /// Which inputs start the announcement
    #[serde(default)]
    pub trigger: Option<TriggerMode>,

    /// Gesture calibration
    #[serde(default)]
    pub gesture: GestureFileConfig,

    /// Sampling loop and sensor bus
    #[serde(default)]
    pub sampler: SamplerFileConfig,

    /// Serial face display
    #[serde(default)]
    pub face: FaceFileConfig,

    /// Push button
    #[serde(default)]
    pub button: ButtonFileConfig,

    /// Finance backend
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Chat and speech provider
    #[serde(default)]
    pub openai: OpenAiFileConfig,
}

/// Gesture calibration
#[derive(Debug, Default, Deserialize)]
pub struct GestureFileConfig {
    /// Peak threshold in °/s
    pub high_threshold: Option<f64>,
    /// Trough threshold in °/s
    pub low_threshold: Option<f64>,
    /// First peak to second peak, in milliseconds
    pub max_window_ms: Option<u64>,
    /// Quiet period after a gesture, in milliseconds
    pub cooldown_ms: Option<u64>,
}

/// Sampling loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct SamplerFileConfig {
    /// Sampling period in milliseconds
    pub interval_ms: Option<u64>,
    /// I2C bus number
    pub i2c_bus: Option<u8>,
    /// MPU6050 address
    pub i2c_address: Option<u16>,
}

/// Face display configuration
#[derive(Debug, Default, Deserialize)]
pub struct FaceFileConfig {
    /// Send status codes to the display
    pub enabled: Option<bool>,
    /// Serial device path
    pub port: Option<String>,
    /// Baud rate
    pub baud: Option<u32>,
    /// Wait after opening the port, in milliseconds
    pub boot_delay_ms: Option<u64>,
}

/// Push button configuration
#[derive(Debug, Default, Deserialize)]
pub struct ButtonFileConfig {
    /// BCM pin number
    pub pin: Option<u8>,
    /// Press confirmation delay in milliseconds
    pub debounce_ms: Option<u64>,
}

/// Finance backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Base URL of the backend functions
    pub function_url: Option<String>,
    /// The child's account id
    pub user_id: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// `OpenAI` configuration
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiFileConfig {
    /// API key; prefer `OPENAI_API_KEY` in the environment
    pub api_key: Option<String>,
    /// Chat model that writes the reply
    pub chat_model: Option<String>,
    /// Completion budget for the reply
    pub max_tokens: Option<u32>,
    /// Chat request timeout in milliseconds
    pub chat_timeout_ms: Option<u64>,
    /// Speech model
    pub tts_model: Option<String>,
    /// Speech voice
    pub tts_voice: Option<String>,
    /// Playback speed, 1.0 is normal
    pub tts_speed: Option<f32>,
    /// Speech request timeout in milliseconds
    pub tts_timeout_ms: Option<u64>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the contents are not valid TOML for this schema
pub fn parse_config_file(content: &str) -> Result<ChanchitoConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load an explicitly requested config file
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_config_file_from(path: &Path) -> Result<ChanchitoConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config_file(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the TOML config file from the standard path
///
/// Returns `ChanchitoConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ChanchitoConfigFile {
    let Some(path) = config_file_path() else {
        return ChanchitoConfigFile::default();
    };

    if !path.exists() {
        return ChanchitoConfigFile::default();
    }

    match load_config_file_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ChanchitoConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/chanchito/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("chanchito").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = parse_config_file("").unwrap();
        assert!(config.trigger.is_none());
        assert!(config.gesture.high_threshold.is_none());
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_sections_parse() {
        let config = parse_config_file(
            r#"
            trigger = "both"

            [gesture]
            high_threshold = 200.0
            max_window_ms = 2500

            [face]
            enabled = false
            port = "/dev/ttyAMA0"

            [backend]
            function_url = "https://example.test/functions/v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.trigger, Some(TriggerMode::Both));
        assert_eq!(config.gesture.high_threshold, Some(200.0));
        assert_eq!(config.gesture.max_window_ms, Some(2500));
        assert_eq!(config.face.enabled, Some(false));
        assert_eq!(config.face.port.as_deref(), Some("/dev/ttyAMA0"));
        assert!(config.backend.function_url.is_some());
    }

    #[test]
    fn test_bad_trigger_rejected() {
        assert!(parse_config_file("trigger = \"shake\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_file_from(&dir.path().join("nope.toml")).is_err());
    }
}

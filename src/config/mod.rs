//! Configuration management for Chanchito
//!
//! Values are layered env > TOML file > defaults. The environment names
//! match the ones the device's `.env` already uses (`SERIAL_PORT`,
//! `SUPABASE_FUNCTION_URL`, `USUARIO_ID`, `OPENAI_API_KEY`).

pub mod file;

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::action::{finance, narrator};
use crate::gesture::GestureConfig;
use crate::sampler::{DEFAULT_INTERVAL, TriggerMode};
use crate::{Error, Result, button, face, voice};

pub use file::{ChanchitoConfigFile, config_file_path};

/// Default I2C bus on the Raspberry Pi header
pub const DEFAULT_I2C_BUS: u8 = 1;

/// Chanchito configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Which inputs start the announcement
    pub trigger: TriggerMode,

    /// Validated gesture calibration
    pub gesture: GestureConfig,

    /// Sampling loop configuration
    pub sampler: SamplerConfig,

    /// Serial face display
    pub face: FaceConfig,

    /// Push button
    pub button: ButtonConfig,

    /// Finance backend
    pub backend: BackendConfig,

    /// Chat and speech provider
    pub openai: OpenAiConfig,
}

/// Sampling loop configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Sampling period
    pub interval: Duration,
    /// I2C bus number
    pub i2c_bus: u8,
    /// MPU6050 address
    pub i2c_address: u16,
}

/// Serial face display configuration
#[derive(Debug, Clone)]
pub struct FaceConfig {
    /// Send status codes to the display
    pub enabled: bool,
    /// Serial device path
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Wait after opening the port
    pub boot_delay: Duration,
}

/// Push button configuration
#[derive(Debug, Clone)]
pub struct ButtonConfig {
    /// BCM pin number
    pub pin: u8,
    /// Press confirmation delay
    pub debounce: Duration,
}

/// Finance backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend functions (`SUPABASE_FUNCTION_URL`)
    pub function_url: Option<String>,
    /// The child's account id (`USUARIO_ID`)
    pub user_id: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

/// `OpenAI` configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (`OPENAI_API_KEY`)
    pub api_key: Option<String>,
    /// Chat model that writes the reply
    pub chat_model: String,
    /// Completion budget for the reply
    pub max_tokens: u32,
    /// Chat request timeout
    pub chat_timeout: Duration,
    /// Speech model
    pub tts_model: String,
    /// Speech voice
    pub tts_voice: String,
    /// Playback speed, 1.0 is normal
    pub tts_speed: f32,
    /// Speech request timeout
    pub tts_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment and a config file
    ///
    /// With `path`, that file must exist and parse. Without it, the
    /// default file is used when present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded, or a
    /// value is malformed or out of range
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => file::load_config_file_from(path)?,
            None => file::load_config_file(),
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or out of range
    pub fn from_sources<F>(fc: ChanchitoConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let trigger = env
            .parse("CHANCHITO_TRIGGER")?
            .or(fc.trigger)
            .unwrap_or_default();

        // Gesture calibration (env > toml > default), validated as a whole
        let high = env
            .parse("CHANCHITO_HIGH_THRESHOLD")?
            .or(fc.gesture.high_threshold)
            .unwrap_or(GestureConfig::DEFAULT_HIGH_THRESHOLD);
        let low = env
            .parse("CHANCHITO_LOW_THRESHOLD")?
            .or(fc.gesture.low_threshold)
            .unwrap_or(GestureConfig::DEFAULT_LOW_THRESHOLD);
        let max_window = env
            .millis("CHANCHITO_MAX_WINDOW_MS")?
            .or(fc.gesture.max_window_ms.map(Duration::from_millis))
            .unwrap_or(GestureConfig::DEFAULT_MAX_WINDOW);
        let cooldown = env
            .millis("CHANCHITO_COOLDOWN_MS")?
            .or(fc.gesture.cooldown_ms.map(Duration::from_millis))
            .unwrap_or(GestureConfig::DEFAULT_COOLDOWN);
        let gesture = GestureConfig::new(high, low, max_window, cooldown)?;

        let interval = env
            .millis("CHANCHITO_SAMPLE_INTERVAL_MS")?
            .or(fc.sampler.interval_ms.map(Duration::from_millis))
            .unwrap_or(DEFAULT_INTERVAL);
        if interval.is_zero() {
            return Err(Error::Config("sample interval must be non-zero".to_string()));
        }
        let sampler = SamplerConfig {
            interval,
            i2c_bus: env
                .parse("CHANCHITO_I2C_BUS")?
                .or(fc.sampler.i2c_bus)
                .unwrap_or(DEFAULT_I2C_BUS),
            i2c_address: fc
                .sampler
                .i2c_address
                .unwrap_or(crate::sensor::mpu6050::DEFAULT_ADDRESS),
        };

        let face = FaceConfig {
            enabled: fc.face.enabled.unwrap_or(true),
            port: env
                .string("SERIAL_PORT")
                .or(fc.face.port)
                .unwrap_or_else(|| face::DEFAULT_PORT.to_string()),
            baud: env
                .parse("SERIAL_BAUDRATE")?
                .or(fc.face.baud)
                .unwrap_or(face::DEFAULT_BAUD),
            boot_delay: fc
                .face
                .boot_delay_ms
                .map_or(face::DEFAULT_BOOT_DELAY, Duration::from_millis),
        };

        let button = ButtonConfig {
            pin: env
                .parse("CHANCHITO_BUTTON_PIN")?
                .or(fc.button.pin)
                .unwrap_or(button::DEFAULT_PIN),
            debounce: fc
                .button
                .debounce_ms
                .map_or(button::DEFAULT_DEBOUNCE, Duration::from_millis),
        };

        let backend = BackendConfig {
            function_url: env.string("SUPABASE_FUNCTION_URL").or(fc.backend.function_url),
            user_id: env.string("USUARIO_ID").or(fc.backend.user_id),
            timeout: fc
                .backend
                .timeout_ms
                .map_or(finance::DEFAULT_TIMEOUT, Duration::from_millis),
        };

        let openai = OpenAiConfig {
            api_key: env.string("OPENAI_API_KEY").or(fc.openai.api_key),
            chat_model: env
                .string("CHANCHITO_CHAT_MODEL")
                .or(fc.openai.chat_model)
                .unwrap_or_else(|| narrator::DEFAULT_MODEL.to_string()),
            max_tokens: fc.openai.max_tokens.unwrap_or(narrator::DEFAULT_MAX_TOKENS),
            chat_timeout: fc
                .openai
                .chat_timeout_ms
                .map_or(narrator::DEFAULT_TIMEOUT, Duration::from_millis),
            tts_model: env
                .string("CHANCHITO_TTS_MODEL")
                .or(fc.openai.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env
                .string("CHANCHITO_TTS_VOICE")
                .or(fc.openai.tts_voice)
                .unwrap_or_else(|| "fable".to_string()),
            tts_speed: fc.openai.tts_speed.unwrap_or(1.0),
            tts_timeout: fc
                .openai
                .tts_timeout_ms
                .map_or(voice::TTS_TIMEOUT, Duration::from_millis),
        };

        Ok(Self {
            trigger,
            gesture,
            sampler,
            face,
            button,
            backend,
            openai,
        })
    }
}

/// Environment lookup; blank values count as unset
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.string(key)
            .map(|v| {
                v.parse()
                    .map_err(|e| Error::Config(format!("invalid {key}={v}: {e}")))
            })
            .transpose()
    }

    fn millis(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_millis))
    }
}

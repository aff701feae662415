//! Chanchito - a talking piggy bank
//!
//! This library provides the core functionality for the piggy bank:
//! - Double-shake gesture recognition from a gyroscope
//! - Push-button trigger
//! - Status codes for the serial face display
//! - Looking up the latest movement and speaking it
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Inputs                          │
//! │        MPU6050 gyro (I2C)  │  Push button (GPIO)     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Sampler                          │
//! │   GestureDetector  │  ButtonDebouncer  │  Face       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                      Action                          │
//! │   Finance backend  │  Narrator (chat)  │  TTS        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod button;
pub mod config;
pub mod error;
pub mod face;
pub mod gesture;
pub mod replay;
pub mod sampler;
pub mod sensor;
pub mod voice;

pub use action::{Action, BalanceAnnouncer, LogAction, Trigger};
pub use config::Config;
pub use error::{Error, Result};
pub use face::{FaceStatus, StatusSink};
pub use gesture::{
    DetectorState, DetectorStats, GestureConfig, GestureDetector, MatchEvent, Phase, Sample,
};
pub use sampler::{Sampler, SamplerReport, TriggerMode};
pub use sensor::{GyroReading, GyroSource};
pub use voice::Speaker;

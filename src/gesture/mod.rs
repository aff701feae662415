//! Gesture recognition
//!
//! Turns a stream of gyro magnitudes into discrete "double shake" events.
//! Time is expressed as a [`Duration`] since a session origin (the sampler's
//! start, or the zero of a recording) so detection is deterministic.

mod detector;

use std::time::Duration;

pub use detector::{DetectorState, DetectorStats, GestureDetector, Phase};

use crate::{Error, Result};

/// A single magnitude reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Time since the session origin
    pub at: Duration,
    /// Scalar motion intensity, in the same units as the thresholds
    pub magnitude: f64,
}

impl Sample {
    /// Create a sample
    #[must_use]
    pub const fn new(at: Duration, magnitude: f64) -> Self {
        Self { at, magnitude }
    }

    /// Create a sample stamped with fractional seconds
    ///
    /// # Panics
    ///
    /// Panics if `secs` is negative or not finite
    #[must_use]
    pub fn at_secs(secs: f64, magnitude: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs), magnitude)
    }

    /// Whether the magnitude is usable for threshold comparison
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.magnitude.is_finite() && self.magnitude >= 0.0
    }
}

/// Emitted once per completed peak → trough → peak sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchEvent {
    /// When the first peak armed the detector
    pub started_at: Duration,
    /// When the second peak completed the sequence
    pub completed_at: Duration,
}

impl MatchEvent {
    /// Time taken to perform the gesture
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.completed_at.saturating_sub(self.started_at)
    }
}

/// Detector calibration
///
/// Validated on construction: `0 <= low < high`, both finite, and a
/// non-zero match window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    high_threshold: f64,
    low_threshold: f64,
    max_window: Duration,
    cooldown: Duration,
}

impl GestureConfig {
    /// Peak threshold in °/s
    pub const DEFAULT_HIGH_THRESHOLD: f64 = 250.0;
    /// Trough threshold in °/s
    pub const DEFAULT_LOW_THRESHOLD: f64 = 30.0;
    /// Time allowed from first peak to second peak
    pub const DEFAULT_MAX_WINDOW: Duration = Duration::from_secs(3);
    /// Quiet period after a completed gesture
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

    /// Create a validated configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the thresholds are not finite, if
    /// `low_threshold` is negative or not below `high_threshold`, or if
    /// `max_window` is zero
    pub fn new(
        high_threshold: f64,
        low_threshold: f64,
        max_window: Duration,
        cooldown: Duration,
    ) -> Result<Self> {
        if !high_threshold.is_finite() || !low_threshold.is_finite() {
            return Err(Error::Config(format!(
                "gesture thresholds must be finite (high={high_threshold}, low={low_threshold})"
            )));
        }
        if high_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "high threshold must be positive, got {high_threshold}"
            )));
        }
        if low_threshold < 0.0 || low_threshold >= high_threshold {
            return Err(Error::Config(format!(
                "low threshold must satisfy 0 <= low < high (high={high_threshold}, low={low_threshold})"
            )));
        }
        if max_window.is_zero() {
            return Err(Error::Config("gesture window must be non-zero".to_string()));
        }

        Ok(Self {
            high_threshold,
            low_threshold,
            max_window,
            cooldown,
        })
    }

    /// Peak threshold (strictly exceeded to count)
    #[must_use]
    pub const fn high_threshold(&self) -> f64 {
        self.high_threshold
    }

    /// Trough threshold (strictly undercut to count)
    #[must_use]
    pub const fn low_threshold(&self) -> f64 {
        self.low_threshold
    }

    /// Maximum time from first peak to completion
    #[must_use]
    pub const fn max_window(&self) -> Duration {
        self.max_window
    }

    /// Quiet period before the detector may arm again
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            max_window: Self::DEFAULT_MAX_WINDOW,
            cooldown: Self::DEFAULT_COOLDOWN,
        }
    }
}

//! Double-shake sequence detector
//!
//! Recognizes peak → trough → peak in the gyro magnitude within a bounded
//! window.
//!
//! ```text
//!          m > high             m < low              m > high
//!  Idle ────────────► AwaitingFall ────────► AwaitingRise ────────► Idle + MatchEvent
//!   ▲                      │                      │
//!   └──── now - started_at > max_window ──────────┘
//! ```
//!
//! The timeout check runs before the transition table and consumes the
//! sample: a peak arriving on the same tick that expires a stale sequence
//! does not arm a new one.

use std::time::Duration;

use super::{GestureConfig, MatchEvent, Sample};

/// Position within the recognition sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first peak
    Idle,
    /// First peak seen, waiting for the magnitude to drop
    AwaitingFall,
    /// Trough seen, waiting for the second peak
    AwaitingRise,
}

/// State of the gesture detector
///
/// The sequence start lives inside the armed variants, so it is present
/// exactly when the detector is not idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for the first peak
    Idle,
    /// Armed by a peak at `started_at`
    AwaitingFall {
        /// Time of the first peak
        started_at: Duration,
    },
    /// Trough seen; the window still counts from `started_at`
    AwaitingRise {
        /// Time of the first peak
        started_at: Duration,
    },
}

impl DetectorState {
    /// Current phase
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::AwaitingFall { .. } => Phase::AwaitingFall,
            Self::AwaitingRise { .. } => Phase::AwaitingRise,
        }
    }

    /// Start of the current sequence, if armed
    #[must_use]
    pub const fn started_at(self) -> Option<Duration> {
        match self {
            Self::Idle => None,
            Self::AwaitingFall { started_at } | Self::AwaitingRise { started_at } => {
                Some(started_at)
            }
        }
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    /// Sequences started by a first peak
    pub armed: u64,
    /// Sequences abandoned because the window expired
    pub timeouts: u64,
    /// Completed gestures
    pub matches: u64,
    /// Samples skipped for a NaN, infinite or negative magnitude
    pub ignored: u64,
}

/// Detects the double-shake gesture
///
/// Owns its state; drive it from a single sampling loop. [`observe`] never
/// blocks and never fails.
///
/// [`observe`]: GestureDetector::observe
#[derive(Debug, Clone)]
pub struct GestureDetector {
    config: GestureConfig,
    state: DetectorState,
    quiet_until: Option<Duration>,
    stats: DetectorStats,
}

impl GestureDetector {
    /// Create an idle detector
    #[must_use]
    pub const fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            quiet_until: None,
            stats: DetectorStats {
                armed: 0,
                timeouts: 0,
                matches: 0,
                ignored: 0,
            },
        }
    }

    /// Feed one sample
    ///
    /// Returns a [`MatchEvent`] when this sample completes the gesture.
    ///
    /// A timestamp earlier than the sequence start counts as zero elapsed
    /// time, so clock jitter never expires a sequence early. Malformed
    /// magnitudes cross neither threshold but still let an expired
    /// sequence time out.
    pub fn observe(&mut self, sample: Sample) -> Option<MatchEvent> {
        if let Some(started_at) = self.state.started_at() {
            let elapsed = sample.at.saturating_sub(started_at);
            if elapsed > self.config.max_window() {
                tracing::debug!(
                    elapsed_ms = elapsed.as_millis(),
                    phase = ?self.state.phase(),
                    "gesture window expired, resetting"
                );
                self.state = DetectorState::Idle;
                self.stats.timeouts += 1;
                return None;
            }
        }

        if !sample.is_well_formed() {
            self.stats.ignored += 1;
            tracing::trace!(magnitude = sample.magnitude, "ignoring malformed magnitude");
            return None;
        }

        let magnitude = sample.magnitude;

        match self.state {
            DetectorState::Idle => {
                if magnitude > self.config.high_threshold() && !self.is_cooling_down(sample.at) {
                    self.state = DetectorState::AwaitingFall {
                        started_at: sample.at,
                    };
                    self.stats.armed += 1;
                    tracing::debug!(magnitude, "first peak, waiting for fall");
                }
            }
            DetectorState::AwaitingFall { started_at } => {
                if magnitude < self.config.low_threshold() {
                    self.state = DetectorState::AwaitingRise { started_at };
                    tracing::debug!(magnitude, "fall confirmed, waiting for second peak");
                }
            }
            DetectorState::AwaitingRise { started_at } => {
                if magnitude > self.config.high_threshold() {
                    self.state = DetectorState::Idle;
                    self.stats.matches += 1;
                    self.quiet_until = Some(sample.at.saturating_add(self.config.cooldown()));

                    let event = MatchEvent {
                        started_at,
                        completed_at: sample.at,
                    };
                    tracing::debug!(
                        magnitude,
                        duration_ms = event.duration().as_millis(),
                        "second peak, gesture matched"
                    );
                    return Some(event);
                }
            }
        }

        None
    }

    /// Restart the quiet period from `at`
    ///
    /// Call when the downstream action finishes so handling the device
    /// during the action is not read as a new gesture.
    pub fn begin_cooldown(&mut self, at: Duration) {
        self.quiet_until = Some(at.saturating_add(self.config.cooldown()));
    }

    /// Whether a peak at `at` would be ignored because of the cooldown
    #[must_use]
    pub fn is_cooling_down(&self, at: Duration) -> bool {
        self.quiet_until.is_some_and(|until| at < until)
    }

    /// Abandon any sequence in progress
    ///
    /// The cooldown is left untouched.
    pub const fn reset(&mut self) {
        self.state = DetectorState::Idle;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Start of the sequence in progress
    #[must_use]
    pub const fn sequence_started_at(&self) -> Option<Duration> {
        self.state.started_at()
    }

    /// Calibration in use
    #[must_use]
    pub const fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Diagnostic counters
    #[must_use]
    pub const fn stats(&self) -> DetectorStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> GestureDetector {
        let config =
            GestureConfig::new(250.0, 30.0, Duration::from_secs(3), Duration::ZERO).unwrap();
        GestureDetector::new(config)
    }

    fn feed(detector: &mut GestureDetector, samples: &[(f64, f64)]) -> Vec<MatchEvent> {
        samples
            .iter()
            .filter_map(|&(t, m)| detector.observe(Sample::at_secs(t, m)))
            .collect()
    }

    #[test]
    fn test_full_sequence_matches_once() {
        let mut d = detector();
        let events = feed(&mut d, &[(0.0, 300.0), (0.5, 10.0), (1.0, 300.0)]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].completed_at, Duration::from_secs(1));
        assert_eq!(events[0].started_at, Duration::ZERO);
        assert_eq!(d.phase(), Phase::Idle);
        assert_eq!(d.sequence_started_at(), None);
    }

    #[test]
    fn test_late_second_peak_times_out() {
        let mut d = detector();
        let events = feed(&mut d, &[(0.0, 300.0), (0.5, 10.0), (3.5, 300.0)]);

        assert!(events.is_empty());
        assert_eq!(d.phase(), Phase::Idle);
        assert_eq!(d.stats().timeouts, 1);
    }

    #[test]
    fn test_timeout_consumes_the_tick() {
        let mut d = detector();
        feed(&mut d, &[(0.0, 300.0), (0.5, 10.0)]);

        // The peak that expires the window does not re-arm
        assert!(d.observe(Sample::at_secs(3.5, 300.0)).is_none());
        assert_eq!(d.phase(), Phase::Idle);

        // The next peak does
        d.observe(Sample::at_secs(3.55, 300.0));
        assert_eq!(d.phase(), Phase::AwaitingFall);
        assert_eq!(d.sequence_started_at(), Some(Duration::from_secs_f64(3.55)));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut d = detector();
        let events = feed(&mut d, &[(0.0, 300.0), (1.0, 10.0), (3.0, 300.0)]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_repeated_peak_does_not_restart_window() {
        let mut d = detector();
        feed(&mut d, &[(0.0, 300.0), (0.1, 300.0)]);
        assert_eq!(d.sequence_started_at(), Some(Duration::ZERO));

        let events = feed(&mut d, &[(0.5, 10.0), (0.6, 300.0)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].started_at, Duration::ZERO);
        assert_eq!(d.stats().armed, 1);
    }

    #[test]
    fn test_mid_band_signal_never_arms() {
        let mut d = detector();
        for i in 0..200 {
            assert!(d.observe(Sample::at_secs(f64::from(i) * 0.05, 100.0)).is_none());
            assert_eq!(d.state(), DetectorState::Idle);
        }
    }

    #[test]
    fn test_non_crossing_sample_is_idempotent() {
        let mut d = detector();
        d.observe(Sample::at_secs(0.0, 300.0));
        let before = d.state();

        let sample = Sample::at_secs(0.2, 120.0);
        d.observe(sample);
        assert_eq!(d.state(), before);
        d.observe(sample);
        assert_eq!(d.state(), before);
    }

    #[test]
    fn test_threshold_equality_does_not_transition() {
        let mut d = detector();
        d.observe(Sample::at_secs(0.0, 250.0));
        assert_eq!(d.phase(), Phase::Idle);

        d.observe(Sample::at_secs(0.1, 251.0));
        d.observe(Sample::at_secs(0.2, 30.0));
        assert_eq!(d.phase(), Phase::AwaitingFall);

        d.observe(Sample::at_secs(0.3, 29.9));
        assert_eq!(d.phase(), Phase::AwaitingRise);
        assert!(d.observe(Sample::at_secs(0.4, 250.0)).is_none());
        assert!(d.observe(Sample::at_secs(0.5, 250.1)).is_some());
    }

    #[test]
    fn test_peak_while_awaiting_fall_is_ignored() {
        let mut d = detector();
        feed(&mut d, &[(0.0, 300.0), (0.2, 400.0), (0.4, 500.0)]);
        assert_eq!(d.phase(), Phase::AwaitingFall);
    }

    #[test]
    fn test_malformed_magnitudes_cross_nothing() {
        let mut d = detector();
        d.observe(Sample::at_secs(0.0, f64::NAN));
        d.observe(Sample::at_secs(0.1, f64::INFINITY));
        assert_eq!(d.phase(), Phase::Idle);

        d.observe(Sample::at_secs(0.2, 300.0));
        // Negative would otherwise undercut the low threshold
        d.observe(Sample::at_secs(0.3, -5.0));
        assert_eq!(d.phase(), Phase::AwaitingFall);
        assert_eq!(d.stats().ignored, 3);
    }

    #[test]
    fn test_malformed_sample_still_times_out() {
        let mut d = detector();
        d.observe(Sample::at_secs(0.0, 300.0));
        d.observe(Sample::at_secs(4.0, f64::NAN));
        assert_eq!(d.phase(), Phase::Idle);
        assert_eq!(d.stats().timeouts, 1);
    }

    #[test]
    fn test_backwards_timestamp_counts_as_no_elapsed_time() {
        let mut d = detector();
        d.observe(Sample::at_secs(2.0, 300.0));
        d.observe(Sample::at_secs(1.0, 10.0));
        assert_eq!(d.phase(), Phase::AwaitingRise);

        let event = d.observe(Sample::at_secs(1.5, 300.0)).unwrap();
        assert_eq!(event.duration(), Duration::ZERO);
    }

    #[test]
    fn test_cooldown_blocks_rearming() {
        let config = GestureConfig::new(
            250.0,
            30.0,
            Duration::from_secs(3),
            Duration::from_secs(2),
        )
        .unwrap();
        let mut d = GestureDetector::new(config);
        let events = feed(&mut d, &[(0.0, 300.0), (0.5, 10.0), (1.0, 300.0)]);
        assert_eq!(events.len(), 1);

        d.observe(Sample::at_secs(1.05, 300.0));
        assert!(d.is_cooling_down(Duration::from_secs_f64(2.9)));
        assert_eq!(d.phase(), Phase::Idle);

        d.observe(Sample::at_secs(3.0, 300.0));
        assert_eq!(d.phase(), Phase::AwaitingFall);
    }

    #[test]
    fn test_begin_cooldown_extends_quiet_period() {
        let config = GestureConfig::new(
            250.0,
            30.0,
            Duration::from_secs(3),
            Duration::from_secs(2),
        )
        .unwrap();
        let mut d = GestureDetector::new(config);
        assert!(!d.is_cooling_down(Duration::ZERO));

        d.begin_cooldown(Duration::from_secs(10));
        d.observe(Sample::at_secs(11.0, 300.0));
        assert_eq!(d.phase(), Phase::Idle);
        d.observe(Sample::at_secs(12.0, 300.0));
        assert_eq!(d.phase(), Phase::AwaitingFall);
    }

    #[test]
    fn test_reset_abandons_sequence() {
        let mut d = detector();
        feed(&mut d, &[(0.0, 300.0), (0.5, 10.0)]);
        d.reset();
        assert_eq!(d.state(), DetectorState::Idle);
        assert!(d.observe(Sample::at_secs(0.6, 300.0)).is_none());
        assert_eq!(d.phase(), Phase::AwaitingFall);
    }

    #[test]
    fn test_state_accessors() {
        let started_at = Duration::from_millis(40);
        assert_eq!(DetectorState::Idle.started_at(), None);
        assert_eq!(
            DetectorState::AwaitingRise { started_at }.started_at(),
            Some(started_at)
        );
        assert_eq!(
            DetectorState::AwaitingFall { started_at }.phase(),
            Phase::AwaitingFall
        );
    }
}

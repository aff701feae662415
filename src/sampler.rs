//! Polling loop
//!
//! Reads the gyro at a fixed rate, feeds the detector and runs the action
//! when a trigger fires. Everything happens on one task: sampling pauses
//! while the action runs, so a trigger can never overlap another.

use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior};

use crate::action::{Action, Trigger};
use crate::button::{ButtonDebouncer, ButtonInput};
use crate::face::{FaceStatus, StatusSink};
use crate::gesture::{DetectorStats, GestureDetector, Sample};
use crate::sensor::GyroSource;
use crate::{Error, Result};

/// Default sampling period
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

/// Which inputs start the action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Double shake only
    #[default]
    Gesture,
    /// Push button only; the gyro is not read
    Button,
    /// Either input
    Both,
}

impl TriggerMode {
    /// Whether the gyro should be sampled
    #[must_use]
    pub const fn uses_gesture(self) -> bool {
        matches!(self, Self::Gesture | Self::Both)
    }

    /// Whether the button should be polled
    #[must_use]
    pub const fn uses_button(self) -> bool {
        matches!(self, Self::Button | Self::Both)
    }
}

impl FromStr for TriggerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gesture" => Ok(Self::Gesture),
            "button" => Ok(Self::Button),
            "both" => Ok(Self::Both),
            other => Err(Error::Config(format!(
                "unknown trigger mode '{other}' (expected gesture, button or both)"
            ))),
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gesture => "gesture",
            Self::Button => "button",
            Self::Both => "both",
        })
    }
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerReport {
    /// Ticks processed
    pub ticks: u64,
    /// Gyro reads that failed
    pub read_errors: u64,
    /// Button reads that failed
    pub button_errors: u64,
    /// Face updates that failed
    pub face_errors: u64,
    /// Actions started
    pub triggers: u64,
    /// Actions that returned an error
    pub actions_failed: u64,
    /// Actions abandoned because shutdown was requested
    pub actions_cancelled: u64,
    /// Detector counters at shutdown
    pub detector: DetectorStats,
}

struct ButtonTrigger {
    input: Box<dyn ButtonInput>,
    debouncer: ButtonDebouncer,
}

/// Drives the detector from a gyro source
pub struct Sampler<S, F, A> {
    detector: GestureDetector,
    source: S,
    face: F,
    action: A,
    interval: Duration,
    mode: TriggerMode,
    button: Option<ButtonTrigger>,
    report: SamplerReport,
    failing_reads: u64,
}

impl<S, F, A> Sampler<S, F, A>
where
    S: GyroSource,
    F: StatusSink,
    A: Action,
{
    /// Create a gesture-only sampler at the default rate
    #[must_use]
    pub fn new(detector: GestureDetector, source: S, face: F, action: A) -> Self {
        Self {
            detector,
            source,
            face,
            action,
            interval: DEFAULT_INTERVAL,
            mode: TriggerMode::Gesture,
            button: None,
            report: SamplerReport::default(),
            failing_reads: 0,
        }
    }

    /// Set the sampling period (at least 1 ms)
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Attach a push button
    #[must_use]
    pub fn with_button(mut self, input: Box<dyn ButtonInput>, debouncer: ButtonDebouncer) -> Self {
        self.button = Some(ButtonTrigger { input, debouncer });
        self
    }

    /// Choose which inputs trigger the action
    #[must_use]
    pub fn with_trigger_mode(mut self, mode: TriggerMode) -> Self {
        self.mode = mode;
        self
    }

    /// The detector being driven
    #[must_use]
    pub const fn detector(&self) -> &GestureDetector {
        &self.detector
    }

    /// Run until `shutdown` resolves
    ///
    /// The face shows `Normal` while listening and `Off` once the loop
    /// ends. Sensor, button, face and action failures are logged and the
    /// loop carries on. A running action is dropped as soon as `shutdown`
    /// resolves.
    #[allow(clippy::future_not_send)]
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> SamplerReport {
        if self.mode.uses_button() && self.button.is_none() {
            tracing::warn!(mode = %self.mode, "button trigger requested but no button attached");
        }

        let origin = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.set_face(FaceStatus::Normal);
        tracing::info!(
            mode = %self.mode,
            interval_ms = self.interval.as_millis(),
            "listening for triggers"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(trigger) = self.tick(origin.elapsed()) else {
                        continue;
                    };
                    if self.handle(trigger, origin, shutdown.as_mut()).await.is_break() {
                        break;
                    }
                }
            }
        }

        self.set_face(FaceStatus::Off);

        self.report.detector = self.detector.stats();
        tracing::info!(
            ticks = self.report.ticks,
            triggers = self.report.triggers,
            read_errors = self.report.read_errors,
            actions_failed = self.report.actions_failed,
            actions_cancelled = self.report.actions_cancelled,
            "sampler stopped"
        );
        self.report
    }

    /// Process one tick, returning the trigger it produced
    ///
    /// A gesture takes precedence when both inputs fire on the same tick.
    fn tick(&mut self, at: Duration) -> Option<Trigger> {
        self.report.ticks += 1;

        let gesture = if self.mode.uses_gesture() {
            self.sample_gesture(at)
        } else {
            None
        };

        let pressed = if self.mode.uses_button() {
            self.poll_button(at)
        } else {
            false
        };

        gesture.or_else(|| pressed.then_some(Trigger::Button { at }))
    }

    fn sample_gesture(&mut self, at: Duration) -> Option<Trigger> {
        let reading = match self.source.read_gyro() {
            Ok(reading) => {
                if self.failing_reads > 0 {
                    tracing::info!(failed = self.failing_reads, "gyro readings recovered");
                    self.failing_reads = 0;
                }
                reading
            }
            Err(e) => {
                self.report.read_errors += 1;
                if self.failing_reads == 0 {
                    tracing::warn!(error = %e, "gyro read failed, skipping sample");
                } else {
                    tracing::debug!(error = %e, "gyro read failed");
                }
                self.failing_reads += 1;
                return None;
            }
        };

        let sample = Sample::new(at, reading.magnitude());
        if !sample.magnitude.is_finite() {
            tracing::warn!(
                x = reading.x,
                y = reading.y,
                z = reading.z,
                "non-finite gyro magnitude"
            );
        }
        tracing::trace!(magnitude = sample.magnitude, at_ms = at.as_millis(), "sample");

        self.detector.observe(sample).map(|event| {
            tracing::info!(
                duration_ms = event.duration().as_millis(),
                "double shake detected"
            );
            Trigger::Gesture(event)
        })
    }

    fn poll_button(&mut self, at: Duration) -> bool {
        let Some(button) = self.button.as_mut() else {
            return false;
        };

        match button.input.is_pressed() {
            Ok(level) => {
                let fired = button.debouncer.update(level, at);
                if fired {
                    tracing::info!("button pressed");
                }
                fired
            }
            Err(e) => {
                self.report.button_errors += 1;
                tracing::warn!(error = %e, "button read failed");
                false
            }
        }
    }

    /// Run the action for `trigger`, racing it against `shutdown`
    ///
    /// Breaks when shutdown won; `shutdown` has then completed and must not
    /// be polled again.
    #[allow(clippy::future_not_send)]
    async fn handle<D>(
        &mut self,
        trigger: Trigger,
        origin: Instant,
        shutdown: Pin<&mut D>,
    ) -> ControlFlow<()>
    where
        D: Future<Output = ()>,
    {
        self.report.triggers += 1;
        self.set_face(FaceStatus::Processing);

        let outcome = tokio::select! {
            result = self.action.run(&trigger) => Some(result),
            () = shutdown => None,
        };

        match outcome {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                self.report.actions_failed += 1;
                tracing::error!(error = %e, trigger = trigger.kind(), "action failed");
            }
            None => {
                self.report.actions_cancelled += 1;
                tracing::info!(trigger = trigger.kind(), "shutdown requested, action abandoned");
                return ControlFlow::Break(());
            }
        }

        self.set_face(FaceStatus::Normal);

        // Motion while the action ran is just the device being handled
        self.detector.reset();
        self.detector.begin_cooldown(origin.elapsed());
        ControlFlow::Continue(())
    }

    fn set_face(&mut self, status: FaceStatus) {
        if let Err(e) = self.face.send(status) {
            self.report.face_errors += 1;
            tracing::warn!(error = %e, %status, "face update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_mode_parse() {
        assert_eq!("gesture".parse::<TriggerMode>().unwrap(), TriggerMode::Gesture);
        assert_eq!(" Button ".parse::<TriggerMode>().unwrap(), TriggerMode::Button);
        assert_eq!("BOTH".parse::<TriggerMode>().unwrap(), TriggerMode::Both);
        assert!("shake".parse::<TriggerMode>().is_err());
    }

    #[test]
    fn test_trigger_mode_inputs() {
        assert!(TriggerMode::Gesture.uses_gesture());
        assert!(!TriggerMode::Gesture.uses_button());
        assert!(!TriggerMode::Button.uses_gesture());
        assert!(TriggerMode::Both.uses_gesture() && TriggerMode::Both.uses_button());
    }

    #[test]
    fn test_trigger_mode_display_round_trips() {
        for mode in [TriggerMode::Gesture, TriggerMode::Button, TriggerMode::Both] {
            assert_eq!(mode.to_string().parse::<TriggerMode>().unwrap(), mode);
        }
    }
}

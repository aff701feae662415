//! Shared test utilities
//!
//! Fakes for the sampler's collaborators. Everything runs on the test's
//! single-threaded runtime, so shared state uses `Rc<RefCell<_>>`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use chanchito::button::ButtonInput;
use chanchito::{
    Action, Error, FaceStatus, GestureConfig, GyroReading, GyroSource, Result, Sample,
    StatusSink, Trigger,
};
use tokio::sync::oneshot;

/// Calibration used throughout the tests: 250 / 30 / 3 s, no cooldown
#[must_use]
pub fn test_config() -> GestureConfig {
    GestureConfig::new(250.0, 30.0, Duration::from_secs(3), Duration::ZERO)
        .expect("valid test config")
}

/// Samples from `(seconds, magnitude)` pairs
#[must_use]
pub fn samples(points: &[(f64, f64)]) -> Vec<Sample> {
    points.iter().map(|&(t, m)| Sample::at_secs(t, m)).collect()
}

/// Gyro reading whose magnitude is `m` (all rotation on X)
#[must_use]
pub fn reading(m: f64) -> GyroReading {
    GyroReading::new(m, 0.0, 0.0)
}

/// Plays back a script of readings, then reports stillness
pub struct ScriptedGyro {
    script: VecDeque<Result<GyroReading>>,
    reads: Rc<RefCell<usize>>,
}

impl ScriptedGyro {
    /// Script from magnitudes
    #[must_use]
    pub fn magnitudes(values: &[f64]) -> Self {
        Self::new(values.iter().map(|&m| Ok(reading(m))).collect())
    }

    /// Script from explicit results
    #[must_use]
    pub fn new(script: Vec<Result<GyroReading>>) -> Self {
        Self {
            script: script.into(),
            reads: Rc::default(),
        }
    }

    /// Shared read counter
    #[must_use]
    pub fn reads(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.reads)
    }
}

impl GyroSource for ScriptedGyro {
    fn read_gyro(&mut self) -> Result<GyroReading> {
        *self.reads.borrow_mut() += 1;
        self.script.pop_front().unwrap_or_else(|| Ok(reading(0.0)))
    }
}

/// A failed sensor read
#[must_use]
pub fn read_error() -> Result<GyroReading> {
    Err(Error::Sensor("bus timeout".to_string()))
}

/// Button that replays pin levels, then stays released
pub struct ScriptedButton {
    levels: VecDeque<bool>,
}

impl ScriptedButton {
    #[must_use]
    pub fn new(levels: &[bool]) -> Self {
        Self {
            levels: levels.iter().copied().collect(),
        }
    }
}

impl ButtonInput for ScriptedButton {
    fn is_pressed(&mut self) -> Result<bool> {
        Ok(self.levels.pop_front().unwrap_or(false))
    }
}

/// Face that remembers every status it was sent
#[derive(Clone, Default)]
pub struct RecordingFace {
    statuses: Rc<RefCell<Vec<FaceStatus>>>,
}

impl RecordingFace {
    #[must_use]
    pub fn statuses(&self) -> Vec<FaceStatus> {
        self.statuses.borrow().clone()
    }
}

impl StatusSink for RecordingFace {
    fn send(&mut self, status: FaceStatus) -> Result<()> {
        self.statuses.borrow_mut().push(status);
        Ok(())
    }
}

/// Action that records triggers and requests shutdown after the first
pub struct RecordingAction {
    triggers: Rc<RefCell<Vec<Trigger>>>,
    stop: RefCell<Option<oneshot::Sender<()>>>,
    fail: bool,
}

impl RecordingAction {
    /// Action plus the shutdown future it resolves
    pub fn new() -> (Self, impl std::future::Future<Output = ()>) {
        let (tx, rx) = oneshot::channel();
        let action = Self {
            triggers: Rc::default(),
            stop: RefCell::new(Some(tx)),
            fail: false,
        };
        (action, async move {
            let _ = rx.await;
        })
    }

    /// Make every run return an error
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Don't request shutdown; the test supplies its own
    #[must_use]
    pub fn without_stop(self) -> Self {
        self.stop.borrow_mut().take();
        self
    }

    #[must_use]
    pub fn triggers(&self) -> Rc<RefCell<Vec<Trigger>>> {
        Rc::clone(&self.triggers)
    }
}

#[async_trait(?Send)]
impl Action for RecordingAction {
    async fn run(&self, trigger: &Trigger) -> Result<()> {
        self.triggers.borrow_mut().push(*trigger);
        if let Some(tx) = self.stop.borrow_mut().take() {
            let _ = tx.send(());
        }
        if self.fail {
            return Err(Error::Backend("backend down".to_string()));
        }
        Ok(())
    }
}

/// Action that never finishes, like a request to a stalled server
#[derive(Default)]
pub struct HangingAction {
    started: Rc<RefCell<usize>>,
}

impl HangingAction {
    /// Shared count of runs started
    #[must_use]
    pub fn started(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.started)
    }
}

#[async_trait(?Send)]
impl Action for HangingAction {
    async fn run(&self, _trigger: &Trigger) -> Result<()> {
        *self.started.borrow_mut() += 1;
        std::future::pending().await
    }
}

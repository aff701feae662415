//! What happens when the piggy bank is triggered
//!
//! The sampler hands every trigger to an [`Action`]. The production action
//! looks up the child's latest movement, has it narrated and speaks it.

pub mod finance;
pub mod narrator;

use std::time::Duration;

use async_trait::async_trait;

pub use finance::FinanceClient;
pub use narrator::Narrator;

use crate::Result;
use crate::gesture::MatchEvent;
use crate::voice::Speaker;

/// Why the action is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Double-shake gesture completed
    Gesture(MatchEvent),
    /// Push button pressed
    Button {
        /// Time since the sampler started
        at: Duration,
    },
}

impl Trigger {
    /// When the trigger fired, relative to the sampler start
    #[must_use]
    pub const fn at(&self) -> Duration {
        match self {
            Self::Gesture(event) => event.completed_at,
            Self::Button { at } => *at,
        }
    }

    /// Short label for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Gesture(_) => "gesture",
            Self::Button { .. } => "button",
        }
    }
}

/// Downstream work started by a trigger
///
/// Runs on the sampling task; sampling is paused until it returns.
#[async_trait(?Send)]
pub trait Action {
    /// Handle one trigger
    ///
    /// # Errors
    ///
    /// Returns error if the action could not be completed
    async fn run(&self, trigger: &Trigger) -> Result<()>;
}

#[async_trait(?Send)]
impl<T: Action + ?Sized> Action for Box<T> {
    async fn run(&self, trigger: &Trigger) -> Result<()> {
        (**self).run(trigger).await
    }
}

/// Logs triggers without touching the network or the speaker
#[derive(Debug, Default)]
pub struct LogAction;

#[async_trait(?Send)]
impl Action for LogAction {
    async fn run(&self, trigger: &Trigger) -> Result<()> {
        match trigger {
            Trigger::Gesture(event) => tracing::info!(
                at_ms = event.completed_at.as_millis(),
                duration_ms = event.duration().as_millis(),
                "gesture trigger (dry run)"
            ),
            Trigger::Button { at } => {
                tracing::info!(at_ms = at.as_millis(), "button trigger (dry run)");
            }
        }
        Ok(())
    }
}

/// Speaks the child's latest movement
pub struct BalanceAnnouncer {
    finance: FinanceClient,
    narrator: Narrator,
    speaker: Box<dyn Speaker>,
}

impl BalanceAnnouncer {
    /// Assemble the announcer
    #[must_use]
    pub fn new(finance: FinanceClient, narrator: Narrator, speaker: Box<dyn Speaker>) -> Self {
        Self {
            finance,
            narrator,
            speaker,
        }
    }
}

#[async_trait(?Send)]
impl Action for BalanceAnnouncer {
    async fn run(&self, trigger: &Trigger) -> Result<()> {
        tracing::info!(trigger = trigger.kind(), "announcing last movement");

        let movement = match self.finance.last_transaction().await {
            Ok(movement) => Some(movement),
            Err(e) => {
                tracing::warn!(error = %e, "finance backend unavailable");
                None
            }
        };

        let phrase = self.narrator.narrate(movement.as_ref()).await;
        tracing::info!(%phrase, "chanchito says");

        self.speaker.speak(&phrase).await
    }
}

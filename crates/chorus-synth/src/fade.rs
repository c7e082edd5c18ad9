//! Block-driven fade-in ramp.
//!
//! A fresh voice starts at volume 0; [`FadeIn::run`] raises it to the target
//! in `steps` equal increments spread over `duration`. The ramp runs on its
//! own task and yields between steps, so it never holds anything the rest of
//! the server waits on.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::voice::Voice;

/// Linear volume ramp from silence to `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeIn {
    /// Final volume.
    pub target: f32,
    /// Total ramp time.
    pub duration: Duration,
    /// Number of volume steps (at least 1).
    pub steps: u32,
}

/// Shortest wait between volume steps.
const MIN_STEP: Duration = Duration::from_millis(1);

/// How a ramp ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeOutcome {
    /// The voice reached the target volume.
    Completed,
    /// The token fired first; the voice was left where it was.
    Cancelled,
}

impl FadeIn {
    /// Volume after `step` of `steps`.
    pub fn level_at(&self, step: u32) -> f32 {
        let steps = self.steps.max(1);
        if step >= steps {
            return self.target;
        }
        self.target * step as f32 / steps as f32
    }

    /// Steps actually taken: at most one per millisecond of ramp, at least one.
    pub fn effective_steps(&self) -> u32 {
        let fit = self.duration.as_millis() / MIN_STEP.as_millis();
        u32::try_from(fit)
            .unwrap_or(u32::MAX)
            .clamp(1, self.steps.max(1))
    }

    /// Drive `voice` up to the target, stopping early when `cancel` fires.
    pub async fn run(self, voice: Arc<dyn Voice>, cancel: CancellationToken) -> FadeOutcome {
        if self.duration.is_zero() {
            voice.set_volume(self.target);
            return FadeOutcome::Completed;
        }
        let ramp = Self {
            steps: self.effective_steps(),
            ..self
        };

        let mut ticker = time::interval(ramp.duration / ramp.steps);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for step in 0..=ramp.steps {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return FadeOutcome::Cancelled,
                _ = ticker.tick() => voice.set_volume(ramp.level_at(step)),
            }
        }
        FadeOutcome::Completed
    }
}

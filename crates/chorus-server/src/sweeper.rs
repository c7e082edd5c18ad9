//! Periodic removal of expired sounds.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::SOUNDS_EXPIRED_TOTAL;
use crate::registry::SessionRegistry;

/// Background task that drops sounds once their end time passes.
pub struct Sweeper {
    registry: Arc<SessionRegistry>,
    period: Duration,
}

impl Sweeper {
    /// Sweep `registry` every `period`.
    pub fn new(registry: Arc<SessionRegistry>, period: Duration) -> Self {
        Self {
            registry,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// One pass at the current time. Returns how many sounds were removed.
    pub fn run_once(&self) -> usize {
        let removed = self.registry.sweep_expired(Instant::now());
        if removed > 0 {
            info!(removed, "expired sounds swept");
            counter!(SOUNDS_EXPIRED_TOTAL).increment(removed as u64);
        }
        removed
    }

    /// Run until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(period_ms = self.period.as_millis(), "sweeper started");

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let _ = self.run_once();
                    }
                }
            }
            debug!("sweeper stopped");
        })
    }
}

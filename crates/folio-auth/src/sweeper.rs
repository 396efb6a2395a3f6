//! Background eviction of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::authenticator::Authenticator;

/// Spawn a task that calls [`Authenticator::sweep_expired`] every `interval`
/// until `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_sweeper(
    auth: Arc<Authenticator>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        info!(interval_ms = period.as_millis() as u64, "session sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = auth.sweep_expired();
                    debug!(evicted, remaining = auth.sessions().len(), "sweep finished");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("session sweeper stopped");
    })
}

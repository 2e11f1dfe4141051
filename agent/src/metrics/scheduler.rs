//! Periodic reporting driver

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::reporter::{CycleOutcome, ElasticsearchReporter};

/// Run `reporter` once per `interval` until shutdown is signalled.
///
/// The first report happens one interval after start. A cycle that overruns
/// its slot causes the missed ticks to be skipped, never queued. Cycle errors
/// are logged and the next tick runs as usual.
pub fn spawn_reporter(
    reporter: Arc<ElasticsearchReporter>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        tracing::debug!(interval_secs = interval.as_secs(), "Metrics reporter started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match reporter.run_cycle().await {
                        Ok(CycleOutcome::Sent { status }) => {
                            tracing::trace!(status = %status, "Metric report sent");
                        }
                        Ok(outcome) => tracing::trace!(?outcome, "Metric report cycle finished"),
                        Err(e) => tracing::warn!(error = %e, "Metric report failed"),
                    }
                }
            }
        }
        tracing::debug!("Metrics reporter shutdown complete");
    })
}

//! Metrics store availability

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::settings::ReporterSettings;
use crate::core::constants::HEALTH_CHECK_TIMEOUT_SECS;

/// Answers whether the metrics store is worth a network attempt right now
pub trait AvailabilityGate: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Last known reachability of the metrics store.
///
/// Starts out unavailable until a check succeeds or the host marks it.
#[derive(Debug, Default)]
pub struct StoreHealth {
    available: AtomicBool,
}

impl StoreHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state and log transitions only
    pub fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::AcqRel);
        if previous != available {
            if available {
                tracing::info!("Metrics store is available");
            } else {
                tracing::warn!("Metrics store is not available, metric reports are dropped");
            }
        }
    }

    /// Request `base_url` and record the result
    pub async fn check(&self, client: &reqwest::Client, base_url: &str) -> bool {
        let available = if base_url.is_empty() {
            false
        } else {
            match client
                .get(base_url)
                .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
                .send()
                .await
            {
                Ok(resp) => {
                    let ok = resp.status().is_success();
                    if !ok {
                        tracing::debug!(status = %resp.status(), "Metrics store health check failed");
                    }
                    ok
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Metrics store health check failed");
                    false
                }
            }
        };
        self.set_available(available);
        available
    }

    /// Check the configured store URL now and then once per `interval`.
    ///
    /// The URL is read from `settings` before every check, so a reloaded
    /// store URL is picked up on the next tick.
    pub fn start_check_task(
        self: Arc<Self>,
        client: reqwest::Client,
        settings: Arc<dyn ReporterSettings>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    // First tick completes immediately
                    _ = ticker.tick() => {
                        self.check(&client, &settings.store_url()).await;
                    }
                }
            }
            tracing::debug!("Store health task shutdown complete");
        })
    }
}

impl AvailabilityGate for StoreHealth {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}

//! Background Expiry Sweeper
//!
//! Lazy expiry (the check GET performs) only reclaims keys that are read
//! again. A key that expires and is never touched would sit in memory
//! forever, so a background task periodically retires every mark whose
//! deadline has passed, together with the entry it covers.
//!
//! Centralizing eager expiry in one sweep also keeps it honest: the sweep
//! re-reads the mark table under the store lock on every pass, so a key
//! that was re-set without a TTL (which clears its mark) is never deleted
//! by a deadline that no longer applies. There are no per-write timers and
//! nothing to cancel.
//!
//! ## Pacing
//!
//! The sweeper sleeps between passes and adapts: when a large fraction of
//! the installed marks come due in one pass it tightens the interval, and
//! when passes keep finding nothing it backs off.

use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Pacing configuration for the sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Interval the sweeper starts out with
    pub base_interval: Duration,

    /// Floor for the adaptive interval
    pub min_interval: Duration,

    /// Ceiling for the adaptive interval
    pub max_interval: Duration,

    /// Tighten the interval when this fraction of marks came due
    pub speedup_threshold: f64,

    /// Back off when fewer than this fraction of marks came due
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

/// Handle to the running sweeper task. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper over the given store.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use linekv::storage::{Store, ExpirySweeper, ExpiryConfig};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(Store::new());
    /// let sweeper = ExpirySweeper::start(Arc::clone(&store), ExpiryConfig::default());
    /// // runs until dropped
    /// drop(sweeper);
    /// ```
    pub fn start(store: Arc<Store>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Signals the sweeper task to exit. Called automatically on drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("Background expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    store: Arc<Store>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let marks_before = store.mark_count();
        let removed = store.sweep_expired();

        if marks_before > 0 {
            let due_rate = removed as f64 / marks_before as f64;

            if due_rate > config.speedup_threshold {
                current_interval = (current_interval / 2).max(config.min_interval);
                debug!(
                    removed = removed,
                    rate = %format!("{:.2}%", due_rate * 100.0),
                    new_interval_ms = current_interval.as_millis(),
                    "Many marks due, tightening sweep interval"
                );
            } else if due_rate < config.slowdown_threshold && removed == 0 {
                current_interval = (current_interval * 2).min(config.max_interval);
                trace!(
                    new_interval_ms = current_interval.as_millis(),
                    "Quiet pass, backing off sweep interval"
                );
            }
        }

        if removed > 0 {
            debug!(
                removed = removed,
                keys_remaining = store.len(),
                "Expired entries swept"
            );
        }
    }
}

/// Starts the sweeper with default pacing.
pub fn start_expiry_sweeper(store: Arc<Store>) -> ExpirySweeper {
    ExpirySweeper::start(store, ExpiryConfig::default())
}

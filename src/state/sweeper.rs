use crate::state::{EntityStateStore, EvictionPolicy};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Apply the store's eviction policy every `interval_seconds` until shutdown.
///
/// Returns immediately when the policy is `Never`.
pub async fn run_eviction_sweeper(
    store: Arc<EntityStateStore>,
    interval_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    if store.eviction_policy() == EvictionPolicy::Never || interval_seconds == 0 {
        return;
    }

    info!(
        interval_seconds = interval_seconds,
        policy = ?store.eviction_policy(),
        "Starting idle entity sweeper"
    );

    let mut ticker = interval(Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.evict_idle(Instant::now());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

use crate::engine::DecisionEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Periodically log a metrics summary until shutdown is signalled
pub async fn run_metrics_reporter(
    engine: Arc<DecisionEngine>,
    interval_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    if interval_seconds == 0 {
        return;
    }

    let mut ticker = interval(Duration::from_secs(interval_seconds));

    // Skip missed ticks to prevent backlog under load
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let m = engine.metrics_snapshot();
                info!(
                    entities = m.entity_count,
                    readings = m.readings,
                    outliers = m.outliers,
                    admitted = m.admitted,
                    commands = m.commands,
                    decode_failures = m.decode_failures,
                    publish_failures = m.publish_failures,
                    "Engine metrics"
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

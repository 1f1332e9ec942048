use anyhow::{Context, Result};
use heatgate::config::HeatgateConfig;
use heatgate::engine::{run_metrics_reporter, DecisionEngine};
use heatgate::ingress;
use heatgate::nats::{CommandPublisher, NatsClient};
use heatgate::state::run_eviction_sweeper;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heatgate=info".into()),
        )
        .init();

    info!("Heatgate starting...");

    let config = HeatgateConfig::load().context("Failed to load configuration")?;
    let engine = Arc::new(DecisionEngine::from_config(&config)?);

    info!(
        threshold = engine.threshold(),
        window_capacity = engine.window_capacity(),
        outlier_z_threshold = engine.outlier_z_threshold(),
        eviction = ?engine.store().eviction_policy(),
        "Decision engine configured"
    );

    // The service does not run without a transport
    let nats = NatsClient::connect(config.nats.clone()).await?;
    let publisher = Arc::new(CommandPublisher::new(nats.client().clone()));
    let readings = nats.subscribe_readings().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(run_metrics_reporter(
        Arc::clone(&engine),
        config.metrics.log_interval_seconds,
        shutdown_rx.clone(),
    ));
    tokio::spawn(run_eviction_sweeper(
        Arc::clone(engine.store()),
        config.store.sweep_interval_seconds,
        shutdown_rx.clone(),
    ));

    let mut ingress_task = tokio::spawn(ingress::run(
        Arc::clone(&engine),
        publisher,
        readings,
        shutdown_rx,
    ));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested, finishing current message");
            let _ = shutdown_tx.send(true);
            (&mut ingress_task).await.context("Ingress task failed")?;
        }
        result = &mut ingress_task => {
            result.context("Ingress task failed")?;
            let _ = shutdown_tx.send(true);
        }
    }

    if let Err(e) = nats.flush().await {
        error!(error = %e, "Failed to flush pending commands");
    }

    let m = engine.metrics_snapshot();
    info!(
        entities = m.entity_count,
        readings = m.readings,
        outliers = m.outliers,
        commands = m.commands,
        decode_failures = m.decode_failures,
        publish_failures = m.publish_failures,
        "Heatgate stopped"
    );

    Ok(())
}

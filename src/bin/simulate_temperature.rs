// Synthetic temperature meters: publish one random reading per entity per second

use anyhow::{Context, Result};
use heatgate::config::HeatgateConfig;
use heatgate::nats::NatsClient;
use heatgate::wire::{self, Reading};
use rand::Rng;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

const DEFAULT_ENTITIES: &str = "user1,user2,user3";
const MIN_TEMPERATURE: f64 = 10.0;
const MAX_TEMPERATURE: f64 = 30.0;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simulate_temperature=info,heatgate=info".into()),
        )
        .init();

    let mut config = HeatgateConfig::default();
    config
        .apply_overrides(|var| std::env::var(var).ok())
        .context("Invalid environment")?;

    let entities: Vec<String> = std::env::var("HEATGATE_SIM_ENTITIES")
        .unwrap_or_else(|_| DEFAULT_ENTITIES.to_string())
        .split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| wire::is_valid_entity_id(id))
        .collect();
    anyhow::ensure!(!entities.is_empty(), "HEATGATE_SIM_ENTITIES has no valid entity ids");

    let client = NatsClient::connect(config.nats.clone()).await?;
    info!(entities = ?entities, "Simulating temperature meters");

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        for entity_id in &entities {
            let reading = Reading {
                entity_id: entity_id.clone(),
                value: rand::thread_rng().gen_range(MIN_TEMPERATURE..MAX_TEMPERATURE),
            };
            let (topic, payload) = wire::encode_reading(&reading);
            match client.publish(&topic, payload).await {
                Ok(()) => info!(topic = %topic, temperature = reading.value, "Published reading"),
                Err(e) => error!(topic = %topic, error = %e, "Failed to publish reading"),
            }
        }
    }

    client.flush().await?;
    info!("Temperature simulator stopped");
    Ok(())
}

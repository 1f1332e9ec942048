// Mock heating systems: log every actuator command received

use anyhow::{Context, Result};
use futures::StreamExt;
use heatgate::config::HeatgateConfig;
use heatgate::nats::NatsClient;
use heatgate::wire;
use heatgate::Action;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simulate_heating=info,heatgate=info".into()),
        )
        .init();

    let mut config = HeatgateConfig::default();
    config
        .apply_overrides(|var| std::env::var(var).ok())
        .context("Invalid environment")?;

    let client = NatsClient::connect(config.nats.clone()).await?;
    let mut commands = client.subscribe_commands().await?;
    info!("Heating system simulator listening for commands");

    loop {
        let message = tokio::select! {
            next = commands.next() => match next {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        match wire::decode_command(&message.topic, &message.payload) {
            Ok(command) => {
                let state = match command.action {
                    Action::TurnOn => "on",
                    Action::TurnOff => "off",
                };
                info!("Heating system for {} turned {}", command.entity_id, state);
            }
            Err(e) => warn!(topic = %message.topic, error = %e, "Ignoring malformed command"),
        }
    }

    info!("Heating system simulator stopped");
    Ok(())
}

use crate::control::Command;
use crate::egress::CommandSink;
use crate::nats::subjects::topic_to_subject;
use crate::wire;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Publishes actuator commands to NATS (core publish, no acknowledgement)
#[derive(Clone)]
pub struct CommandPublisher {
    client: async_nats::Client,
}

impl CommandPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommandSink for CommandPublisher {
    /// Subject format: heating_system.{entity_id}.control
    /// Payload: {"action": "turn_on" | "turn_off"}
    async fn send(&self, command: &Command) -> Result<()> {
        let (topic, payload) = wire::encode_command(command);
        let subject = topic_to_subject(&topic);

        debug!(
            entity_id = %command.entity_id,
            subject = %subject,
            "Publishing command to NATS"
        );

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish command to subject '{}'", subject))
    }
}

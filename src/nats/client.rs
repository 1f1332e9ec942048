use crate::ingress::InboundMessage;
use crate::nats::subjects::{subject_to_topic, topic_to_subject};
use crate::wire::{COMMAND_TOPIC_LEAF, COMMAND_TOPIC_ROOT, READING_TOPIC_ROOT};
use anyhow::{Context, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use tracing::info;

/// NATS configuration
#[derive(Clone, Debug, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection name reported to the server
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    4222
}

fn default_client_name() -> String {
    "heatgate".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_name: default_client_name(),
        }
    }
}

impl NatsConfig {
    pub fn url(&self) -> String {
        format!("nats://{}:{}", self.host, self.port)
    }
}

/// Connected NATS client
pub struct NatsClient {
    client: async_nats::Client,
    config: NatsConfig,
}

impl NatsClient {
    /// Connect to NATS. Failure here is fatal for the caller.
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let url = config.url();
        info!("Connecting to NATS at {}", url);

        let client = async_nats::ConnectOptions::new()
            .name(&config.client_name)
            .connect(&url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?;

        info!("Connected to NATS");
        Ok(Self { client, config })
    }

    /// Subscribe to a slash-separated topic filter (`+` matches one level)
    /// and yield messages with slash-separated topics
    pub async fn subscribe_topics(&self, filter: &str) -> Result<BoxStream<'static, InboundMessage>> {
        let subject = topic_to_subject(filter);
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to '{}'", subject))?;

        info!(subject = %subject, "Subscribed");

        Ok(subscriber
            .map(|msg| InboundMessage {
                topic: subject_to_topic(msg.subject.as_str()),
                payload: msg.payload.to_vec(),
            })
            .boxed())
    }

    /// All sensor readings: `temperature_meter/+`
    pub async fn subscribe_readings(&self) -> Result<BoxStream<'static, InboundMessage>> {
        self.subscribe_topics(&format!("{}/+", READING_TOPIC_ROOT))
            .await
    }

    /// All actuator commands: `heating_system/+/control`
    pub async fn subscribe_commands(&self) -> Result<BoxStream<'static, InboundMessage>> {
        self.subscribe_topics(&format!("{}/+/{}", COMMAND_TOPIC_ROOT, COMMAND_TOPIC_LEAF))
            .await
    }

    /// Publish a raw payload on a slash-separated topic
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let subject = topic_to_subject(topic);
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to subject '{}'", subject))
    }

    /// Flush buffered publishes to the server
    pub async fn flush(&self) -> Result<()> {
        self.client.flush().await.context("Failed to flush NATS client")
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Get underlying NATS client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }
}

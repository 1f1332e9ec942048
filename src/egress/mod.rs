// Egress adapter: delivery of actuator commands

use crate::control::Command;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Destination for actuator commands.
///
/// Delivery is best effort and at most once: a failed send is reported to
/// the caller and never retried, and the entity's actuator state already
/// reflects the command.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, command: &Command) -> Result<()>;
}

/// In-process sink forwarding commands over a channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Command>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl CommandSink for ChannelSink {
    async fn send(&self, command: &Command) -> Result<()> {
        self.tx
            .send(command.clone())
            .map_err(|_| anyhow::anyhow!("command receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Action;

    #[tokio::test]
    async fn test_channel_sink_forwards_commands() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.send(&Command::new("u1", Action::TurnOn)).await.unwrap();

        assert_eq!(rx.recv().await, Some(Command::new("u1", Action::TurnOn)));
    }

    #[tokio::test]
    async fn test_channel_sink_fails_when_receiver_dropped() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);

        assert!(sink.send(&Command::new("u1", Action::TurnOff)).await.is_err());
    }
}

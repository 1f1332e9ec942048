// Ingress adapter: decode inbound readings and drive the decision engine

use crate::control::Command;
use crate::egress::CommandSink;
use crate::engine::{Admission, DecisionEngine};
use crate::wire::{self, DecodeError};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

/// Transport-neutral inbound message
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    /// Slash-separated topic, e.g. `temperature_meter/user1`
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Decode one message, run it through the engine and publish any resulting command.
///
/// Decode failures are logged, counted and returned; the engine is not
/// touched. Publish failures are logged and counted only: the state
/// transition stands either way.
///
/// The command is sent after the entity lock taken by `admit` is released.
/// Commands for one entity therefore reach the sink in transition order
/// only while that entity's messages are dispatched one at a time, as
/// [`run`] does. Concurrent dispatchers must partition by entity id.
pub async fn dispatch<S>(
    engine: &DecisionEngine,
    sink: &S,
    message: &InboundMessage,
) -> Result<Admission, DecodeError>
where
    S: CommandSink + ?Sized,
{
    let reading = match wire::decode_reading(&message.topic, &message.payload) {
        Ok(reading) => reading,
        Err(e) => {
            engine.metrics().record_decode_failure();
            match wire::parse_reading_topic(&message.topic) {
                Ok(entity_id) => {
                    error!(entity_id = %entity_id, error = %e, "Failed to decode reading, dropping")
                }
                Err(_) => {
                    error!(topic = %message.topic, error = %e, "Failed to decode reading, dropping")
                }
            }
            return Err(e);
        }
    };

    let admission = engine.admit(&reading.entity_id, reading.value);

    if let Some(action) = admission.action() {
        let command = Command::new(reading.entity_id, action);
        match sink.send(&command).await {
            Ok(()) => info!(
                entity_id = %command.entity_id,
                action = %command.action,
                "Sent actuator command"
            ),
            Err(e) => {
                engine.metrics().record_publish_failure();
                error!(
                    entity_id = %command.entity_id,
                    action = %command.action,
                    error = %e,
                    "Failed to publish actuator command"
                );
            }
        }
    }

    Ok(admission)
}

/// Consume messages until the stream ends or shutdown is signalled.
///
/// Shutdown is checked between messages only, so a message that has been
/// taken off the stream is always fully processed. Returns the number of
/// messages handled.
pub async fn run<St, S>(
    engine: Arc<DecisionEngine>,
    sink: Arc<S>,
    mut messages: St,
    mut shutdown: watch::Receiver<bool>,
) -> u64
where
    St: Stream<Item = InboundMessage> + Unpin,
    S: CommandSink + ?Sized,
{
    info!("Ingress loop started");
    let mut handled = 0u64;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                // Sender dropped counts as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            next = messages.next() => {
                let Some(message) = next else {
                    warn!("Reading stream ended");
                    break;
                };
                // Errors are already logged and counted
                let _ = dispatch(engine.as_ref(), sink.as_ref(), &message).await;
                handled += 1;
            }
        }
    }

    info!(handled = handled, "Ingress loop stopped");
    handled
}

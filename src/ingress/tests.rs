use super::*;
use crate::control::{Action, ActuatorState};
use crate::egress::ChannelSink;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

/// Sink whose transport is always down
struct FailingSink;

#[async_trait]
impl CommandSink for FailingSink {
    async fn send(&self, _command: &Command) -> Result<()> {
        anyhow::bail!("transport unavailable")
    }
}

fn reading(entity_id: &str, value: f64) -> InboundMessage {
    InboundMessage::new(
        format!("temperature_meter/{}", entity_id),
        json!({ "temperature": value }).to_string(),
    )
}

#[tokio::test]
async fn test_dispatch_publishes_on_transition() {
    let engine = DecisionEngine::new(22.0, 3, 3.0);
    let (sink, mut rx) = ChannelSink::channel();

    for _ in 0..2 {
        let admission = dispatch(&engine, &sink, &reading("u1", 20.0)).await.unwrap();
        assert!(matches!(admission, Admission::WarmingUp { .. }));
    }
    assert!(rx.try_recv().is_err());

    let admission = dispatch(&engine, &sink, &reading("u1", 20.0)).await.unwrap();
    assert_eq!(admission.action(), Some(Action::TurnOn));
    assert_eq!(rx.try_recv().unwrap(), Command::new("u1", Action::TurnOn));
}

#[tokio::test]
async fn test_dispatch_drops_invalid_json() {
    let engine = DecisionEngine::new(22.0, 3, 3.0);
    let (sink, mut rx) = ChannelSink::channel();

    let message = InboundMessage::new("temperature_meter/u2", "not valid json");
    let err = dispatch(&engine, &sink, &message).await.unwrap_err();

    assert!(matches!(err, DecodeError::InvalidJson(_)));
    assert!(!engine.store().contains("u2"));
    assert!(rx.try_recv().is_err());
    assert_eq!(engine.metrics_snapshot().decode_failures, 1);
    assert_eq!(engine.metrics_snapshot().readings, 0);
}

#[tokio::test]
async fn test_dispatch_drops_unexpected_topic() {
    let engine = DecisionEngine::new(22.0, 3, 3.0);
    let (sink, _rx) = ChannelSink::channel();

    let message = InboundMessage::new("humidity_meter/u3", r#"{"temperature": 20.0}"#);
    let err = dispatch(&engine, &sink, &message).await.unwrap_err();

    assert_eq!(err, DecodeError::UnexpectedTopic("humidity_meter/u3".to_string()));
    assert!(engine.store().is_empty());
}

#[tokio::test]
async fn test_publish_failure_keeps_state_transition() {
    let engine = DecisionEngine::new(22.0, 2, 3.0);
    let sink = FailingSink;

    dispatch(&engine, &sink, &reading("u1", 20.0)).await.unwrap();
    let admission = dispatch(&engine, &sink, &reading("u1", 20.0)).await.unwrap();

    assert_eq!(admission.action(), Some(Action::TurnOn));
    assert_eq!(engine.store().snapshot("u1").unwrap().actuator, ActuatorState::On);
    assert_eq!(engine.metrics_snapshot().publish_failures, 1);

    // Still ON: the same command is not retried
    let admission = dispatch(&engine, &sink, &reading("u1", 20.0)).await.unwrap();
    assert_eq!(admission.action(), None);
    assert_eq!(engine.metrics_snapshot().publish_failures, 1);
}

#[tokio::test]
async fn test_run_survives_bad_messages() {
    let engine = Arc::new(DecisionEngine::new(22.0, 2, 3.0));
    let (sink, mut rx) = ChannelSink::channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let messages = futures::stream::iter(vec![
        reading("u1", 20.0),
        InboundMessage::new("temperature_meter/u1", "{"),
        InboundMessage::new("temperature_meter/u1/extra", r#"{"temperature": 1.0}"#),
        InboundMessage::new("temperature_meter/u1", r#"{"temperature": "hot"}"#),
        reading("u1", 20.0),
    ]);

    let handled = run(Arc::clone(&engine), Arc::new(sink), messages, shutdown_rx).await;

    assert_eq!(handled, 5);
    assert_eq!(rx.try_recv().unwrap(), Command::new("u1", Action::TurnOn));
    assert_eq!(engine.metrics_snapshot().decode_failures, 3);
}

#[tokio::test]
async fn test_run_sends_commands_in_transition_order() {
    let engine = Arc::new(DecisionEngine::new(22.0, 2, 3.0));
    let (sink, mut rx) = ChannelSink::channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Means: 20 (on), 22 (off), 24, 22, 19 (on)
    let messages = futures::stream::iter(
        [20.0, 20.0, 24.0, 24.0, 20.0, 18.0]
            .iter()
            .map(|&v| reading("u1", v))
            .collect::<Vec<_>>(),
    );

    run(Arc::clone(&engine), Arc::new(sink), messages, shutdown_rx).await;

    let mut actions = vec![];
    while let Ok(command) = rx.try_recv() {
        actions.push(command.action);
    }
    assert_eq!(actions, vec![Action::TurnOn, Action::TurnOff, Action::TurnOn]);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let engine = Arc::new(DecisionEngine::new(22.0, 2, 3.0));
    let (sink, _rx) = ChannelSink::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (msg_tx, msg_rx) = tokio::sync::mpsc::unbounded_channel::<InboundMessage>();
    let messages = channel_stream(msg_rx);

    let task = tokio::spawn(run(Arc::clone(&engine), Arc::new(sink), messages, shutdown_rx));

    msg_tx.send(reading("u1", 20.0)).unwrap();
    // Wait until the reading is committed before stopping
    while engine.metrics_snapshot().readings < 1 {
        tokio::task::yield_now().await;
    }
    shutdown_tx.send(true).unwrap();

    let handled = task.await.unwrap();
    assert_eq!(handled, 1);
    assert_eq!(engine.store().snapshot("u1").unwrap().samples, vec![20.0]);
}

#[tokio::test]
async fn test_run_returns_immediately_when_already_shut_down() {
    let engine = Arc::new(DecisionEngine::new(22.0, 2, 3.0));
    let (sink, _rx) = ChannelSink::channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(true);

    let messages = futures::stream::pending::<InboundMessage>();
    let handled = run(engine, Arc::new(sink), messages, shutdown_rx).await;
    assert_eq!(handled, 0);
}

/// Adapt an mpsc receiver into a stream
fn channel_stream(
    rx: tokio::sync::mpsc::UnboundedReceiver<InboundMessage>,
) -> impl Stream<Item = InboundMessage> + Unpin {
    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|msg| (msg, rx))
    }))
}

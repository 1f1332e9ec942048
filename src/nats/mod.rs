// NATS transport binding

mod client;
mod publisher;
mod subjects;

pub use client::{NatsClient, NatsConfig};
pub use publisher::CommandPublisher;
pub use subjects::{subject_to_topic, topic_to_subject};

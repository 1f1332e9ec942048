// Rolling statistics window
pub mod window;

// Z-score outlier filter
pub mod outlier;

// Hysteresis controller and command types
pub mod control;

// Entity state store
pub mod state;

// Decision engine (admission pipeline)
pub mod engine;

// Configuration
pub mod config;

// Wire schema for readings and commands
pub mod wire;

// Ingress and egress adapters
pub mod ingress;
pub mod egress;

// NATS transport binding
pub mod nats;

pub use control::{Action, ActuatorState, Command};
pub use engine::{Admission, DecisionEngine};

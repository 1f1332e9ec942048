// Entity state store: per-entity rolling window and actuator state

mod entity;
mod store;
mod sweeper;

pub use entity::{EntitySnapshot, EntityState};
pub use store::{lock_entity, EntityStateStore, EvictionPolicy, SharedEntity};
pub use sweeper::run_eviction_sweeper;

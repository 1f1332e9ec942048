use crate::control::ActuatorState;
use crate::window::RollingWindow;
use std::time::Instant;

/// Per-entity decision state: one rolling window and one actuator state
#[derive(Clone, Debug)]
pub struct EntityState {
    /// Recent admitted samples
    pub window: RollingWindow,

    /// Current actuator state (mutated only by the hysteresis controller)
    pub actuator: ActuatorState,

    /// When the entity last received a reading (used by idle eviction)
    pub last_seen: Instant,
}

impl EntityState {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window: RollingWindow::new(window_capacity),
            actuator: ActuatorState::Off,
            last_seen: Instant::now(),
        }
    }

    /// Record that a reading arrived at `now`
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }
}

/// Point-in-time copy of an entity's state for inspection
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    pub entity_id: String,
    pub samples: Vec<f64>,
    pub actuator: ActuatorState,
}

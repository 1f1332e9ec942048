// Hysteresis controller and actuator command types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Actuator state tracked per entity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorState {
    #[default]
    Off,
    On,
}

/// Command action sent to an actuator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TurnOn,
    TurnOff,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TurnOn => "turn_on",
            Action::TurnOff => "turn_off",
        }
    }

    /// Actuator state after the command is applied
    pub fn target_state(&self) -> ActuatorState {
        match self {
            Action::TurnOn => ActuatorState::On,
            Action::TurnOff => ActuatorState::Off,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command addressed to one entity's actuator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub entity_id: String,
    pub action: Action,
}

impl Command {
    pub fn new(entity_id: impl Into<String>, action: Action) -> Self {
        Self {
            entity_id: entity_id.into(),
            action,
        }
    }
}

/// Edge-triggered OFF/ON state machine.
///
/// OFF -> ON when `avg < threshold`, ON -> OFF when `avg >= threshold`.
/// The threshold is shared by every entity and fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HysteresisController {
    threshold: f64,
}

impl HysteresisController {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluate a new average against the entity's actuator state.
    ///
    /// Updates `state` and returns the action to emit on a transition,
    /// `None` when the state already matches.
    pub fn evaluate(&self, state: &mut ActuatorState, avg: f64) -> Option<Action> {
        let action = match *state {
            ActuatorState::Off if avg < self.threshold => Action::TurnOn,
            ActuatorState::On if avg >= self.threshold => Action::TurnOff,
            _ => return None,
        };
        *state = action.target_state();
        Some(action)
    }
}

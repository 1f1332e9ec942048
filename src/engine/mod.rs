// Decision engine: admission pipeline from reading to actuator command

mod metrics;
mod reporter;

pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use reporter::run_metrics_reporter;

use crate::config::{ConfigError, HeatgateConfig};
use crate::control::{Action, ActuatorState, Command, HysteresisController};
use crate::outlier::OutlierFilter;
use crate::state::{lock_entity, EntityStateStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;


/// Outcome of feeding one reading through the pipeline
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    /// Appended during warm-up; the window is not full yet
    WarmingUp { len: usize, capacity: usize },
    /// Discarded by the outlier filter; window and actuator untouched
    Rejected { z_score: f64 },
    /// Appended to the window and evaluated by the controller
    Admitted {
        mean: f64,
        actuator: ActuatorState,
        action: Option<Action>,
    },
    /// NaN or infinite value; entity state untouched
    NonFinite,
}

impl Admission {
    /// Action to emit, if the reading caused a state transition
    pub fn action(&self) -> Option<Action> {
        match self {
            Admission::Admitted { action, .. } => *action,
            _ => None,
        }
    }
}

/// Per-entity decision engine.
///
/// Owns no transport: callers feed readings in and publish whatever
/// command comes back. Safe to share across workers; each reading locks
/// only its own entity.
pub struct DecisionEngine {
    store: Arc<EntityStateStore>,
    filter: OutlierFilter,
    controller: HysteresisController,
    metrics: EngineMetrics,
}

impl DecisionEngine {
    /// Create an engine with its own store that never evicts
    pub fn new(threshold: f64, window_capacity: usize, outlier_z_threshold: f64) -> Self {
        Self::with_store(
            threshold,
            outlier_z_threshold,
            Arc::new(EntityStateStore::new(window_capacity)),
        )
    }

    /// Create an engine around an injected store; window capacity comes from the store
    pub fn with_store(
        threshold: f64,
        outlier_z_threshold: f64,
        store: Arc<EntityStateStore>,
    ) -> Self {
        Self {
            store,
            filter: OutlierFilter::new(outlier_z_threshold),
            controller: HysteresisController::new(threshold),
            metrics: EngineMetrics::new(),
        }
    }

    /// Build an engine from validated configuration
    pub fn from_config(config: &HeatgateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let threshold = config.control.threshold.ok_or(ConfigError::MissingThreshold)?;
        let store = EntityStateStore::with_policy(
            config.control.window_capacity,
            config.store.eviction_policy(),
        );
        Ok(Self::with_store(
            threshold,
            config.control.outlier_z_threshold,
            Arc::new(store),
        ))
    }

    pub fn threshold(&self) -> f64 {
        self.controller.threshold()
    }

    pub fn window_capacity(&self) -> usize {
        self.store.window_capacity()
    }

    pub fn outlier_z_threshold(&self) -> f64 {
        self.filter.z_threshold()
    }

    pub fn store(&self) -> &Arc<EntityStateStore> {
        &self.store
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.store.len())
    }

    /// Process one reading, returning the command to emit on a state transition
    pub fn handle_reading(&self, entity_id: &str, value: f64) -> Option<Command> {
        self.admit(entity_id, value)
            .action()
            .map(|action| Command::new(entity_id, action))
    }

    /// Process one reading and report what happened to it.
    ///
    /// Warm-up appends are unconditional. The reading that fills the window
    /// is evaluated by the controller straight away. After that, each
    /// candidate is tested against the pre-append window and either
    /// discarded or appended (evicting the oldest sample) and evaluated.
    pub fn admit(&self, entity_id: &str, value: f64) -> Admission {
        self.metrics.record_reading();

        if !value.is_finite() {
            self.metrics.record_non_finite();
            debug!(entity_id = %entity_id, value = value, "Ignoring non-finite reading");
            return Admission::NonFinite;
        }

        let entity = self.store.get_or_create(entity_id);
        let mut state = lock_entity(&entity);
        state.touch(Instant::now());

        if state.window.is_full() {
            if self.filter.is_outlier(&state.window, value) {
                let z_score =
                    OutlierFilter::z_score(&state.window, value).unwrap_or(f64::INFINITY);
                self.metrics.record_outlier();
                debug!(
                    entity_id = %entity_id,
                    value = value,
                    z_score = z_score,
                    "Discarding outlier reading"
                );
                return Admission::Rejected { z_score };
            }
            state.window.append(value);
        } else {
            state.window.append(value);
            self.metrics.record_warm_up();
            if !state.window.is_full() {
                return Admission::WarmingUp {
                    len: state.window.len(),
                    capacity: state.window.capacity(),
                };
            }
            debug!(entity_id = %entity_id, "Warm-up complete");
        }

        self.metrics.record_admitted();
        // The window holds at least `value` here
        let mean = state.window.mean().unwrap_or(value);
        let action = self.controller.evaluate(&mut state.actuator, mean);

        if let Some(action) = action {
            self.metrics.record_command();
            debug!(
                entity_id = %entity_id,
                mean = mean,
                action = %action,
                "Actuator state transition"
            );
        }

        Admission::Admitted {
            mean,
            actuator: state.actuator,
            action,
        }
    }
}

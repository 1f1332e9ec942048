use crate::state::entity::{EntitySnapshot, EntityState};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};
use tracing::info;

/// Shared handle to one entity's state
pub type SharedEntity = Arc<Mutex<EntityState>>;

/// What to do with entities that stop sending readings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep every entity for the lifetime of the store
    #[default]
    Never,
    /// Drop entities whose last reading is older than the given duration
    IdleFor(Duration),
}

/// Entity state store.
///
/// The map itself is sharded (DashMap), so lookups for different ids only
/// contend on a shard briefly. Each entity sits behind its own mutex, giving
/// at most one mutator per entity while distinct entities proceed in parallel.
pub struct EntityStateStore {
    entities: DashMap<String, SharedEntity>,
    window_capacity: usize,
    eviction: EvictionPolicy,
}

impl EntityStateStore {
    /// Create a store that never evicts
    pub fn new(window_capacity: usize) -> Self {
        Self::with_policy(window_capacity, EvictionPolicy::Never)
    }

    pub fn with_policy(window_capacity: usize, eviction: EvictionPolicy) -> Self {
        Self {
            entities: DashMap::new(),
            window_capacity: window_capacity.max(1),
            eviction,
        }
    }

    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction
    }

    /// Get the entity's state, creating an empty window and OFF actuator on first sight
    pub fn get_or_create(&self, entity_id: &str) -> SharedEntity {
        if let Some(existing) = self.entities.get(entity_id) {
            return Arc::clone(existing.value());
        }

        let capacity = self.window_capacity;
        let entry = self
            .entities
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(EntityState::new(capacity))));
        Arc::clone(entry.value())
    }

    /// Get the entity's state without creating it
    pub fn get(&self, entity_id: &str) -> Option<SharedEntity> {
        self.entities.get(entity_id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Copy out an entity's current window and actuator state
    pub fn snapshot(&self, entity_id: &str) -> Option<EntitySnapshot> {
        let entity = self.get(entity_id)?;
        let state = lock_entity(&entity);
        Some(EntitySnapshot {
            entity_id: entity_id.to_string(),
            samples: state.window.iter().collect(),
            actuator: state.actuator,
        })
    }

    /// Remove an entity; its next reading starts a fresh warm-up
    pub fn remove(&self, entity_id: &str) -> bool {
        self.entities.remove(entity_id).is_some()
    }

    /// Apply the configured eviction policy as of `now`.
    ///
    /// Returns the number of entities removed. A no-op under `Never`.
    pub fn evict_idle(&self, now: Instant) -> usize {
        match self.eviction {
            EvictionPolicy::Never => 0,
            EvictionPolicy::IdleFor(ttl) => self.evict_idle_older_than(now, ttl),
        }
    }

    /// Remove entities whose last reading is more than `ttl` before `now`.
    ///
    /// Entities locked by an in-flight reading are active and always kept.
    pub fn evict_idle_older_than(&self, now: Instant, ttl: Duration) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, entity| match entity.try_lock() {
            Ok(state) => now.saturating_duration_since(state.last_seen) <= ttl,
            Err(TryLockError::Poisoned(poisoned)) => {
                now.saturating_duration_since(poisoned.into_inner().last_seen) <= ttl
            }
            Err(TryLockError::WouldBlock) => true,
        });
        let evicted = before.saturating_sub(self.entities.len());

        if evicted > 0 {
            info!(
                evicted = evicted,
                remaining = self.entities.len(),
                ttl_seconds = ttl.as_secs(),
                "Evicted idle entities"
            );
        }

        evicted
    }
}

/// Lock an entity, recovering from poisoning.
///
/// Every mutation leaves the window and actuator state consistent, so a
/// panic elsewhere while holding the lock does not invalidate the data.
pub fn lock_entity(entity: &Mutex<EntityState>) -> MutexGuard<'_, EntityState> {
    entity.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Authoritative storage for live pickups.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use skull_event_core::{EntityId, EntitySnapshot};

/// State of a pickup stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct PickupState {
    /// Identifier reserved by the spawning system.
    pub(crate) id: EntityId,
    /// Position the pickup occupies.
    pub(crate) position: Vec2,
    /// Current alpha of every visual part.
    pub(crate) alphas: Vec<f32>,
    /// Layering hint applied at spawn.
    pub(crate) sorting_order: i32,
    /// Clock reading when the pickup appeared.
    pub(crate) spawned_at: Duration,
}

impl PickupState {
    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            position: self.position,
            alphas: self.alphas.clone(),
            sorting_order: self.sorting_order,
            spawned_at: self.spawned_at,
        }
    }
}

/// Registry that stores pickups keyed by identifier.
#[derive(Debug, Default)]
pub(crate) struct PickupRegistry {
    entries: BTreeMap<EntityId, PickupState>,
}

impl PickupRegistry {
    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn insert(&mut self, state: PickupState) {
        let _ = self.entries.insert(state.id, state);
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<PickupState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&PickupState> {
        self.entries.get(&id)
    }

    pub(crate) fn set_alphas(&mut self, id: EntityId, alphas: &[f32]) {
        if let Some(state) = self.entries.get_mut(&id) {
            for (current, next) in state.alphas.iter_mut().zip(alphas) {
                *current = next.clamp(0.0, 1.0);
            }
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PickupState> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

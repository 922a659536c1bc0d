#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative scene state for the skull event.

mod pickups;

use std::time::Duration;

use glam::Vec2;
use skull_event_core::{
    Command, EntityId, EntityTemplate, Event, RemovalCause, SpawnArea, SpawnRejection,
};

use crate::pickups::{PickupRegistry, PickupState};

/// Represents the authoritative scene the skull event plays out in.
#[derive(Debug, Default)]
pub struct World {
    stage: i32,
    clock: Duration,
    tick_index: u64,
    spawn_area: Option<SpawnArea>,
    template: Option<EntityTemplate>,
    pickups: PickupRegistry,
}

impl World {
    /// Creates an empty scene at stage zero with no area or template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(
        &mut self,
        entity: EntityId,
        position: Vec2,
        sorting_order: Option<i32>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(template) = self.template.as_ref() else {
            out_events.push(Event::SpawnRejected {
                entity,
                reason: SpawnRejection::MissingTemplate,
            });
            return;
        };

        if self.pickups.contains(entity) {
            out_events.push(Event::SpawnRejected {
                entity,
                reason: SpawnRejection::DuplicateEntity,
            });
            return;
        }

        self.pickups.insert(PickupState {
            id: entity,
            position,
            alphas: template.part_alphas.clone(),
            sorting_order: sorting_order.unwrap_or(template.sorting_order),
            spawned_at: self.clock,
        });
        out_events.push(Event::EntitySpawned { entity, position });
    }

    fn remove(
        &mut self,
        entity: EntityId,
        cause: RemovalCause,
        out_events: &mut Vec<Event>,
    ) {
        if self.pickups.remove(entity).is_some() {
            out_events.push(Event::EntityRemoved { entity, cause });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands that target an entity which no longer exists are ignored. A spawn
/// area with non-finite bounds leaves the scene without an area.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureSpawnArea { area } => {
            world.spawn_area = area
                .filter(|area| area.validate().is_ok())
                .map(SpawnArea::normalized);
        }
        Command::ConfigureTemplate { template } => {
            world.template = template;
        }
        Command::SetStage { stage } => {
            world.stage = stage;
            out_events.push(Event::StageChanged { stage });
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SpawnEntity {
            entity,
            position,
            sorting_order,
        } => world.spawn(entity, position, sorting_order, out_events),
        Command::SetEntityAlpha { entity, alphas } => {
            world.pickups.set_alphas(entity, &alphas);
        }
        Command::DespawnEntity { entity, cause } => world.remove(entity, cause, out_events),
        Command::CollectEntity { entity } => {
            world.remove(entity, RemovalCause::Collected, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use skull_event_core::{EntityId, EntitySnapshot, EntityTemplate, SceneView, SpawnArea};

    use super::World;

    /// Stage most recently activated.
    #[must_use]
    pub fn stage(world: &World) -> i32 {
        world.stage
    }

    /// Unscaled time accumulated across all ticks.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Configured spawn area, if any.
    #[must_use]
    pub fn spawn_area(world: &World) -> Option<SpawnArea> {
        world.spawn_area
    }

    /// Configured entity template, if any.
    #[must_use]
    pub fn template(world: &World) -> Option<&EntityTemplate> {
        world.template.as_ref()
    }

    /// Snapshot of a single live entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.pickups.get(id).map(|state| state.snapshot())
    }

    /// Snapshots of every live entity in identifier order.
    #[must_use]
    pub fn entities(world: &World) -> Vec<EntitySnapshot> {
        world.pickups.iter().map(|state| state.snapshot()).collect()
    }

    /// Number of entities currently alive in the scene.
    #[must_use]
    pub fn live_entity_count(world: &World) -> usize {
        world.pickups.len()
    }

    /// Captures everything the spawn systems read in a single view.
    #[must_use]
    pub fn scene_view(world: &World) -> SceneView {
        SceneView::new(
            world.spawn_area,
            world.template.clone(),
            entities(world),
        )
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the skull event workspace.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative scene, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, read immutable
//! [`SceneView`] snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interval at which a spawn loop re-checks whether the live entity slot emptied.
pub const VACANCY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Commands that express all permissible scene mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the ground region new entities are placed above.
    ConfigureSpawnArea {
        /// Region to use, or `None` to unset it.
        area: Option<SpawnArea>,
    },
    /// Replaces the template new entities are instantiated from.
    ConfigureTemplate {
        /// Template to use, or `None` to unset it.
        template: Option<EntityTemplate>,
    },
    /// Announces that the level advanced to the provided stage.
    SetStage {
        /// Index of the stage that became active.
        stage: i32,
    },
    /// Advances the unscaled clock by the provided delta time.
    Tick {
        /// Unscaled frame time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests instantiation of a new entity from the configured template.
    SpawnEntity {
        /// Identifier reserved for the new entity by the requesting system.
        entity: EntityId,
        /// World position the entity appears at.
        position: Vec2,
        /// Sorting order override; the template's order applies when absent.
        sorting_order: Option<i32>,
    },
    /// Overwrites the alpha of every visual part of an entity.
    SetEntityAlpha {
        /// Entity whose parts are updated.
        entity: EntityId,
        /// New alpha per visual part, in part order.
        alphas: Vec<f32>,
    },
    /// Removes an entity on behalf of the system that owns it.
    DespawnEntity {
        /// Entity to remove.
        entity: EntityId,
        /// Reason reported with the removal.
        cause: RemovalCause,
    },
    /// Removes an entity because an external actor picked it up.
    CollectEntity {
        /// Entity that was collected.
        entity: EntityId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the level switched stages.
    StageChanged {
        /// Stage that became active.
        stage: i32,
    },
    /// Indicates that the unscaled clock advanced.
    TimeAdvanced {
        /// Unscaled time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an entity was instantiated.
    EntitySpawned {
        /// Identifier of the new entity.
        entity: EntityId,
        /// Position the entity occupies.
        position: Vec2,
    },
    /// Reports that a spawn request could not be honoured.
    SpawnRejected {
        /// Identifier requested for the entity.
        entity: EntityId,
        /// Specific reason the spawn failed.
        reason: SpawnRejection,
    },
    /// Confirms that an entity left the scene.
    EntityRemoved {
        /// Identifier of the removed entity.
        entity: EntityId,
        /// Why the entity was removed.
        cause: RemovalCause,
    },
}

/// Reasons an entity can leave the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// The entity outlived its configured lifetime.
    Expired,
    /// An external actor collected the entity.
    Collected,
    /// The stage changed while the entity was alive.
    StageReset,
}

/// Reasons a spawn request can be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnRejection {
    /// No entity template is configured.
    MissingTemplate,
    /// An entity with the requested identifier already exists.
    DuplicateEntity,
}

/// Unique identifier assigned to a spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Monotonic counter distinguishing successive stage activations.
///
/// Work that was scheduled under an older epoch is stale and must not act.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageEpoch(u64);

impl StageEpoch {
    /// Epoch that follows `self`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Retrieves the numeric representation of the epoch.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Axis-aligned ground region that entities are spawned above.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnArea {
    /// Left edge in world units.
    pub min_x: f32,
    /// Right edge in world units.
    pub max_x: f32,
    /// Bottom edge in world units.
    pub min_y: f32,
    /// Top edge (ground top) in world units.
    pub max_y: f32,
}

impl SpawnArea {
    /// Creates an area from its bounds, swapping inverted pairs.
    #[must_use]
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
        .normalized()
    }

    /// Returns a copy whose minimum bounds never exceed the maximum bounds.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            min_x: self.min_x.min(self.max_x),
            max_x: self.min_x.max(self.max_x),
            min_y: self.min_y.min(self.max_y),
            max_y: self.min_y.max(self.max_y),
        }
    }

    /// Rejects bounds that are NaN or infinite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_x", self.min_x),
            ("max_x", self.max_x),
            ("min_y", self.min_y),
            ("max_y", self.max_y),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        Ok(())
    }

    /// Clamps an x coordinate into the horizontal extent of the area.
    #[must_use]
    pub fn clamp_x(&self, x: f32) -> f32 {
        let normalized = self.normalized();
        x.clamp(normalized.min_x, normalized.max_x)
    }
}

/// Vertical placement strategy for new entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnYMode {
    /// Entities appear at a configured world height.
    FixedWorldY,
    /// Entities appear a configured distance above the area's top edge.
    #[default]
    GroundTopPlusOffset,
}

/// Prefab new entities are instantiated from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityTemplate {
    /// Human-readable name used in logs.
    pub name: String,
    /// Base alpha of every visual part, in part order.
    pub part_alphas: Vec<f32>,
    /// Layering hint forwarded to presentation.
    pub sorting_order: i32,
}

impl Default for EntityTemplate {
    fn default() -> Self {
        Self {
            name: String::from("skull"),
            part_alphas: vec![1.0],
            sorting_order: 0,
        }
    }
}

impl EntityTemplate {
    /// Checks that every part alpha is a valid opacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for &alpha in &self.part_alphas {
            check_alpha("part_alphas", alpha)?;
        }
        Ok(())
    }
}

/// Designer-facing tuning for one skull event controller.
///
/// Durations are expressed in seconds of unscaled time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageConfig {
    /// Lower bound of the random wait before each arrival.
    pub min_delay: f32,
    /// Upper bound of the random wait before each arrival.
    pub max_delay: f32,
    /// Pause after each spawn before the next arrival wait starts.
    pub min_gap_between_spawns: f32,
    /// How long a spawned entity survives if nobody collects it.
    pub lifetime: f32,
    /// Stage zero and below never spawn when set.
    pub disable_on_stage_zero: bool,
    /// Inclusive lower bound of the per-stage spawn budget.
    pub min_spawns_per_stage: i32,
    /// Inclusive upper bound of the per-stage spawn budget.
    pub max_spawns_per_stage: i32,
    /// Vertical placement strategy.
    pub spawn_y_mode: SpawnYMode,
    /// Height used by [`SpawnYMode::FixedWorldY`].
    pub fixed_world_y: f32,
    /// Offset used by [`SpawnYMode::GroundTopPlusOffset`].
    pub y_offset_above_ground_top: f32,
    /// Re-clamps the drawn x into the area before spawning.
    pub clamp_to_area_x: bool,
    /// Length of the blink played as soon as an entity appears.
    pub spawn_blink_duration: f32,
    /// How long before expiry the warning blink starts.
    pub pre_despawn_blink_lead_time: f32,
    /// Length of the warning blink; never extends past expiry.
    pub pre_despawn_blink_duration: f32,
    /// Time between low and full opacity toggles.
    pub blink_interval: f32,
    /// Multiplier applied to the base alpha during the low phase.
    pub blink_alpha_low: f32,
    /// Overrides the template's sorting order when set.
    pub force_sorting_order: Option<i32>,
    /// Points granted when an entity is collected.
    pub collect_reward: u32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            min_delay: 6.0,
            max_delay: 14.0,
            min_gap_between_spawns: 4.0,
            lifetime: 10.0,
            disable_on_stage_zero: true,
            min_spawns_per_stage: 1,
            max_spawns_per_stage: 3,
            spawn_y_mode: SpawnYMode::GroundTopPlusOffset,
            fixed_world_y: 0.0,
            y_offset_above_ground_top: 0.35,
            clamp_to_area_x: true,
            spawn_blink_duration: 0.6,
            pre_despawn_blink_lead_time: 1.0,
            pre_despawn_blink_duration: 1.0,
            blink_interval: 0.1,
            blink_alpha_low: 0.25,
            force_sorting_order: None,
            collect_reward: 1,
        }
    }
}

impl StageConfig {
    /// Rejects values that cannot describe a meaningful schedule.
    ///
    /// Inverted spawn-count and delay bounds are tolerated and clamped at draw
    /// time instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("min_delay", self.min_delay),
            ("max_delay", self.max_delay),
            ("min_gap_between_spawns", self.min_gap_between_spawns),
            ("lifetime", self.lifetime),
            ("spawn_blink_duration", self.spawn_blink_duration),
            ("pre_despawn_blink_lead_time", self.pre_despawn_blink_lead_time),
            ("pre_despawn_blink_duration", self.pre_despawn_blink_duration),
            ("blink_interval", self.blink_interval),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
            if Duration::try_from_secs_f32(value).is_err() {
                return Err(ConfigError::DurationOutOfRange { field, value });
            }
        }

        let blinks = self.spawn_blink_duration > 0.0 || self.pre_despawn_blink_duration > 0.0;
        if blinks && self.blink_interval == 0.0 {
            return Err(ConfigError::ZeroBlinkInterval);
        }

        check_alpha("blink_alpha_low", self.blink_alpha_low)?;

        for (field, value) in [
            ("fixed_world_y", self.fixed_world_y),
            ("y_offset_above_ground_top", self.y_offset_above_ground_top),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        Ok(())
    }

    /// Inclusive bounds the per-stage spawn budget is drawn from.
    #[must_use]
    pub fn spawn_budget_bounds(&self) -> (u32, u32) {
        let low = self.min_spawns_per_stage.max(0);
        let high = self.max_spawns_per_stage.max(low);
        (low.unsigned_abs(), high.unsigned_abs())
    }

    /// Inclusive bounds the arrival wait is drawn from.
    #[must_use]
    pub fn arrival_delay_bounds(&self) -> (Duration, Duration) {
        let low = seconds(self.min_delay);
        (low, seconds(self.max_delay).max(low))
    }

    /// Pause between a spawn and the next arrival wait.
    #[must_use]
    pub fn spawn_gap(&self) -> Duration {
        seconds(self.min_gap_between_spawns)
    }

    /// Placement parameters consumed by the placement system.
    #[must_use]
    pub fn placement(&self) -> PlacementConfig {
        PlacementConfig {
            y_mode: self.spawn_y_mode,
            fixed_world_y: self.fixed_world_y,
            y_offset_above_ground_top: self.y_offset_above_ground_top,
            clamp_to_area_x: self.clamp_to_area_x,
        }
    }

    /// Timeline parameters consumed by the lifecycle system.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleTuning {
        let interval = seconds(self.blink_interval);
        LifecycleTuning {
            lifetime: seconds(self.lifetime),
            spawn_blink: BlinkTuning {
                duration: seconds(self.spawn_blink_duration),
                interval,
                alpha_low: self.blink_alpha_low,
            },
            pre_despawn_lead: seconds(self.pre_despawn_blink_lead_time),
            pre_despawn_blink: BlinkTuning {
                duration: seconds(self.pre_despawn_blink_duration),
                interval,
                alpha_low: self.blink_alpha_low,
            },
            collect_reward: self.collect_reward,
        }
    }
}

/// Parameters that determine where a new entity appears.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementConfig {
    /// Vertical placement strategy.
    pub y_mode: SpawnYMode,
    /// Height used by [`SpawnYMode::FixedWorldY`].
    pub fixed_world_y: f32,
    /// Offset used by [`SpawnYMode::GroundTopPlusOffset`].
    pub y_offset_above_ground_top: f32,
    /// Re-clamps the final x into the area.
    pub clamp_to_area_x: bool,
}

/// Shape of a single blink window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlinkTuning {
    /// Total length of the window.
    pub duration: Duration,
    /// Time between toggles.
    pub interval: Duration,
    /// Multiplier applied to the base alpha during the low phase.
    pub alpha_low: f32,
}

/// Timeline of a spawned entity from arrival to removal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifecycleTuning {
    /// Time between spawn and expiry.
    pub lifetime: Duration,
    /// Blink played on arrival.
    pub spawn_blink: BlinkTuning,
    /// How long before expiry the warning blink starts.
    pub pre_despawn_lead: Duration,
    /// Warning blink played before expiry.
    pub pre_despawn_blink: BlinkTuning,
    /// Points granted on collection.
    pub collect_reward: u32,
}

/// Errors reported when validating designer configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A duration was negative, NaN or infinite.
    #[error("`{field}` must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// A duration was too large to be represented.
    #[error("`{field}` is too long to be represented as a duration (got {value})")]
    DurationOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// A position parameter was NaN or infinite.
    #[error("`{field}` must be finite (got {value})")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// Blinks were requested with a zero toggle interval.
    #[error("`blink_interval` must be positive while blink durations are non-zero")]
    ZeroBlinkInterval,
    /// An opacity fell outside `[0, 1]`.
    #[error("`{field}` must lie within [0, 1] (got {value})")]
    AlphaOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
}

fn check_alpha(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::AlphaOutOfRange { field, value })
    }
}

/// Converts designer seconds into a duration, mapping invalid input to zero.
#[must_use]
pub fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}

/// Immutable representation of a single live entity used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Position the entity occupies.
    pub position: Vec2,
    /// Current alpha of every visual part.
    pub alphas: Vec<f32>,
    /// Layering hint applied at spawn.
    pub sorting_order: i32,
    /// Unscaled clock reading when the entity appeared.
    pub spawned_at: Duration,
}

/// Read-only snapshot of everything the spawn systems need from the scene.
#[derive(Clone, Debug, Default)]
pub struct SceneView {
    spawn_area: Option<SpawnArea>,
    template: Option<EntityTemplate>,
    entities: Vec<EntitySnapshot>,
}

impl SceneView {
    /// Creates a new scene view from its parts.
    #[must_use]
    pub fn new(
        spawn_area: Option<SpawnArea>,
        template: Option<EntityTemplate>,
        mut entities: Vec<EntitySnapshot>,
    ) -> Self {
        entities.sort_by_key(|snapshot| snapshot.id);
        Self {
            spawn_area,
            template,
            entities,
        }
    }

    /// Configured spawn area, if any.
    #[must_use]
    pub fn spawn_area(&self) -> Option<SpawnArea> {
        self.spawn_area
    }

    /// Configured entity template, if any.
    #[must_use]
    pub fn template(&self) -> Option<&EntityTemplate> {
        self.template.as_ref()
    }

    /// Looks up a live entity by identifier.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.entities[index])
    }

    /// Iterator over the live entities in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.iter()
    }
}

/// Receiver for points earned when a spawned entity is collected.
///
/// Passed explicitly into the systems that grant rewards.
pub trait RewardSink {
    /// Credits the provided amount.
    fn grant(&mut self, amount: u32);
}

impl<F> RewardSink for F
where
    F: FnMut(u32),
{
    fn grant(&mut self, amount: u32) {
        (*self)(amount);
    }
}

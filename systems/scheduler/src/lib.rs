#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Stage-scoped randomized spawn scheduler for the skull event.
//!
//! Every stage activation draws a spawn budget and starts at most one spawn
//! loop. The loop waits a random arrival delay, waits until no entity is alive,
//! spawns one entity above the configured area, and pauses for the configured
//! gap before starting over. Changing the stage cancels the loop and removes
//! the live entity before anything for the new stage is computed.

use std::{slice, time::Duration};

use log::{debug, info, warn};
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use skull_event_core::{
    Command, ConfigError, EntityId, Event, LifecycleTuning, PlacementConfig, RewardSink,
    SceneView, StageConfig, StageEpoch, VACANCY_POLL_INTERVAL,
};
use skull_event_system_lifecycle::{LifecycleStatus, SpawnedEntityLifecycle};
use skull_event_system_placement::place;

/// Suspension point the spawn loop is parked at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopPhase {
    /// Random wait before the next arrival.
    Arrival { remaining: Duration },
    /// Waiting for the live entity slot to empty; re-checked every poll.
    AwaitVacancy { until_poll: Duration },
    /// Fixed pause after a spawn.
    Gap { remaining: Duration },
}

/// Spawn loop bound to the stage activation that started it.
#[derive(Clone, Copy, Debug)]
struct SpawnLoop {
    epoch: StageEpoch,
    phase: LoopPhase,
}

/// Top-level state holder that level code drives with stage changes and ticks.
#[derive(Debug)]
pub struct StageSpawnScheduler {
    config: StageConfig,
    placement: PlacementConfig,
    lifecycle: LifecycleTuning,
    rng: ChaCha8Rng,
    stage: i32,
    epoch: StageEpoch,
    spawns_remaining: u32,
    active_loop: Option<SpawnLoop>,
    alive: Option<SpawnedEntityLifecycle>,
    next_entity: u32,
}

impl StageSpawnScheduler {
    /// Creates an idle scheduler; nothing spawns until a stage is set.
    pub fn new(config: StageConfig, rng_seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            placement: config.placement(),
            lifecycle: config.lifecycle(),
            config,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
            stage: 0,
            epoch: StageEpoch::default(),
            spawns_remaining: 0,
            active_loop: None,
            alive: None,
            next_entity: 1,
        })
    }

    /// Configuration the scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Stage most recently activated.
    #[must_use]
    pub const fn stage(&self) -> i32 {
        self.stage
    }

    /// Epoch of the current stage activation.
    #[must_use]
    pub const fn epoch(&self) -> StageEpoch {
        self.epoch
    }

    /// Entities still to be spawned during the current stage.
    #[must_use]
    pub const fn spawns_remaining(&self) -> u32 {
        self.spawns_remaining
    }

    /// Reports whether a spawn loop is running.
    #[must_use]
    pub const fn has_active_loop(&self) -> bool {
        self.active_loop.is_some()
    }

    /// Entity currently alive, if any.
    #[must_use]
    pub fn alive_entity(&self) -> Option<EntityId> {
        self.alive.as_ref().map(SpawnedEntityLifecycle::entity)
    }

    /// Lifecycle of the entity currently alive, if any.
    #[must_use]
    pub fn live_entity(&self) -> Option<&SpawnedEntityLifecycle> {
        self.alive.as_ref()
    }

    /// Resets all stage state and starts spawning for `stage`.
    ///
    /// The running loop and the live entity are cancelled before the new
    /// budget is drawn. Re-entering the same stage draws a fresh budget.
    pub fn set_stage(&mut self, stage: i32, out: &mut Vec<Command>) {
        self.active_loop = None;
        if let Some(mut lifecycle) = self.alive.take() {
            lifecycle.cancel(out);
        }

        self.epoch = self.epoch.next();
        self.stage = stage;

        if self.config.disable_on_stage_zero && stage <= 0 {
            self.spawns_remaining = 0;
            info!("stage {stage} activated; skull event disabled");
            return;
        }

        let (low, high) = self.config.spawn_budget_bounds();
        self.spawns_remaining = self.rng.gen_range(low..=high);
        info!(
            "stage {stage} activated with {} skull spawns",
            self.spawns_remaining
        );

        if self.spawns_remaining > 0 {
            let remaining = self.draw_arrival_delay();
            self.active_loop = Some(SpawnLoop {
                epoch: self.epoch,
                phase: LoopPhase::Arrival { remaining },
            });
        }
    }

    /// Consumes world events and emits the commands they imply.
    ///
    /// `scene` must reflect the world before `events` were produced. `rewards`
    /// is credited when a live entity is collected.
    pub fn handle(
        &mut self,
        events: &[Event],
        scene: &SceneView,
        rewards: &mut dyn RewardSink,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::StageChanged { stage } => self.set_stage(*stage, out),
                Event::TimeAdvanced { dt } => {
                    self.forward(event, rewards, out);
                    self.advance_loop(*dt, scene, out);
                }
                Event::SpawnRejected { entity, reason } => {
                    if self.alive_entity() == Some(*entity) {
                        warn!("spawn of entity {} rejected: {reason:?}", entity.get());
                    }
                    self.forward(event, rewards, out);
                }
                Event::EntityRemoved { .. } => self.forward(event, rewards, out),
                Event::EntitySpawned { .. } => {}
            }
        }
    }

    fn forward(&mut self, event: &Event, rewards: &mut dyn RewardSink, out: &mut Vec<Command>) {
        let Some(lifecycle) = self.alive.as_mut() else {
            return;
        };

        if lifecycle.handle(slice::from_ref(event), rewards, out) != LifecycleStatus::Alive {
            self.alive = None;
        }
    }

    fn advance_loop(&mut self, dt: Duration, scene: &SceneView, out: &mut Vec<Command>) {
        let mut budget = dt;

        while let Some(active) = self.active_loop {
            if active.epoch != self.epoch {
                self.active_loop = None;
                return;
            }

            let next = match active.phase {
                LoopPhase::Arrival { remaining } => {
                    if budget < remaining {
                        self.park(active, LoopPhase::Arrival {
                            remaining: remaining - budget,
                        });
                        return;
                    }
                    budget -= remaining;
                    LoopPhase::AwaitVacancy {
                        until_poll: Duration::ZERO,
                    }
                }
                LoopPhase::AwaitVacancy { until_poll } => {
                    if budget < until_poll {
                        self.park(active, LoopPhase::AwaitVacancy {
                            until_poll: until_poll - budget,
                        });
                        return;
                    }
                    budget -= until_poll;
                    if self.alive.is_some() {
                        LoopPhase::AwaitVacancy {
                            until_poll: VACANCY_POLL_INTERVAL,
                        }
                    } else if self.spawn(scene, budget, out) {
                        LoopPhase::Gap {
                            remaining: self.config.spawn_gap(),
                        }
                    } else {
                        self.active_loop = None;
                        return;
                    }
                }
                LoopPhase::Gap { remaining } => {
                    if budget < remaining {
                        self.park(active, LoopPhase::Gap {
                            remaining: remaining - budget,
                        });
                        return;
                    }
                    budget -= remaining;
                    LoopPhase::Arrival {
                        remaining: self.draw_arrival_delay(),
                    }
                }
            };

            self.park(active, next);
        }
    }

    fn park(&mut self, active: SpawnLoop, phase: LoopPhase) {
        self.active_loop = Some(SpawnLoop { phase, ..active });
    }

    /// Spawns one entity; returns whether the loop should keep running.
    ///
    /// `elapsed` is the part of the current frame left after the spawn point.
    fn spawn(&mut self, scene: &SceneView, elapsed: Duration, out: &mut Vec<Command>) -> bool {
        let Some(area) = scene.spawn_area() else {
            warn!(
                "skull event spawn area is unset; stage {} spawns nothing further",
                self.stage
            );
            return false;
        };
        let Some(template) = scene.template() else {
            warn!(
                "skull event template is unset; stage {} spawns nothing further",
                self.stage
            );
            return false;
        };

        let position = place(&area, &self.placement, &mut self.rng);
        let entity = EntityId::new(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);

        out.push(Command::SpawnEntity {
            entity,
            position,
            sorting_order: self.config.force_sorting_order,
        });
        let mut lifecycle =
            SpawnedEntityLifecycle::spawn(entity, template.part_alphas.clone(), self.lifecycle, out);
        if lifecycle.catch_up(elapsed, out) == LifecycleStatus::Alive {
            self.alive = Some(lifecycle);
        }
        self.spawns_remaining = self.spawns_remaining.saturating_sub(1);
        debug!(
            "spawned entity {} at ({:.2}, {:.2}); {} left in stage {}",
            entity.get(),
            position.x,
            position.y,
            self.spawns_remaining,
            self.stage
        );

        self.spawns_remaining > 0
    }

    fn draw_arrival_delay(&mut self) -> Duration {
        let (low, high) = self.config.arrival_delay_bounds();
        self.rng.gen_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use skull_event_core::{EntitySnapshot, EntityTemplate, RemovalCause, SpawnArea};

    use super::*;

    fn scene() -> SceneView {
        SceneView::new(
            Some(SpawnArea::new(-2.0, 2.0, 0.0, 1.0)),
            Some(EntityTemplate::default()),
            Vec::new(),
        )
    }

    fn scheduler(budget: i32) -> StageSpawnScheduler {
        StageSpawnScheduler::new(
            StageConfig {
                min_delay: 1.0,
                max_delay: 1.0,
                min_gap_between_spawns: 1.0,
                min_spawns_per_stage: budget,
                max_spawns_per_stage: budget,
                ..StageConfig::default()
            },
            7,
        )
        .expect("valid config")
    }

    fn spawn_count(out: &[Command]) -> usize {
        out.iter()
            .filter(|command| matches!(command, Command::SpawnEntity { .. }))
            .count()
    }

    #[test]
    fn long_frame_spawns_once_and_waits_for_vacancy() {
        let mut scheduler = scheduler(3);
        let mut out = Vec::new();
        scheduler.set_stage(1, &mut out);

        scheduler.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(5),
            }],
            &scene(),
            &mut |_: u32| {},
            &mut out,
        );

        assert_eq!(spawn_count(&out), 1);
        assert_eq!(scheduler.spawns_remaining(), 2);
        assert!(matches!(
            scheduler.active_loop.map(|active| active.phase),
            Some(LoopPhase::AwaitVacancy { .. })
        ));
        assert_eq!(
            scheduler.live_entity().map(SpawnedEntityLifecycle::age),
            Some(Duration::from_secs(4)),
            "the entity ages by the part of the frame after its spawn"
        );
    }

    #[test]
    fn entity_spawned_mid_frame_can_expire_in_same_frame() {
        let mut scheduler = StageSpawnScheduler::new(
            StageConfig {
                min_delay: 1.0,
                max_delay: 1.0,
                lifetime: 2.0,
                min_spawns_per_stage: 1,
                max_spawns_per_stage: 1,
                ..StageConfig::default()
            },
            3,
        )
        .expect("valid config");
        assert_eq!(scheduler.config().lifetime, 2.0);
        let mut out = Vec::new();
        scheduler.set_stage(1, &mut out);

        scheduler.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(5),
            }],
            &scene(),
            &mut |_: u32| {},
            &mut out,
        );

        assert_eq!(spawn_count(&out), 1);
        assert!(matches!(
            out.last(),
            Some(Command::DespawnEntity {
                cause: RemovalCause::Expired,
                ..
            })
        ));
        assert_eq!(scheduler.alive_entity(), None);
        assert!(!scheduler.has_active_loop());
    }

    #[test]
    fn loop_from_previous_epoch_is_discarded() {
        let mut scheduler = scheduler(2);
        let mut out = Vec::new();
        scheduler.set_stage(1, &mut out);
        scheduler.active_loop = scheduler.active_loop.map(|active| SpawnLoop {
            epoch: StageEpoch::default(),
            ..active
        });

        scheduler.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(5),
            }],
            &scene(),
            &mut |_: u32| {},
            &mut out,
        );

        assert!(out.is_empty());
        assert!(!scheduler.has_active_loop());
    }

    #[test]
    fn last_spawn_ends_the_loop() {
        let mut scheduler = scheduler(1);
        let mut out = Vec::new();
        scheduler.set_stage(2, &mut out);

        scheduler.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(1),
            }],
            &scene(),
            &mut |_: u32| {},
            &mut out,
        );

        assert_eq!(spawn_count(&out), 1);
        assert_eq!(scheduler.spawns_remaining(), 0);
        assert!(!scheduler.has_active_loop());
        assert!(scheduler.alive_entity().is_some());
    }

    #[test]
    fn foreign_removal_leaves_live_entity_alone() {
        let mut scheduler = scheduler(1);
        let mut out = Vec::new();
        scheduler.set_stage(1, &mut out);
        scheduler.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(1),
            }],
            &scene(),
            &mut |_: u32| {},
            &mut out,
        );
        let live = scheduler.alive_entity().expect("entity alive");
        let other = EntityId::new(live.get() + 40);
        let scene = SceneView::new(
            scene().spawn_area(),
            scene().template().cloned(),
            vec![EntitySnapshot {
                id: other,
                position: Vec2::ZERO,
                alphas: vec![1.0],
                sorting_order: 0,
                spawned_at: Duration::ZERO,
            }],
        );

        scheduler.handle(
            &[Event::EntityRemoved {
                entity: other,
                cause: RemovalCause::Collected,
            }],
            &scene,
            &mut |_: u32| panic!("foreign collection must not pay out"),
            &mut out,
        );

        assert_eq!(scheduler.alive_entity(), Some(live));
    }
}

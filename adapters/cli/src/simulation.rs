use std::{fmt, time::Duration};

use glam::Vec2;
use log::debug;
use skull_event_core::{Command, ConfigError, EntityId, Event, RemovalCause};
use skull_event_system_scheduler::StageSpawnScheduler;
use skull_event_world::{self as world, query, World};

use crate::scenario::{Scenario, StageCue};

/// Notable moment in a simulated run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum TimelineEntry {
    /// A stage became active.
    StageChanged { at: Duration, stage: i32 },
    /// An entity appeared in the scene.
    Spawned {
        at: Duration,
        entity: EntityId,
        position: Vec2,
    },
    /// An entity left the scene.
    Removed {
        at: Duration,
        entity: EntityId,
        cause: RemovalCause,
    },
}

impl fmt::Display for TimelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageChanged { at, stage } => {
                write!(f, "[{:>8.2}s] stage {stage} activated", at.as_secs_f32())
            }
            Self::Spawned {
                at,
                entity,
                position,
            } => write!(
                f,
                "[{:>8.2}s] skull #{} spawned at ({:.2}, {:.2})",
                at.as_secs_f32(),
                entity.get(),
                position.x,
                position.y
            ),
            Self::Removed { at, entity, cause } => {
                let verb = match cause {
                    RemovalCause::Expired => "expired",
                    RemovalCause::Collected => "collected",
                    RemovalCause::StageReset => "cleared by stage change",
                };
                write!(
                    f,
                    "[{:>8.2}s] skull #{} {verb}",
                    at.as_secs_f32(),
                    entity.get()
                )
            }
        }
    }
}

/// Totals accumulated over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    spawned: u32,
    collected: u32,
    expired: u32,
    reset: u32,
    points: u32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spawned {} | collected {} | expired {} | reset {} | points {}",
            self.spawned, self.collected, self.expired, self.reset, self.points
        )
    }
}

/// Drives the world and the scheduler on a fixed-step simulated clock.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    scheduler: StageSpawnScheduler,
    cues: Vec<StageCue>,
    next_cue: usize,
    collect_after: Option<Duration>,
    summary: Summary,
    timeline: Vec<TimelineEntry>,
}

impl Simulation {
    /// Builds the scene described by `scenario`; `cues` must be sorted by time.
    pub(crate) fn new(
        scenario: Scenario,
        seed: u64,
        cues: Vec<StageCue>,
        collect_after: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let scheduler = StageSpawnScheduler::new(scenario.stage, seed)?;
        let mut simulation = Self {
            world: World::new(),
            scheduler,
            cues,
            next_cue: 0,
            collect_after,
            summary: Summary::default(),
            timeline: Vec::new(),
        };
        simulation.submit(vec![
            Command::ConfigureSpawnArea {
                area: scenario.area,
            },
            Command::ConfigureTemplate {
                template: scenario.template,
            },
        ]);
        Ok(simulation)
    }

    /// Steps frames of length `frame` until the clock reaches `duration`.
    pub(crate) fn run(&mut self, duration: Duration, frame: Duration) {
        if frame.is_zero() {
            return;
        }
        while query::clock(&self.world) < duration {
            self.step(frame);
        }
    }

    /// Totals accumulated so far.
    pub(crate) fn summary(&self) -> Summary {
        self.summary
    }

    /// Entries recorded so far, in order.
    pub(crate) fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    fn step(&mut self, dt: Duration) {
        let clock = query::clock(&self.world);
        let mut commands = Vec::new();
        while let Some(cue) = self.cues.get(self.next_cue).copied() {
            if cue.at > clock {
                break;
            }
            commands.push(Command::SetStage { stage: cue.stage });
            self.next_cue += 1;
        }
        commands.push(Command::Tick { dt });
        self.submit(commands);

        let Some(threshold) = self.collect_after else {
            return;
        };
        let ripe = self
            .scheduler
            .live_entity()
            .filter(|lifecycle| lifecycle.age() >= threshold)
            .map(|lifecycle| lifecycle.entity());
        if let Some(entity) = ripe {
            debug!("collecting skull #{}", entity.get());
            self.submit(vec![Command::CollectEntity { entity }]);
        }
    }

    fn submit(&mut self, commands: Vec<Command>) {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        while !events.is_empty() {
            self.record(&events);

            let scene = query::scene_view(&self.world);
            let mut commands = Vec::new();
            let points = &mut self.summary.points;
            self.scheduler.handle(
                &events,
                &scene,
                &mut |amount: u32| *points += amount,
                &mut commands,
            );

            events.clear();
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }
    }

    fn record(&mut self, events: &[Event]) {
        let at = query::clock(&self.world);
        for event in events {
            let entry = match *event {
                Event::StageChanged { stage } => TimelineEntry::StageChanged { at, stage },
                Event::EntitySpawned { entity, position } => {
                    self.summary.spawned += 1;
                    TimelineEntry::Spawned {
                        at,
                        entity,
                        position,
                    }
                }
                Event::EntityRemoved { entity, cause } => {
                    match cause {
                        RemovalCause::Expired => self.summary.expired += 1,
                        RemovalCause::Collected => self.summary.collected += 1,
                        RemovalCause::StageReset => self.summary.reset += 1,
                    }
                    TimelineEntry::Removed { at, entity, cause }
                }
                Event::TimeAdvanced { .. } | Event::SpawnRejected { .. } => continue,
            };
            self.timeline.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use skull_event_core::StageConfig;

    use super::*;
    use crate::scenario::parse_stage_cues;

    const FRAME: Duration = Duration::from_nanos(16_666_667);

    fn simulate(
        scenario: Scenario,
        cues: &str,
        collect_after: Option<Duration>,
        seconds: u64,
    ) -> Simulation {
        let cues = parse_stage_cues(cues).expect("valid cues");
        let mut simulation =
            Simulation::new(scenario, 11, cues, collect_after).expect("valid scenario");
        simulation.run(Duration::from_secs(seconds), FRAME);
        simulation
    }

    #[test]
    fn quick_collection_collects_every_spawn() {
        let simulation = simulate(
            Scenario::default(),
            "0:1",
            Some(Duration::from_millis(500)),
            200,
        );
        let summary = simulation.summary();

        assert!((1..=3).contains(&summary.spawned), "{summary}");
        assert_eq!(summary.collected, summary.spawned);
        assert_eq!(summary.expired, 0);
        assert_eq!(summary.points, summary.collected);
    }

    #[test]
    fn uncollected_skulls_expire_without_points() {
        let simulation = simulate(Scenario::default(), "0:1", None, 200);
        let summary = simulation.summary();

        assert!(summary.spawned >= 1);
        assert_eq!(summary.expired, summary.spawned);
        assert_eq!(summary.points, 0);
    }

    #[test]
    fn stage_zero_keeps_scene_empty() {
        let simulation = simulate(Scenario::default(), "0:0", None, 120);

        assert_eq!(simulation.summary(), Summary::default());
        assert_eq!(
            simulation.timeline(),
            &[TimelineEntry::StageChanged {
                at: Duration::ZERO,
                stage: 0,
            }]
        );
    }

    #[test]
    fn stage_change_clears_live_skull() {
        let scenario = Scenario {
            stage: StageConfig {
                min_delay: 1.0,
                max_delay: 1.0,
                lifetime: 30.0,
                ..StageConfig::default()
            },
            ..Scenario::default()
        };

        let simulation = simulate(scenario, "0:1,20:2", None, 25);

        assert_eq!(simulation.summary().reset, 1);
        assert!(simulation.timeline().iter().any(|entry| matches!(
            entry,
            TimelineEntry::StageChanged { stage: 2, .. }
        )));
    }

    #[test]
    fn scenario_without_area_spawns_nothing() {
        let scenario =
            Scenario::parse("[stage]\nmin_delay = 0.5\nmax_delay = 0.5\n\n[template]\nname = \"skull\"\n")
                .expect("valid scenario");
        assert_eq!(scenario.area, None);

        let simulation = simulate(scenario, "0:1,10:2", None, 20);

        assert_eq!(simulation.summary(), Summary::default());
        assert_eq!(
            simulation.timeline().len(),
            2,
            "only the stage changes are recorded"
        );
    }

    #[test]
    fn timeline_lines_are_readable() {
        let entry = TimelineEntry::Removed {
            at: Duration::from_millis(12_500),
            entity: EntityId::new(4),
            cause: RemovalCause::Collected,
        };

        assert_eq!(entry.to_string(), "[   12.50s] skull #4 collected");
    }
}

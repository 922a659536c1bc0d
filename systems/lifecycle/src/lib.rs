#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timeline of a single spawned pickup from arrival to removal.
//!
//! A [`SpawnedEntityLifecycle`] owns exactly one entity. It plays the arrival
//! blink, starts the warning blink shortly before expiry, and despawns the
//! entity once its lifetime is spent. External removal (collection) may happen
//! at any point; the lifecycle then stops without touching the entity again.

use std::time::Duration;

use log::debug;
use skull_event_core::{
    BlinkTuning, Command, EntityId, Event, LifecycleTuning, RemovalCause, RewardSink,
    SpawnRejection,
};
use skull_event_system_blink::BlinkEffect;

/// Whether the owned entity is still in play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleStatus {
    /// The entity exists and its timeline is running.
    Alive,
    /// The entity left the scene for the given reason.
    Removed(RemovalCause),
    /// The world refused to create the entity.
    Rejected(SpawnRejection),
}

/// Owns one live entity and schedules its blinks and removal.
#[derive(Debug)]
pub struct SpawnedEntityLifecycle {
    entity: EntityId,
    tuning: LifecycleTuning,
    base_alphas: Vec<f32>,
    age: Duration,
    warn_at: Duration,
    warned: bool,
    spawn_blink: Option<BlinkEffect>,
    despawn_blink: Option<BlinkEffect>,
    status: LifecycleStatus,
}

impl SpawnedEntityLifecycle {
    /// Takes ownership of a freshly spawned entity and starts its arrival blink.
    ///
    /// `base_alphas` are the part alphas the entity was instantiated with; every
    /// blink restores exactly these values.
    pub fn spawn(
        entity: EntityId,
        base_alphas: Vec<f32>,
        tuning: LifecycleTuning,
        out: &mut Vec<Command>,
    ) -> Self {
        let lead = tuning.pre_despawn_lead.min(tuning.lifetime);
        let mut spawn_blink = BlinkEffect::new(entity, base_alphas.clone(), tuning.spawn_blink);
        let _ = spawn_blink.start(out);

        Self {
            entity,
            tuning,
            base_alphas,
            age: Duration::ZERO,
            warn_at: tuning.lifetime - lead,
            warned: false,
            spawn_blink: spawn_blink.is_active().then_some(spawn_blink),
            despawn_blink: None,
            status: LifecycleStatus::Alive,
        }
    }

    /// Entity owned by this lifecycle.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Time since the entity appeared.
    #[must_use]
    pub const fn age(&self) -> Duration {
        self.age
    }

    /// Age at which the entity is removed.
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.tuning.lifetime
    }

    /// Age at which the warning blink starts.
    #[must_use]
    pub const fn warn_at(&self) -> Duration {
        self.warn_at
    }

    /// Alphas captured when the entity appeared.
    #[must_use]
    pub fn base_alphas(&self) -> &[f32] {
        &self.base_alphas
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> LifecycleStatus {
        self.status
    }

    /// Reports whether the entity is still in play.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status == LifecycleStatus::Alive
    }

    /// Reports whether the arrival blink is running.
    #[must_use]
    pub fn spawn_blink_active(&self) -> bool {
        self.spawn_blink.as_ref().is_some_and(BlinkEffect::is_active)
    }

    /// Reports whether the warning blink is running.
    #[must_use]
    pub fn despawn_blink_active(&self) -> bool {
        self.despawn_blink.as_ref().is_some_and(BlinkEffect::is_active)
    }

    /// Consumes world events and returns the resulting status.
    ///
    /// `rewards` is credited once if the entity is collected.
    pub fn handle(
        &mut self,
        events: &[Event],
        rewards: &mut dyn RewardSink,
        out: &mut Vec<Command>,
    ) -> LifecycleStatus {
        for event in events {
            if !self.is_alive() {
                break;
            }

            match event {
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                Event::EntityRemoved { entity, cause } if *entity == self.entity => {
                    self.removed_externally(*cause, rewards);
                }
                Event::SpawnRejected { entity, reason } if *entity == self.entity => {
                    self.drop_blinks();
                    self.status = LifecycleStatus::Rejected(*reason);
                }
                _ => {}
            }
        }
        self.status
    }

    /// Advances the timeline by time that passed between the spawn and the end
    /// of the frame it happened in.
    pub fn catch_up(&mut self, elapsed: Duration, out: &mut Vec<Command>) -> LifecycleStatus {
        if self.is_alive() && !elapsed.is_zero() {
            self.advance(elapsed, out);
        }
        self.status
    }

    /// Removes the entity immediately because its stage ended.
    pub fn cancel(&mut self, out: &mut Vec<Command>) {
        if !self.is_alive() {
            return;
        }

        self.drop_blinks();
        out.push(Command::DespawnEntity {
            entity: self.entity,
            cause: RemovalCause::StageReset,
        });
        self.status = LifecycleStatus::Removed(RemovalCause::StageReset);
        debug!("entity {} cancelled by stage reset", self.entity.get());
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        self.age = self.age.saturating_add(dt);

        if let Some(blink) = self.spawn_blink.as_mut() {
            let _ = blink.advance(dt, out);
            if !blink.is_active() {
                self.spawn_blink = None;
            }
        }

        if let Some(blink) = self.despawn_blink.as_mut() {
            let _ = blink.advance(dt, out);
            if !blink.is_active() {
                self.despawn_blink = None;
            }
        }

        if !self.warned && self.age >= self.warn_at {
            self.begin_warning(self.age - self.warn_at, out);
        }

        if self.age >= self.tuning.lifetime {
            self.expire(out);
        }
    }

    fn begin_warning(&mut self, overshoot: Duration, out: &mut Vec<Command>) {
        self.warned = true;

        // Blinks on one entity are serialized: the arrival blink is closed out
        // so both windows restore the same snapshot.
        if let Some(mut blink) = self.spawn_blink.take() {
            blink.finish(out);
        }

        let window = self
            .tuning
            .pre_despawn_blink
            .duration
            .min(self.tuning.lifetime - self.warn_at);
        let mut blink = BlinkEffect::new(
            self.entity,
            self.base_alphas.clone(),
            BlinkTuning {
                duration: window,
                ..self.tuning.pre_despawn_blink
            },
        );
        let _ = blink.start(out);
        let _ = blink.advance(overshoot, out);
        if blink.is_active() {
            self.despawn_blink = Some(blink);
        }
    }

    fn expire(&mut self, out: &mut Vec<Command>) {
        self.drop_blinks();
        out.push(Command::DespawnEntity {
            entity: self.entity,
            cause: RemovalCause::Expired,
        });
        self.status = LifecycleStatus::Removed(RemovalCause::Expired);
        debug!(
            "entity {} expired after {:?}",
            self.entity.get(),
            self.tuning.lifetime
        );
    }

    fn removed_externally(&mut self, cause: RemovalCause, rewards: &mut dyn RewardSink) {
        self.drop_blinks();
        self.status = LifecycleStatus::Removed(cause);
        if cause == RemovalCause::Collected {
            rewards.grant(self.tuning.collect_reward);
        }
        debug!("entity {} removed: {cause:?}", self.entity.get());
    }

    fn drop_blinks(&mut self) {
        self.spawn_blink = None;
        self.despawn_blink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> LifecycleTuning {
        let blink = BlinkTuning {
            duration: Duration::from_millis(600),
            interval: Duration::from_millis(100),
            alpha_low: 0.25,
        };
        LifecycleTuning {
            lifetime: Duration::from_secs(10),
            spawn_blink: blink,
            pre_despawn_lead: Duration::from_secs(1),
            pre_despawn_blink: BlinkTuning {
                duration: Duration::from_secs(1),
                ..blink
            },
            collect_reward: 5,
        }
    }

    #[test]
    fn lead_longer_than_lifetime_warns_immediately() {
        let mut out = Vec::new();
        let lifecycle = SpawnedEntityLifecycle::spawn(
            EntityId::new(1),
            vec![1.0],
            LifecycleTuning {
                lifetime: Duration::from_millis(500),
                ..tuning()
            },
            &mut out,
        );

        assert_eq!(lifecycle.warn_at(), Duration::ZERO);
        assert!(lifecycle.spawn_blink_active());
        assert_eq!(out.len(), 1, "arrival blink dims immediately");
    }

    #[test]
    fn catch_up_ages_mid_frame_spawns() {
        let mut out = Vec::new();
        let mut lifecycle =
            SpawnedEntityLifecycle::spawn(EntityId::new(4), vec![0.5, 1.0], tuning(), &mut out);
        out.clear();

        let status = lifecycle.catch_up(Duration::from_millis(9_400), &mut out);

        assert_eq!(status, LifecycleStatus::Alive);
        assert_eq!(lifecycle.age(), Duration::from_millis(9_400));
        assert!(lifecycle.despawn_blink_active());
        assert_eq!(lifecycle.base_alphas(), &[0.5, 1.0]);

        let status = lifecycle.catch_up(Duration::from_millis(600), &mut out);
        assert_eq!(status, LifecycleStatus::Removed(RemovalCause::Expired));
        assert_eq!(
            out.last(),
            Some(&Command::DespawnEntity {
                entity: EntityId::new(4),
                cause: RemovalCause::Expired,
            })
        );
    }

    #[test]
    fn cancel_emits_single_despawn() {
        let mut out = Vec::new();
        let mut lifecycle =
            SpawnedEntityLifecycle::spawn(EntityId::new(2), vec![1.0], tuning(), &mut out);
        out.clear();

        lifecycle.cancel(&mut out);
        lifecycle.cancel(&mut out);

        assert_eq!(
            out,
            vec![Command::DespawnEntity {
                entity: EntityId::new(2),
                cause: RemovalCause::StageReset,
            }]
        );
        assert!(!lifecycle.spawn_blink_active());
    }

    #[test]
    fn rejection_stops_the_timeline() {
        let mut out = Vec::new();
        let mut lifecycle =
            SpawnedEntityLifecycle::spawn(EntityId::new(3), vec![1.0], tuning(), &mut out);
        out.clear();
        let mut granted = 0;

        let status = lifecycle.handle(
            &[
                Event::SpawnRejected {
                    entity: EntityId::new(3),
                    reason: SpawnRejection::MissingTemplate,
                },
                Event::TimeAdvanced {
                    dt: Duration::from_secs(20),
                },
            ],
            &mut |amount: u32| granted += amount,
            &mut out,
        );

        assert_eq!(
            status,
            LifecycleStatus::Rejected(SpawnRejection::MissingTemplate)
        );
        assert!(out.is_empty());
        assert_eq!(granted, 0);
    }
}

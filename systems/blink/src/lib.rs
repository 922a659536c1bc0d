#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded blink animation that alternates an entity between dimmed and full opacity.
//!
//! A [`BlinkEffect`] snapshots the base alpha of every visual part when it is
//! created, multiplies those bases by the low factor and by `1.0` in turn every
//! interval, and writes the exact snapshot back when the window closes. If the
//! target disappears first the effect stops without emitting anything.

use std::time::Duration;

use log::debug;
use skull_event_core::{BlinkTuning, Command, EntityId, EntitySnapshot, Event};

/// Progress of a blink effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlinkStatus {
    /// Created but not started.
    Pending,
    /// Currently toggling opacity.
    Running,
    /// Window elapsed or finished early; base alphas were restored.
    Finished,
    /// Target vanished; nothing further is emitted.
    Abandoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pending,
    Low,
    High,
    Finished,
    Abandoned,
}

/// Alternating-opacity animation bound to a single entity.
#[derive(Clone, Debug)]
pub struct BlinkEffect {
    target: EntityId,
    base_alphas: Vec<f32>,
    tuning: BlinkTuning,
    elapsed: Duration,
    phase: Phase,
}

impl BlinkEffect {
    /// Creates a pending effect that restores `base_alphas` on completion.
    #[must_use]
    pub fn new(target: EntityId, base_alphas: Vec<f32>, tuning: BlinkTuning) -> Self {
        Self {
            target,
            base_alphas,
            tuning,
            elapsed: Duration::ZERO,
            phase: Phase::Pending,
        }
    }

    /// Creates a pending effect whose base alphas are the entity's current ones.
    #[must_use]
    pub fn capture(target: &EntitySnapshot, tuning: BlinkTuning) -> Self {
        Self::new(target.id, target.alphas.clone(), tuning)
    }

    /// Entity the effect animates.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        self.target
    }

    /// Alphas written back when the effect finishes.
    #[must_use]
    pub fn base_alphas(&self) -> &[f32] {
        &self.base_alphas
    }

    /// Time spent running so far.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Current progress.
    #[must_use]
    pub const fn status(&self) -> BlinkStatus {
        match self.phase {
            Phase::Pending => BlinkStatus::Pending,
            Phase::Low | Phase::High => BlinkStatus::Running,
            Phase::Finished => BlinkStatus::Finished,
            Phase::Abandoned => BlinkStatus::Abandoned,
        }
    }

    /// Reports whether the effect is currently toggling.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Low | Phase::High)
    }

    /// Starts the window in the low phase.
    ///
    /// A zero-length window finishes immediately without touching the target.
    pub fn start(&mut self, out: &mut Vec<Command>) -> BlinkStatus {
        if self.phase != Phase::Pending {
            return self.status();
        }

        if self.tuning.duration.is_zero() {
            self.phase = Phase::Finished;
            return self.status();
        }

        debug!(
            "blink started on entity {} for {:?}",
            self.target.get(),
            self.tuning.duration
        );
        self.phase = Phase::Low;
        self.emit(Phase::Low, out);
        self.status()
    }

    /// Consumes world events, advancing time and watching for target removal.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) -> BlinkStatus {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    let _ = self.advance(*dt, out);
                }
                Event::EntityRemoved { entity, .. } if *entity == self.target => {
                    self.abandon();
                }
                _ => {}
            }
        }
        self.status()
    }

    /// Advances the effect by `dt` of unscaled time.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) -> BlinkStatus {
        if !self.is_active() {
            return self.status();
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.tuning.duration {
            self.finish(out);
            return self.status();
        }

        let next = self.phase_at(self.elapsed);
        if next != self.phase {
            self.phase = next;
            self.emit(next, out);
        }
        self.status()
    }

    /// Ends a running effect early, restoring the base alphas.
    pub fn finish(&mut self, out: &mut Vec<Command>) {
        match self.phase {
            Phase::Low | Phase::High => {
                self.emit(Phase::Finished, out);
                debug!("blink finished on entity {}", self.target.get());
                self.phase = Phase::Finished;
            }
            Phase::Pending => self.phase = Phase::Finished,
            Phase::Finished | Phase::Abandoned => {}
        }
    }

    /// Stops the effect without touching the target, which no longer exists.
    pub fn abandon(&mut self) {
        if self.phase != Phase::Finished {
            self.phase = Phase::Abandoned;
        }
    }

    fn phase_at(&self, elapsed: Duration) -> Phase {
        let interval = self.tuning.interval.as_nanos();
        if interval == 0 || (elapsed.as_nanos() / interval) % 2 == 0 {
            Phase::Low
        } else {
            Phase::High
        }
    }

    fn emit(&self, phase: Phase, out: &mut Vec<Command>) {
        let factor = match phase {
            Phase::Low => self.tuning.alpha_low,
            _ => 1.0,
        };
        let alphas = self
            .base_alphas
            .iter()
            .map(|base| base * factor)
            .collect();
        out.push(Command::SetEntityAlpha {
            entity: self.target,
            alphas,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning(duration_ms: u64, interval_ms: u64) -> BlinkTuning {
        BlinkTuning {
            duration: Duration::from_millis(duration_ms),
            interval: Duration::from_millis(interval_ms),
            alpha_low: 0.5,
        }
    }

    fn alphas(command: &Command) -> Vec<f32> {
        match command {
            Command::SetEntityAlpha { alphas, .. } => alphas.clone(),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn starts_low_and_toggles_each_interval() {
        let mut blink = BlinkEffect::new(EntityId::new(1), vec![0.8, 1.0], tuning(1_000, 100));
        let mut out = Vec::new();

        assert_eq!(blink.start(&mut out), BlinkStatus::Running);
        assert_eq!(alphas(&out[0]), vec![0.4, 0.5]);

        out.clear();
        let _ = blink.advance(Duration::from_millis(50), &mut out);
        assert!(out.is_empty(), "no toggle inside the first interval");

        let _ = blink.advance(Duration::from_millis(50), &mut out);
        assert_eq!(alphas(&out[0]), vec![0.8, 1.0]);

        out.clear();
        let _ = blink.advance(Duration::from_millis(100), &mut out);
        assert_eq!(alphas(&out[0]), vec![0.4, 0.5]);
    }

    #[test]
    fn zero_duration_never_dims() {
        let mut blink = BlinkEffect::new(EntityId::new(2), vec![1.0], tuning(0, 100));
        let mut out = Vec::new();

        assert_eq!(blink.start(&mut out), BlinkStatus::Finished);
        assert!(out.is_empty());
    }

    #[test]
    fn abandon_suppresses_restoration() {
        let mut blink = BlinkEffect::new(EntityId::new(3), vec![1.0], tuning(500, 100));
        let mut out = Vec::new();
        let _ = blink.start(&mut out);
        out.clear();

        blink.abandon();
        blink.finish(&mut out);
        let _ = blink.advance(Duration::from_secs(1), &mut out);

        assert!(out.is_empty());
        assert_eq!(blink.status(), BlinkStatus::Abandoned);
    }

    #[test]
    fn early_finish_restores_base() {
        let mut blink = BlinkEffect::new(EntityId::new(4), vec![0.6], tuning(500, 100));
        let mut out = Vec::new();
        let _ = blink.start(&mut out);
        out.clear();

        blink.finish(&mut out);

        assert_eq!(alphas(&out[0]), vec![0.6]);
        assert_eq!(blink.status(), BlinkStatus::Finished);
    }
}

//! Read-only views onto systems outside the ability/sabotage core
//!
//! Coordinators receive these at construction and only ever query them.
//! The in-process implementations below are what the server binary runs
//! with; tests substitute their own.

use dashmap::DashSet;
use log::info;
use shared::{MatchPhase, PlayerId};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

pub trait MatchPhaseGate: Send + Sync {
    fn current_phase(&self) -> MatchPhase;
}

pub trait AliveStateProvider: Send + Sync {
    fn is_dead(&self, player_id: PlayerId) -> bool;
}

/// Integrity pool of a structure that sabotage can damage.
pub trait Health: fmt::Debug + Send + Sync {
    fn take_damage(&mut self, amount: i32);
    fn current_health(&self) -> i32;
}

/// Phase value shared between the round lifecycle and the coordinators.
#[derive(Debug)]
pub struct SharedPhase {
    phase: AtomicU8,
}

impl SharedPhase {
    pub fn new(phase: MatchPhase) -> Self {
        Self {
            phase: AtomicU8::new(phase.to_u8()),
        }
    }

    pub fn set(&self, phase: MatchPhase) {
        self.phase.store(phase.to_u8(), Ordering::Release);
    }
}

impl MatchPhaseGate for SharedPhase {
    fn current_phase(&self) -> MatchPhase {
        MatchPhase::from_u8(self.phase.load(Ordering::Acquire)).unwrap_or(MatchPhase::Waiting)
    }
}

/// Players currently dead. Everyone else counts as alive.
#[derive(Debug, Default)]
pub struct AliveRoster {
    dead: DashSet<PlayerId>,
}

impl AliveRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dead(&self, player_id: PlayerId, dead: bool) {
        if dead {
            self.dead.insert(player_id);
        } else {
            self.dead.remove(&player_id);
        }
    }

    pub fn revive_all(&self) {
        self.dead.clear();
    }

    pub fn forget(&self, player_id: PlayerId) {
        self.dead.remove(&player_id);
    }
}

impl AliveStateProvider for AliveRoster {
    fn is_dead(&self, player_id: PlayerId) -> bool {
        self.dead.contains(&player_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseDurations {
    pub build: f32,
    pub combat: f32,
    pub round_end: f32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            build: 60.0,
            combat: 180.0,
            round_end: 10.0,
        }
    }
}

/// Minimal round clock: Waiting until started, then Build → Combat →
/// RoundEnd on a loop.
#[derive(Debug)]
pub struct PhaseSchedule {
    durations: PhaseDurations,
    phase: MatchPhase,
    remaining: f32,
}

impl PhaseSchedule {
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            durations,
            phase: MatchPhase::Waiting,
            remaining: 0.0,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Leaves Waiting and enters Build. Returns the new phase if it changed.
    pub fn start(&mut self) -> Option<MatchPhase> {
        if self.phase != MatchPhase::Waiting {
            return None;
        }
        Some(self.enter(MatchPhase::Build))
    }

    /// Forces a phase, resetting its countdown.
    pub fn force(&mut self, phase: MatchPhase) -> MatchPhase {
        self.enter(phase)
    }

    /// Advances the countdown; returns the phase entered this tick, if any.
    pub fn advance(&mut self, dt: f32) -> Option<MatchPhase> {
        if self.phase == MatchPhase::Waiting {
            return None;
        }

        self.remaining -= dt;
        if self.remaining > 0.0 {
            return None;
        }

        let next = match self.phase {
            MatchPhase::Build => MatchPhase::Combat,
            MatchPhase::Combat => MatchPhase::RoundEnd,
            MatchPhase::RoundEnd | MatchPhase::Waiting => MatchPhase::Build,
        };
        Some(self.enter(next))
    }

    fn enter(&mut self, phase: MatchPhase) -> MatchPhase {
        self.phase = phase;
        self.remaining = match phase {
            MatchPhase::Waiting => 0.0,
            MatchPhase::Build => self.durations.build,
            MatchPhase::Combat => self.durations.combat,
            MatchPhase::RoundEnd => self.durations.round_end,
        };
        info!("Entering {} phase ({:.0}s)", phase, self.remaining);
        phase
    }
}

/// Hit points of a placed structure.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureHealth {
    current: i32,
    max: i32,
}

impl StructureHealth {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn max_health(&self) -> i32 {
        self.max
    }
}

impl Health for StructureHealth {
    fn take_damage(&mut self, amount: i32) {
        self.current = (self.current - amount.max(0)).max(0);
    }

    fn current_health(&self) -> i32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_phase_roundtrip() {
        let phase = SharedPhase::new(MatchPhase::Build);
        assert_eq!(phase.current_phase(), MatchPhase::Build);
        phase.set(MatchPhase::Combat);
        assert_eq!(phase.current_phase(), MatchPhase::Combat);
    }

    #[test]
    fn test_alive_roster() {
        let roster = AliveRoster::new();
        assert!(!roster.is_dead(1));

        roster.set_dead(1, true);
        assert!(roster.is_dead(1));
        assert!(!roster.is_dead(2));

        roster.set_dead(1, false);
        assert!(!roster.is_dead(1));

        roster.set_dead(2, true);
        roster.set_dead(3, true);
        roster.revive_all();
        assert!(!roster.is_dead(2));
        assert!(!roster.is_dead(3));
    }

    #[test]
    fn test_schedule_waits_until_started() {
        let mut schedule = PhaseSchedule::new(PhaseDurations::default());
        assert_eq!(schedule.advance(1000.0), None);
        assert_eq!(schedule.phase(), MatchPhase::Waiting);

        assert_eq!(schedule.start(), Some(MatchPhase::Build));
        assert_eq!(schedule.start(), None);
    }

    #[test]
    fn test_schedule_cycles_phases() {
        let mut schedule = PhaseSchedule::new(PhaseDurations {
            build: 2.0,
            combat: 3.0,
            round_end: 1.0,
        });
        schedule.start();

        assert_eq!(schedule.advance(1.0), None);
        assert_eq!(schedule.advance(1.0), Some(MatchPhase::Combat));
        assert_eq!(schedule.advance(2.0), None);
        assert_eq!(schedule.advance(1.0), Some(MatchPhase::RoundEnd));
        assert_eq!(schedule.advance(1.0), Some(MatchPhase::Build));
    }

    #[test]
    fn test_schedule_force() {
        let mut schedule = PhaseSchedule::new(PhaseDurations::default());
        schedule.force(MatchPhase::Combat);
        assert_eq!(schedule.phase(), MatchPhase::Combat);
        assert_eq!(schedule.remaining(), PhaseDurations::default().combat);
    }

    #[test]
    fn test_structure_health_floors_at_zero() {
        let mut health = StructureHealth::new(100);
        health.take_damage(30);
        assert_eq!(health.current_health(), 70);
        health.take_damage(-5);
        assert_eq!(health.current_health(), 70);
        health.take_damage(500);
        assert_eq!(health.current_health(), 0);
        assert_eq!(health.max_health(), 100);
    }
}

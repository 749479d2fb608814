//! Sabotageable targets and their timed auto-recovery
//!
//! A target is either a trap or a structure owned by one team. Disabling it
//! applies a functional side effect and schedules its own re-enable through
//! the shared [`TimerRegistry`]. The handle is kept on the entity so that
//! destroying the target cancels the pending re-enable instead of leaving it
//! to fire against a missing entity.

use crate::collaborators::Health;
use crate::timer::{TimerHandle, TimerRegistry};
use log::{debug, info};
use shared::{
    can_be_sabotaged, Broadcast, Candidate, Position, TargetId, TargetKind, TargetSnapshot, Team,
};
use std::collections::BTreeMap;

/// What a target does while it is enabled.
#[derive(Debug)]
pub enum Functionality {
    Trap { armed: bool },
    Structure { health: Box<dyn Health> },
}

#[derive(Debug)]
pub struct SabotageableEntity {
    id: TargetId,
    owner: Team,
    position: Position,
    is_disabled: bool,
    functionality: Functionality,
    reenable: Option<TimerHandle>,
}

impl SabotageableEntity {
    pub fn trap(id: TargetId, owner: Team, position: Position) -> Self {
        Self::new(id, owner, position, Functionality::Trap { armed: true })
    }

    pub fn structure(
        id: TargetId,
        owner: Team,
        position: Position,
        health: Box<dyn Health>,
    ) -> Self {
        Self::new(id, owner, position, Functionality::Structure { health })
    }

    fn new(id: TargetId, owner: Team, position: Position, functionality: Functionality) -> Self {
        Self {
            id,
            owner,
            position,
            is_disabled: false,
            functionality,
            reenable: None,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn owner(&self) -> Team {
        self.owner
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_disabled(&self) -> bool {
        self.is_disabled
    }

    pub fn kind(&self) -> TargetKind {
        match self.functionality {
            Functionality::Trap { .. } => TargetKind::Trap,
            Functionality::Structure { .. } => TargetKind::Structure,
        }
    }

    /// Whether the trap would currently trigger. Structures are never armed.
    pub fn is_armed(&self) -> bool {
        matches!(self.functionality, Functionality::Trap { armed: true })
    }

    pub fn structure_health(&self) -> Option<i32> {
        match &self.functionality {
            Functionality::Structure { health } => Some(health.current_health()),
            Functionality::Trap { .. } => None,
        }
    }

    pub fn reenable_handle(&self) -> Option<TimerHandle> {
        self.reenable
    }

    pub fn can_be_sabotaged(&self, requester: Team) -> bool {
        can_be_sabotaged(self.is_disabled, self.owner, requester)
    }

    /// Disables the target for `duration` seconds.
    ///
    /// Returns false without touching anything if the target is already
    /// disabled: no side effect, no broadcast, no second timer.
    pub fn disable(
        &mut self,
        duration: f32,
        timers: &mut TimerRegistry<TargetId>,
        outbox: &mut Vec<Broadcast>,
    ) -> bool {
        if self.is_disabled {
            debug!("Target {} already disabled, ignoring", self.id);
            return false;
        }

        self.is_disabled = true;
        match &mut self.functionality {
            Functionality::Trap { armed } => *armed = false,
            Functionality::Structure { health } => {
                let damage = health.current_health() / 2;
                health.take_damage(damage);
            }
        }

        self.reenable = Some(timers.schedule(duration, self.id));
        info!("Target {} disabled for {:.1}s", self.id, duration);
        outbox.push(Broadcast::TargetDisabled { target_id: self.id });
        true
    }

    /// Re-enables the target immediately, cancelling any scheduled re-enable.
    pub fn enable(
        &mut self,
        timers: &mut TimerRegistry<TargetId>,
        outbox: &mut Vec<Broadcast>,
    ) -> bool {
        if let Some(handle) = self.reenable.take() {
            timers.cancel(handle);
        }
        self.restore(outbox)
    }

    /// Handles a fired re-enable timer. Ignores handles this entity no longer
    /// owns.
    pub fn on_reenable_timer(
        &mut self,
        handle: TimerHandle,
        outbox: &mut Vec<Broadcast>,
    ) -> bool {
        if self.reenable != Some(handle) {
            return false;
        }
        self.reenable = None;
        self.restore(outbox)
    }

    /// Cancels scheduled work ahead of destruction.
    pub fn teardown(&mut self, timers: &mut TimerRegistry<TargetId>) {
        if let Some(handle) = self.reenable.take() {
            timers.cancel(handle);
        }
    }

    fn restore(&mut self, outbox: &mut Vec<Broadcast>) -> bool {
        if !self.is_disabled {
            return false;
        }

        self.is_disabled = false;
        if let Functionality::Trap { armed } = &mut self.functionality {
            *armed = true;
        }

        info!("Target {} re-enabled", self.id);
        outbox.push(Broadcast::TargetEnabled { target_id: self.id });
        true
    }

    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: self.id,
            position: self.position,
            owner: self.owner,
            is_disabled: self.is_disabled,
        }
    }

    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            id: self.id,
            kind: self.kind(),
            owner: self.owner,
            position: self.position,
            is_disabled: self.is_disabled,
        }
    }
}

/// Every live target plus the timers that re-enable them.
///
/// Targets are keyed by id in ascending order, which is also their spawn
/// order; target selection relies on that for its tie-break.
#[derive(Debug)]
pub struct Targets {
    entities: BTreeMap<TargetId, SabotageableEntity>,
    timers: TimerRegistry<TargetId>,
    next_id: TargetId,
}

impl Targets {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            timers: TimerRegistry::new(),
            next_id: 1,
        }
    }

    pub fn next_id(&mut self) -> TargetId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_trap(&mut self, owner: Team, position: Position) -> TargetId {
        let id = self.next_id();
        self.insert(SabotageableEntity::trap(id, owner, position));
        id
    }

    pub fn spawn_structure(
        &mut self,
        owner: Team,
        position: Position,
        health: Box<dyn Health>,
    ) -> TargetId {
        let id = self.next_id();
        self.insert(SabotageableEntity::structure(id, owner, position, health));
        id
    }

    pub fn insert(&mut self, entity: SabotageableEntity) {
        self.next_id = self.next_id.max(entity.id() + 1);
        info!(
            "Spawned {:?} {} for {} at ({:.1}, {:.1})",
            entity.kind(),
            entity.id(),
            entity.owner(),
            entity.position().x,
            entity.position().y
        );
        if let Some(mut replaced) = self.entities.insert(entity.id(), entity) {
            replaced.teardown(&mut self.timers);
        }
    }

    /// Destroys a target, cancelling its pending re-enable first.
    pub fn destroy(&mut self, id: TargetId) -> Option<SabotageableEntity> {
        let mut entity = self.entities.remove(&id)?;
        entity.teardown(&mut self.timers);
        info!("Destroyed target {}", id);
        Some(entity)
    }

    pub fn get(&self, id: TargetId) -> Option<&SabotageableEntity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn disable(&mut self, id: TargetId, duration: f32, outbox: &mut Vec<Broadcast>) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => entity.disable(duration, &mut self.timers, outbox),
            None => false,
        }
    }

    pub fn enable(&mut self, id: TargetId, outbox: &mut Vec<Broadcast>) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => entity.enable(&mut self.timers, outbox),
            None => false,
        }
    }

    /// Advances re-enable timers. A fired timer whose target is gone is
    /// dropped without effect.
    pub fn tick(&mut self, dt: f32, outbox: &mut Vec<Broadcast>) {
        for (handle, target_id) in self.timers.advance(dt) {
            match self.entities.get_mut(&target_id) {
                Some(entity) => {
                    entity.on_reenable_timer(handle, outbox);
                }
                None => debug!("Re-enable timer fired for missing target {}", target_id),
            }
        }
    }

    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.entities.values().map(SabotageableEntity::candidate)
    }

    pub fn snapshots(&self) -> Vec<TargetSnapshot> {
        self.entities.values().map(SabotageableEntity::snapshot).collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for Targets {
    fn default() -> Self {
        Self::new()
    }
}

//! Authoritative sabotage sessions
//!
//! A session binds one saboteur to one target, found with the same nearest
//! qualifying target search the client uses. Progress is driven by server
//! ticks only. A completion request marks the session; it resolves on the
//! first tick where authoritative progress has reached 1, re-validating the
//! target at that moment because another player may have disabled it in
//! the meantime.

use crate::collaborators::{AliveStateProvider, MatchPhaseGate};
use crate::target::Targets;
use log::{debug, info};
use shared::{
    select_target, Broadcast, PlayerId, Position, Rejection, Role, TargetId, Team,
    SABOTAGE_DISABLE_DURATION, SABOTAGE_INTERACT_DURATION, SABOTAGE_INTERACT_RADIUS,
    SABOTAGE_REVEAL_THRESHOLD,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabotageSettings {
    pub interact_duration: f32,
    pub interact_radius: f32,
    pub disable_duration: f32,
}

impl Default for SabotageSettings {
    fn default() -> Self {
        Self {
            interact_duration: SABOTAGE_INTERACT_DURATION,
            interact_radius: SABOTAGE_INTERACT_RADIUS,
            disable_duration: SABOTAGE_DISABLE_DURATION,
        }
    }
}

/// The player a request is acting for, as the world knows them right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actor {
    pub player_id: PlayerId,
    pub role: Role,
    pub team: Team,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabotageSession {
    pub target_id: TargetId,
    pub team: Team,
    pub elapsed: f32,
    pub progress: f32,
    pub is_interacting: bool,
    pub completion_requested: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Recorded; resolves once authoritative progress reaches 1.
    Pending,
    Succeeded,
}

/// A completion resolved during a tick rather than in direct response to
/// the request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredCompletion {
    pub player_id: PlayerId,
    pub target_id: TargetId,
    pub outcome: Result<(), Rejection>,
}

pub struct SabotageInteractionCoordinator {
    phase: Arc<dyn MatchPhaseGate>,
    alive: Arc<dyn AliveStateProvider>,
    settings: SabotageSettings,
    sessions: BTreeMap<PlayerId, SabotageSession>,
}

impl SabotageInteractionCoordinator {
    pub fn new(
        phase: Arc<dyn MatchPhaseGate>,
        alive: Arc<dyn AliveStateProvider>,
        settings: SabotageSettings,
    ) -> Self {
        Self {
            phase,
            alive,
            settings,
            sessions: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> SabotageSettings {
        self.settings
    }

    pub fn session(&self, player_id: PlayerId) -> Option<SabotageSession> {
        self.sessions.get(&player_id).copied()
    }

    pub fn is_interacting(&self, player_id: PlayerId) -> bool {
        self.sessions.contains_key(&player_id)
    }

    /// Current progress, 0 for players with no session.
    pub fn progress(&self, player_id: PlayerId) -> f32 {
        self.sessions
            .get(&player_id)
            .map(|session| session.progress)
            .unwrap_or(0.0)
    }

    pub fn request_start(
        &mut self,
        actor: &Actor,
        targets: &Targets,
    ) -> Result<TargetId, Rejection> {
        if actor.role != Role::Saboteur {
            return Err(Rejection::WrongRole(actor.role));
        }

        let phase = self.phase.current_phase();
        if !phase.allows_sabotage() {
            return Err(Rejection::WrongPhase(phase));
        }
        if self.alive.is_dead(actor.player_id) {
            return Err(Rejection::Dead);
        }
        if self.sessions.contains_key(&actor.player_id) {
            return Err(Rejection::AlreadyInteracting);
        }

        let target_id = select_target(
            actor.position,
            actor.team,
            self.settings.interact_radius,
            targets.candidates(),
        )
        .ok_or(Rejection::NoTarget)?;

        self.sessions.insert(
            actor.player_id,
            SabotageSession {
                target_id,
                team: actor.team,
                elapsed: 0.0,
                progress: 0.0,
                is_interacting: true,
                completion_requested: false,
            },
        );

        info!(
            "Player {} started sabotaging target {}",
            actor.player_id, target_id
        );
        Ok(target_id)
    }

    /// Ends the actor's session. Returns whether the saboteur was revealed.
    pub fn request_cancel(
        &mut self,
        actor: &Actor,
        outbox: &mut Vec<Broadcast>,
    ) -> Result<bool, Rejection> {
        let session = self
            .sessions
            .remove(&actor.player_id)
            .ok_or(Rejection::NotInteracting)?;

        let revealed = session.progress > SABOTAGE_REVEAL_THRESHOLD;
        if revealed {
            info!(
                "Player {} revealed after abandoning sabotage at {:.0}%",
                actor.player_id,
                session.progress * 100.0
            );
            outbox.push(Broadcast::SaboteurRevealed {
                player_id: actor.player_id,
                position: actor.position,
                team: actor.team,
            });
        } else {
            debug!(
                "Player {} cancelled sabotage of target {}",
                actor.player_id, session.target_id
            );
        }

        Ok(revealed)
    }

    /// Records a completion request, resolving it at once if progress is full.
    pub fn request_complete(
        &mut self,
        player_id: PlayerId,
        target_id: TargetId,
        targets: &mut Targets,
        outbox: &mut Vec<Broadcast>,
    ) -> Result<CompletionStatus, Rejection> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(Rejection::NotInteracting)?;

        if session.target_id != target_id {
            self.sessions.remove(&player_id);
            debug!(
                "Player {} asked to complete target {} but was bound to another, session ended",
                player_id, target_id
            );
            return Err(Rejection::TargetMismatch);
        }

        session.completion_requested = true;
        if session.progress < 1.0 {
            debug!(
                "Player {} asked to complete at {:.0}%, deferring",
                player_id,
                session.progress * 100.0
            );
            return Ok(CompletionStatus::Pending);
        }

        self.resolve(player_id, targets, outbox)
            .map(|_| CompletionStatus::Succeeded)
    }

    /// Advances every session and resolves the ones that are due.
    pub fn tick(
        &mut self,
        dt: f32,
        targets: &mut Targets,
        outbox: &mut Vec<Broadcast>,
    ) -> Vec<DeferredCompletion> {
        let duration = self.settings.interact_duration;
        let mut due = Vec::new();

        for (player_id, session) in self.sessions.iter_mut() {
            session.elapsed += dt;
            session.progress = if duration > 0.0 {
                (session.elapsed / duration).min(1.0)
            } else {
                1.0
            };

            if session.completion_requested && session.progress >= 1.0 {
                due.push(*player_id);
            }
        }

        due.into_iter()
            .filter_map(|player_id| {
                let target_id = self.sessions.get(&player_id)?.target_id;
                let outcome = self.resolve(player_id, targets, outbox).map(|_| ());
                Some(DeferredCompletion {
                    player_id,
                    target_id,
                    outcome,
                })
            })
            .collect()
    }

    /// Drops a session without resolving it, e.g. when the player leaves.
    pub fn end_session(&mut self, player_id: PlayerId) -> Option<SabotageSession> {
        self.sessions.remove(&player_id)
    }

    /// Drops every session without resolving or revealing. Used when the
    /// round leaves Combat.
    pub fn end_all_sessions(&mut self) -> usize {
        let ended = self.sessions.len();
        self.sessions.clear();
        ended
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn resolve(
        &mut self,
        player_id: PlayerId,
        targets: &mut Targets,
        outbox: &mut Vec<Broadcast>,
    ) -> Result<TargetId, Rejection> {
        let session = self
            .sessions
            .remove(&player_id)
            .ok_or(Rejection::NotInteracting)?;
        let target_id = session.target_id;

        let still_valid = targets
            .get(target_id)
            .map(|target| target.can_be_sabotaged(session.team))
            .unwrap_or(false);

        if !still_valid {
            debug!(
                "Player {} finished sabotage but target {} is no longer valid",
                player_id, target_id
            );
            outbox.push(Broadcast::SabotageResult {
                player_id,
                target_id,
                success: false,
            });
            return Err(Rejection::TargetUnavailable);
        }

        targets.disable(target_id, self.settings.disable_duration, outbox);
        info!("Player {} sabotaged target {}", player_id, target_id);
        outbox.push(Broadcast::SabotageResult {
            player_id,
            target_id,
            success: true,
        });
        Ok(target_id)
    }
}

//! Authoritative world: players, targets, both coordinators and the round clock
//!
//! Every mutation goes through [`GameState`] on the server tick task.
//! Broadcasts produced by any subsystem accumulate in one outbox and are
//! drained by the network layer after each step, in the order they were
//! produced.

use crate::ability::RoleAbilityCoordinator;
use crate::collaborators::{
    AliveRoster, MatchPhaseGate, PhaseSchedule, SharedPhase, StructureHealth,
};
use crate::config::GameConfig;
use crate::sabotage::{Actor, SabotageInteractionCoordinator};
use crate::target::Targets;
use log::{debug, info};
use shared::{
    Broadcast, MatchPhase, Packet, PlayerId, PlayerSnapshot, Position, Rejection, Request, Role,
    TargetId, Team,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ARENA_STRUCTURE_HEALTH: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRecord {
    pub role: Role,
    pub team: Team,
    pub position: Position,
}

/// A rejection that surfaced during a tick instead of as a direct reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredRejection {
    pub player_id: PlayerId,
    pub request: Request,
    pub reason: Rejection,
}

pub struct GameState {
    pub tick: u32,
    phase: Arc<SharedPhase>,
    schedule: PhaseSchedule,
    roster: Arc<AliveRoster>,
    players: BTreeMap<PlayerId, PlayerRecord>,
    abilities: RoleAbilityCoordinator,
    sabotage: SabotageInteractionCoordinator,
    targets: Targets,
    outbox: Vec<Broadcast>,
    deferred_rejections: Vec<DeferredRejection>,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let phase = Arc::new(SharedPhase::new(MatchPhase::Waiting));
        let roster = Arc::new(AliveRoster::new());

        let abilities =
            RoleAbilityCoordinator::new(phase.clone(), roster.clone(), config.abilities.clone());
        let sabotage =
            SabotageInteractionCoordinator::new(phase.clone(), roster.clone(), config.sabotage);

        Self {
            tick: 0,
            phase,
            schedule: PhaseSchedule::new(config.phases),
            roster,
            players: BTreeMap::new(),
            abilities,
            sabotage,
            targets: Targets::new(),
            outbox: Vec::new(),
            deferred_rejections: Vec::new(),
        }
    }

    /// A world with each team's traps and structure already placed.
    pub fn with_arena(config: &GameConfig) -> Self {
        let mut state = Self::new(config);
        state.spawn_arena();
        state
    }

    fn spawn_arena(&mut self) {
        for (team, side) in [(Team::TeamA, -1.0), (Team::TeamB, 1.0)] {
            self.targets.spawn_trap(team, Position::new(side * 6.0, 3.0));
            self.targets.spawn_trap(team, Position::new(side * 6.0, -3.0));
            self.targets.spawn_structure(
                team,
                Position::new(side * 9.0, 0.0),
                Box::new(StructureHealth::new(ARENA_STRUCTURE_HEALTH)),
            );
        }
        self.targets.spawn_trap(Team::Neutral, Position::new(0.0, 0.0));
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase.current_phase()
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn abilities(&self) -> &RoleAbilityCoordinator {
        &self.abilities
    }

    pub fn abilities_mut(&mut self) -> &mut RoleAbilityCoordinator {
        &mut self.abilities
    }

    pub fn sabotage(&self) -> &SabotageInteractionCoordinator {
        &self.sabotage
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut Targets {
        &mut self.targets
    }

    /// Adds a player and starts the round clock if it was waiting.
    pub fn add_player(&mut self, player_id: PlayerId, role: Role, team: Team) {
        let position = spawn_position(team, player_id);
        self.players.insert(
            player_id,
            PlayerRecord {
                role,
                team,
                position,
            },
        );
        self.abilities.register_player(player_id, role);

        info!(
            "Added {} player {} for {} at ({:.1}, {:.1})",
            role, player_id, team, position.x, position.y
        );
        self.outbox.push(Broadcast::PlayerJoined {
            player_id,
            role,
            team,
        });

        if let Some(phase) = self.schedule.start() {
            self.enter_phase(phase);
        }
    }

    /// Removes a player, dropping their sabotage session and ability state
    /// without resolving either.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        if self.players.remove(player_id).is_none() {
            return false;
        }

        if self.sabotage.end_session(*player_id).is_some() {
            debug!("Dropped sabotage session of leaving player {}", player_id);
        }
        self.abilities.remove_player(*player_id);
        self.roster.forget(*player_id);

        info!("Removed player {}", player_id);
        self.outbox.push(Broadcast::PlayerLeft {
            player_id: *player_id,
        });
        true
    }

    pub fn set_position(&mut self, player_id: PlayerId, position: Position) -> bool {
        match self.players.get_mut(&player_id) {
            Some(player) => {
                player.position = position;
                true
            }
            None => false,
        }
    }

    /// Marks a player dead or alive. Dying ends any sabotage in progress.
    pub fn set_player_dead(&mut self, player_id: PlayerId, dead: bool) {
        self.roster.set_dead(player_id, dead);
        if dead && self.sabotage.end_session(player_id).is_some() {
            debug!("Player {} died mid-sabotage", player_id);
        }
    }

    pub fn force_phase(&mut self, phase: MatchPhase) {
        let phase = self.schedule.force(phase);
        self.enter_phase(phase);
    }

    fn enter_phase(&mut self, phase: MatchPhase) {
        self.phase.set(phase);

        if !phase.allows_sabotage() {
            let ended = self.sabotage.end_all_sessions();
            if ended > 0 {
                debug!("Ended {} sabotage sessions on leaving Combat", ended);
            }
        }
        if phase == MatchPhase::Build {
            self.roster.revive_all();
        }

        self.outbox.push(Broadcast::PhaseChanged { phase });
    }

    pub fn destroy_target(&mut self, target_id: TargetId) -> bool {
        self.targets.destroy(target_id).is_some()
    }

    /// Validates and applies one request on behalf of `player_id`.
    pub fn apply_request(
        &mut self,
        player_id: PlayerId,
        request: Request,
    ) -> Result<(), Rejection> {
        let player = *self
            .players
            .get(&player_id)
            .ok_or(Rejection::UnknownPlayer)?;
        let actor = Actor {
            player_id,
            role: player.role,
            team: player.team,
            position: player.position,
        };

        let result = match request {
            Request::ActivateAbility => self
                .abilities
                .request_activate(player_id, &mut self.outbox)
                .map(|_| ()),
            Request::SabotageStart => self
                .sabotage
                .request_start(&actor, &self.targets)
                .map(|_| ()),
            Request::SabotageCancel => self
                .sabotage
                .request_cancel(&actor, &mut self.outbox)
                .map(|_| ()),
            Request::SabotageComplete { target_id } => self
                .sabotage
                .request_complete(player_id, target_id, &mut self.targets, &mut self.outbox)
                .map(|_| ()),
        };

        if let Err(reason) = &result {
            debug!(
                "Rejected {:?} from player {}: {}",
                request, player_id, reason
            );
        }
        result
    }

    /// Advances the world by one tick of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.tick += 1;

        if let Some(phase) = self.schedule.advance(dt) {
            self.enter_phase(phase);
        }

        self.abilities.tick(dt, &mut self.outbox);
        self.targets.tick(dt, &mut self.outbox);

        let resolved = self.sabotage.tick(dt, &mut self.targets, &mut self.outbox);
        for completion in resolved {
            if let Err(reason) = completion.outcome {
                self.deferred_rejections.push(DeferredRejection {
                    player_id: completion.player_id,
                    request: Request::SabotageComplete {
                        target_id: completion.target_id,
                    },
                    reason,
                });
            }
        }
    }

    pub fn drain_broadcasts(&mut self) -> Vec<Broadcast> {
        std::mem::take(&mut self.outbox)
    }

    pub fn drain_rejections(&mut self) -> Vec<DeferredRejection> {
        std::mem::take(&mut self.deferred_rejections)
    }

    /// Full world state for a newly connected client.
    pub fn snapshot(&self) -> Packet {
        let players = self
            .players
            .iter()
            .map(|(id, player)| {
                let ability = self.abilities.state(*id);
                PlayerSnapshot {
                    id: *id,
                    role: player.role,
                    team: player.team,
                    position: player.position,
                    ability_active: ability.map(|a| a.is_active).unwrap_or(false),
                    cooldown_remaining: ability.map(|a| a.cooldown_remaining).unwrap_or(0.0),
                }
            })
            .collect();

        Packet::WorldSnapshot {
            phase: self.phase(),
            players,
            targets: self.targets.snapshots(),
        }
    }
}

fn spawn_position(team: Team, player_id: PlayerId) -> Position {
    let x = match team {
        Team::TeamA => -10.0,
        Team::TeamB => 10.0,
        Team::Neutral => 0.0,
    };
    let y = (player_id % 5) as f32 * 2.0 - 4.0;
    Position::new(x, y)
}

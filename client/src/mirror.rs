//! Read-only mirror of authoritative state, built from snapshots and broadcasts
//!
//! The mirror never decides anything. Applying the same broadcast twice
//! leaves it unchanged, so duplicated datagrams are harmless.

use shared::{
    AbilityTable, Broadcast, Candidate, MatchPhase, PlayerId, PlayerSnapshot, Position, Role,
    TargetId, TargetSnapshot, Team,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MirroredPlayer {
    pub role: Role,
    pub team: Team,
    pub ability_active: bool,
    /// Display-only countdown, decayed locally between broadcasts.
    pub cooldown_remaining: f32,
    /// Where the player was last revealed, if ever.
    pub revealed_at: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SabotageOutcome {
    pub player_id: PlayerId,
    pub target_id: TargetId,
    pub success: bool,
}

#[derive(Debug)]
pub struct ClientMirror {
    phase: MatchPhase,
    players: BTreeMap<PlayerId, MirroredPlayer>,
    targets: BTreeMap<TargetId, TargetSnapshot>,
    table: AbilityTable,
    last_outcome: Option<SabotageOutcome>,
}

impl ClientMirror {
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::Waiting,
            players: BTreeMap::new(),
            targets: BTreeMap::new(),
            table: AbilityTable::standard(),
            last_outcome: None,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&MirroredPlayer> {
        self.players.get(&player_id)
    }

    pub fn target(&self, target_id: TargetId) -> Option<&TargetSnapshot> {
        self.targets.get(&target_id)
    }

    pub fn players(&self) -> impl Iterator<Item = (&PlayerId, &MirroredPlayer)> {
        self.players.iter()
    }

    pub fn targets(&self) -> impl Iterator<Item = &TargetSnapshot> {
        self.targets.values()
    }

    pub fn last_outcome(&self) -> Option<SabotageOutcome> {
        self.last_outcome
    }

    /// Candidates for local target discovery, in the server's id order.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.targets.values().map(|target| Candidate {
            id: target.id,
            position: target.position,
            owner: target.owner,
            is_disabled: target.is_disabled,
        })
    }

    /// Replaces everything with a full world snapshot.
    pub fn apply_snapshot(
        &mut self,
        phase: MatchPhase,
        players: Vec<PlayerSnapshot>,
        targets: Vec<TargetSnapshot>,
    ) {
        self.phase = phase;
        self.players = players
            .into_iter()
            .map(|player| {
                (
                    player.id,
                    MirroredPlayer {
                        role: player.role,
                        team: player.team,
                        ability_active: player.ability_active,
                        cooldown_remaining: player.cooldown_remaining,
                        revealed_at: None,
                    },
                )
            })
            .collect();
        self.targets = targets.into_iter().map(|target| (target.id, target)).collect();
    }

    /// Applies one broadcast. Returns whether anything changed.
    pub fn apply(&mut self, broadcast: &Broadcast) -> bool {
        match *broadcast {
            Broadcast::PlayerJoined {
                player_id,
                role,
                team,
            } => {
                if self.players.contains_key(&player_id) {
                    return false;
                }
                self.players.insert(
                    player_id,
                    MirroredPlayer {
                        role,
                        team,
                        ability_active: false,
                        cooldown_remaining: 0.0,
                        revealed_at: None,
                    },
                );
                true
            }
            Broadcast::PlayerLeft { player_id } => self.players.remove(&player_id).is_some(),
            Broadcast::PhaseChanged { phase } => {
                let changed = self.phase != phase;
                self.phase = phase;
                changed
            }
            Broadcast::AbilityActivated { player_id, role } => {
                let cooldown = self
                    .table
                    .lookup(role)
                    .unwrap_or_else(|| self.table.fallback())
                    .cooldown;
                match self.players.get_mut(&player_id) {
                    Some(player) if !player.ability_active => {
                        player.ability_active = true;
                        player.cooldown_remaining = cooldown;
                        true
                    }
                    _ => false,
                }
            }
            Broadcast::AbilityDeactivated { player_id } => match self.players.get_mut(&player_id) {
                Some(player) if player.ability_active => {
                    player.ability_active = false;
                    true
                }
                _ => false,
            },
            Broadcast::SabotageResult {
                player_id,
                target_id,
                success,
            } => {
                let outcome = SabotageOutcome {
                    player_id,
                    target_id,
                    success,
                };
                let changed = self.last_outcome != Some(outcome);
                self.last_outcome = Some(outcome);
                changed
            }
            Broadcast::SaboteurRevealed {
                player_id,
                position,
                ..
            } => match self.players.get_mut(&player_id) {
                Some(player) if player.revealed_at != Some(position) => {
                    player.revealed_at = Some(position);
                    true
                }
                _ => false,
            },
            Broadcast::TargetDisabled { target_id } => self.set_disabled(target_id, true),
            Broadcast::TargetEnabled { target_id } => self.set_disabled(target_id, false),
        }
    }

    fn set_disabled(&mut self, target_id: TargetId, disabled: bool) -> bool {
        match self.targets.get_mut(&target_id) {
            Some(target) if target.is_disabled != disabled => {
                target.is_disabled = disabled;
                true
            }
            _ => false,
        }
    }

    /// Decays the displayed cooldowns.
    pub fn tick(&mut self, dt: f32) {
        for player in self.players.values_mut() {
            player.cooldown_remaining = (player.cooldown_remaining - dt).max(0.0);
        }
    }
}

impl Default for ClientMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{TargetKind, RANGER_REVEAL_SHOT_COOLDOWN};

    fn target(id: TargetId, owner: Team) -> TargetSnapshot {
        TargetSnapshot {
            id,
            kind: TargetKind::Trap,
            owner,
            position: Position::new(id as f32, 0.0),
            is_disabled: false,
        }
    }

    fn mirror() -> ClientMirror {
        let mut mirror = ClientMirror::new();
        mirror.apply_snapshot(
            MatchPhase::Combat,
            vec![PlayerSnapshot {
                id: 1,
                role: Role::Ranger,
                team: Team::TeamA,
                position: Position::new(-10.0, 0.0),
                ability_active: false,
                cooldown_remaining: 0.0,
            }],
            vec![target(1, Team::TeamB), target(2, Team::TeamA)],
        );
        mirror
    }

    #[test]
    fn test_snapshot_replaces_state() {
        let mirror = mirror();
        assert_eq!(mirror.phase(), MatchPhase::Combat);
        assert_eq!(mirror.player(1).unwrap().role, Role::Ranger);
        let ids: Vec<TargetId> = mirror.candidates().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_broadcasts_are_idempotent() {
        let mut mirror = mirror();
        let broadcasts = [
            Broadcast::TargetDisabled { target_id: 1 },
            Broadcast::AbilityActivated {
                player_id: 1,
                role: Role::Ranger,
            },
            Broadcast::PhaseChanged {
                phase: MatchPhase::RoundEnd,
            },
            Broadcast::SaboteurRevealed {
                player_id: 1,
                position: Position::new(2.0, 2.0),
                team: Team::TeamA,
            },
        ];

        for broadcast in &broadcasts {
            assert!(mirror.apply(broadcast));
        }
        for broadcast in &broadcasts {
            assert!(!mirror.apply(broadcast));
        }

        assert!(mirror.target(1).unwrap().is_disabled);
        assert_eq!(mirror.phase(), MatchPhase::RoundEnd);
        assert_eq!(
            mirror.player(1).unwrap().revealed_at,
            Some(Position::new(2.0, 2.0))
        );
    }

    #[test]
    fn test_duplicate_activation_keeps_cooldown_decay() {
        let mut mirror = mirror();
        let activated = Broadcast::AbilityActivated {
            player_id: 1,
            role: Role::Ranger,
        };
        mirror.apply(&activated);
        assert_eq!(
            mirror.player(1).unwrap().cooldown_remaining,
            RANGER_REVEAL_SHOT_COOLDOWN
        );

        mirror.tick(5.0);
        mirror.apply(&activated);
        assert_eq!(
            mirror.player(1).unwrap().cooldown_remaining,
            RANGER_REVEAL_SHOT_COOLDOWN - 5.0
        );

        mirror.apply(&Broadcast::AbilityDeactivated { player_id: 1 });
        assert!(!mirror.player(1).unwrap().ability_active);
    }

    #[test]
    fn test_join_and_leave() {
        let mut mirror = mirror();
        let joined = Broadcast::PlayerJoined {
            player_id: 2,
            role: Role::Saboteur,
            team: Team::TeamB,
        };
        assert!(mirror.apply(&joined));
        assert!(!mirror.apply(&joined));

        assert!(mirror.apply(&Broadcast::PlayerLeft { player_id: 2 }));
        assert!(!mirror.apply(&Broadcast::PlayerLeft { player_id: 2 }));
        assert!(mirror.player(2).is_none());
    }

    #[test]
    fn test_unknown_target_ignored() {
        let mut mirror = mirror();
        assert!(!mirror.apply(&Broadcast::TargetEnabled { target_id: 99 }));
    }

    #[test]
    fn test_sabotage_result_recorded() {
        let mut mirror = mirror();
        let result = Broadcast::SabotageResult {
            player_id: 3,
            target_id: 1,
            success: true,
        };
        assert!(mirror.apply(&result));
        assert!(!mirror.apply(&result));
        assert_eq!(
            mirror.last_outcome(),
            Some(SabotageOutcome {
                player_id: 3,
                target_id: 1,
                success: true
            })
        );
    }
}

use crate::types::{MatchPhase, PlayerId, Position, Role, TargetId, Team};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Player intents sent client → server.
///
/// The acting player is never part of the payload: the server binds it from
/// the address the datagram arrived on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ActivateAbility,
    SabotageStart,
    SabotageCancel,
    SabotageComplete { target_id: TargetId },
}

/// Authoritative state changes fanned out server → all observers.
///
/// Receivers apply these by overwriting flags, so a duplicated delivery is
/// harmless.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Broadcast {
    PlayerJoined {
        player_id: PlayerId,
        role: Role,
        team: Team,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PhaseChanged {
        phase: MatchPhase,
    },
    AbilityActivated {
        player_id: PlayerId,
        role: Role,
    },
    AbilityDeactivated {
        player_id: PlayerId,
    },
    /// Outcome of a resolved completion. `success` is false when the bound
    /// target stopped qualifying before resolution; the requester also gets
    /// a `Rejected` reply for it.
    SabotageResult {
        player_id: PlayerId,
        target_id: TargetId,
        success: bool,
    },
    SaboteurRevealed {
        player_id: PlayerId,
        position: Position,
        team: Team,
    },
    TargetDisabled {
        target_id: TargetId,
    },
    TargetEnabled {
        target_id: TargetId,
    },
}

/// Why the authority refused a request. Refusal never changes state.
#[derive(Debug, Error, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("ability is cooling down")]
    OnCooldown,
    #[error("ability is already active")]
    AlreadyActive,
    #[error("not allowed during the {0} phase")]
    WrongPhase(MatchPhase),
    #[error("player is dead")]
    Dead,
    #[error("{0} cannot sabotage")]
    WrongRole(Role),
    #[error("no sabotageable target in range")]
    NoTarget,
    #[error("already sabotaging a target")]
    AlreadyInteracting,
    #[error("no sabotage in progress")]
    NotInteracting,
    #[error("sabotage in progress on a different target")]
    TargetMismatch,
    #[error("target can no longer be sabotaged")]
    TargetUnavailable,
    #[error("unknown player")]
    UnknownPlayer,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Trap,
    Structure,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TargetSnapshot {
    pub id: TargetId,
    pub kind: TargetKind,
    pub owner: Team,
    pub position: Position,
    pub is_disabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub role: Role,
    pub team: Team,
    pub position: Position,
    pub ability_active: bool,
    pub cooldown_remaining: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        role: Role,
        team: Team,
    },
    Position {
        x: f32,
        y: f32,
    },
    Request(Request),
    Disconnect,

    Connected {
        client_id: PlayerId,
    },
    WorldSnapshot {
        phase: MatchPhase,
        players: Vec<PlayerSnapshot>,
        targets: Vec<TargetSnapshot>,
    },
    Broadcast(Broadcast),
    Rejected {
        request: Request,
        reason: Rejection,
    },
    Disconnected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect {
            client_version: 42,
            role: Role::Saboteur,
            team: Team::TeamB,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Connect {
                client_version,
                role,
                team,
            } => {
                assert_eq!(client_version, 42);
                assert_eq!(role, Role::Saboteur);
                assert_eq!(team, Team::TeamB);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_world_snapshot() {
        let packet = Packet::WorldSnapshot {
            phase: MatchPhase::Combat,
            players: vec![PlayerSnapshot {
                id: 3,
                role: Role::Ranger,
                team: Team::TeamA,
                position: Position::new(-10.0, 0.0),
                ability_active: true,
                cooldown_remaining: 12.5,
            }],
            targets: vec![TargetSnapshot {
                id: 7,
                kind: TargetKind::Structure,
                owner: Team::TeamB,
                position: Position::new(4.0, 2.0),
                is_disabled: true,
            }],
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::WorldSnapshot {
                phase,
                players,
                targets,
            } => {
                assert_eq!(phase, MatchPhase::Combat);
                assert_eq!(players.len(), 1);
                assert!(players[0].ability_active);
                assert_eq!(targets[0].id, 7);
                assert_eq!(targets[0].kind, TargetKind::Structure);
                assert!(targets[0].is_disabled);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_rejection_carries_reason_over_the_wire() {
        let packet = Packet::Rejected {
            request: Request::SabotageStart,
            reason: Rejection::WrongPhase(MatchPhase::Build),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        match bincode::deserialize::<Packet>(&serialized).unwrap() {
            Packet::Rejected { request, reason } => {
                assert_eq!(request, Request::SabotageStart);
                assert_eq!(reason, Rejection::WrongPhase(MatchPhase::Build));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::WrongPhase(MatchPhase::RoundEnd).to_string(),
            "not allowed during the RoundEnd phase"
        );
        assert_eq!(
            Rejection::WrongRole(Role::Builder).to_string(),
            "Builder cannot sabotage"
        );
    }
}

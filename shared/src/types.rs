use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PlayerId = u32;
pub type TargetId = u32;

/// Combat role picked at join time. Each role owns exactly one timed ability.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Builder,
    Guardian,
    Ranger,
    Saboteur,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Builder, Role::Guardian, Role::Ranger, Role::Saboteur];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Builder => "Builder",
            Role::Guardian => "Guardian",
            Role::Ranger => "Ranger",
            Role::Saboteur => "Saboteur",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|role| role.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Team affiliation of a player or owner of a target.
///
/// `Neutral` marks targets nobody owns; any player may sabotage them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    TeamA,
    TeamB,
    Neutral,
}

impl Team {
    pub fn opponent(&self) -> Team {
        match self {
            Team::TeamA => Team::TeamB,
            Team::TeamB => Team::TeamA,
            Team::Neutral => Team::Neutral,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Team::TeamA => "Team A",
            Team::TeamB => "Team B",
            Team::Neutral => "Neutral",
        };
        f.write_str(name)
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "team-a" | "teama" => Ok(Team::TeamA),
            "b" | "team-b" | "teamb" => Ok(Team::TeamB),
            "neutral" => Ok(Team::Neutral),
            _ => Err(format!("unknown team '{}'", s)),
        }
    }
}

/// Stage of the current round, as reported by the round lifecycle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchPhase {
    Waiting,
    Build,
    Combat,
    RoundEnd,
}

impl MatchPhase {
    pub fn allows_abilities(&self) -> bool {
        matches!(self, MatchPhase::Build | MatchPhase::Combat)
    }

    pub fn allows_sabotage(&self) -> bool {
        matches!(self, MatchPhase::Combat)
    }

    /// Compact encoding used by lock-free phase holders.
    pub fn to_u8(self) -> u8 {
        match self {
            MatchPhase::Waiting => 0,
            MatchPhase::Build => 1,
            MatchPhase::Combat => 2,
            MatchPhase::RoundEnd => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<MatchPhase> {
        match value {
            0 => Some(MatchPhase::Waiting),
            1 => Some(MatchPhase::Build),
            2 => Some(MatchPhase::Combat),
            3 => Some(MatchPhase::RoundEnd),
            _ => None,
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchPhase::Waiting => "Waiting",
            MatchPhase::Build => "Build",
            MatchPhase::Combat => "Combat",
            MatchPhase::RoundEnd => "RoundEnd",
        };
        f.write_str(name)
    }
}

/// Ground-plane position in world units.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_parse_role_and_team() {
        assert_eq!("saboteur".parse::<Role>(), Ok(Role::Saboteur));
        assert_eq!(" Guardian ".parse::<Role>(), Ok(Role::Guardian));
        assert!("wizard".parse::<Role>().is_err());

        assert_eq!("a".parse::<Team>(), Ok(Team::TeamA));
        assert_eq!("Team-B".parse::<Team>(), Ok(Team::TeamB));
        assert!("c".parse::<Team>().is_err());
    }

    #[test]
    fn test_phase_gates() {
        assert!(MatchPhase::Build.allows_abilities());
        assert!(MatchPhase::Combat.allows_abilities());
        assert!(!MatchPhase::Waiting.allows_abilities());
        assert!(!MatchPhase::RoundEnd.allows_abilities());

        assert!(MatchPhase::Combat.allows_sabotage());
        assert!(!MatchPhase::Build.allows_sabotage());
    }

    #[test]
    fn test_phase_u8_encoding() {
        for phase in [
            MatchPhase::Waiting,
            MatchPhase::Build,
            MatchPhase::Combat,
            MatchPhase::RoundEnd,
        ] {
            assert_eq!(MatchPhase::from_u8(phase.to_u8()), Some(phase));
        }
        assert_eq!(MatchPhase::from_u8(42), None);
    }

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::TeamA.opponent(), Team::TeamB);
        assert_eq!(Team::TeamB.opponent(), Team::TeamA);
        assert_eq!(Team::Neutral.opponent(), Team::Neutral);
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_approx_eq!(a.distance_to(&b), 5.0, 1e-6);
        assert_approx_eq!(b.distance_to(&a), 5.0, 1e-6);
        assert_eq!(a.distance_to(&a), 0.0);
    }
}

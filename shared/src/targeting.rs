//! Sabotage target qualification and nearest-target selection.
//!
//! The client runs [`select_target`] continuously while idle to highlight a
//! candidate; the server runs the same function when a start request arrives,
//! so both sides agree on which target a session binds to.

use crate::types::{Position, TargetId, Team};

/// A target may be sabotaged when it is enabled and owned by someone else.
pub fn can_be_sabotaged(is_disabled: bool, owner: Team, requester: Team) -> bool {
    !is_disabled && owner != requester
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: TargetId,
    pub position: Position,
    pub owner: Team,
    pub is_disabled: bool,
}

/// Picks the closest qualifying target within `radius` of `origin`.
///
/// Candidates are considered in iteration order and only a strictly closer
/// one replaces the current pick, so equidistant targets resolve to whichever
/// was discovered first.
pub fn select_target<I>(
    origin: Position,
    requester: Team,
    radius: f32,
    candidates: I,
) -> Option<TargetId>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut best: Option<(TargetId, f32)> = None;

    for candidate in candidates {
        if !can_be_sabotaged(candidate.is_disabled, candidate.owner, requester) {
            continue;
        }

        let distance = origin.distance_to(&candidate.position);
        if distance > radius {
            continue;
        }

        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate.id, distance)),
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: TargetId, x: f32, y: f32, owner: Team) -> Candidate {
        Candidate {
            id,
            position: Position::new(x, y),
            owner,
            is_disabled: false,
        }
    }

    #[test]
    fn test_can_be_sabotaged() {
        assert!(can_be_sabotaged(false, Team::TeamB, Team::TeamA));
        assert!(!can_be_sabotaged(false, Team::TeamA, Team::TeamA));
        assert!(!can_be_sabotaged(true, Team::TeamB, Team::TeamA));
        assert!(can_be_sabotaged(false, Team::Neutral, Team::TeamB));
    }

    #[test]
    fn test_select_nearest_enemy_target() {
        let origin = Position::new(0.0, 0.0);
        let candidates = vec![
            candidate(1, 2.5, 0.0, Team::TeamB),
            candidate(2, 1.0, 0.0, Team::TeamB),
            candidate(3, 0.5, 0.0, Team::TeamA),
        ];

        assert_eq!(select_target(origin, Team::TeamA, 3.0, candidates), Some(2));
    }

    #[test]
    fn test_select_skips_disabled_and_out_of_range() {
        let origin = Position::new(0.0, 0.0);
        let mut disabled = candidate(1, 1.0, 0.0, Team::TeamB);
        disabled.is_disabled = true;
        let candidates = vec![disabled, candidate(2, 10.0, 0.0, Team::TeamB)];

        assert_eq!(select_target(origin, Team::TeamA, 3.0, candidates), None);
    }

    #[test]
    fn test_select_includes_target_on_radius_boundary() {
        let origin = Position::new(0.0, 0.0);
        let candidates = vec![candidate(4, 0.0, 3.0, Team::TeamB)];
        assert_eq!(select_target(origin, Team::TeamA, 3.0, candidates), Some(4));
    }

    #[test]
    fn test_select_ties_keep_discovery_order() {
        let origin = Position::new(0.0, 0.0);
        let candidates = vec![
            candidate(9, 0.0, 2.0, Team::TeamB),
            candidate(5, 2.0, 0.0, Team::TeamB),
            candidate(7, -2.0, 0.0, Team::TeamB),
        ];

        assert_eq!(select_target(origin, Team::TeamA, 3.0, candidates), Some(9));
    }

    #[test]
    fn test_select_empty() {
        let none: Vec<Candidate> = Vec::new();
        assert_eq!(
            select_target(Position::default(), Team::TeamA, 3.0, none),
            None
        );
    }
}

use crate::types::Role;
use std::collections::HashMap;

pub const PROTOCOL_VERSION: u32 = 1;

pub const TICK_RATE: u32 = 30;

/// Maximum distance between a saboteur and a target for the target to qualify.
pub const SABOTAGE_INTERACT_RADIUS: f32 = 3.0;
/// Seconds of uninterrupted interaction needed to finish a sabotage.
pub const SABOTAGE_INTERACT_DURATION: f32 = 5.0;
/// Cancelling above this progress reveals the saboteur. Fixed for every role.
pub const SABOTAGE_REVEAL_THRESHOLD: f32 = 0.3;
pub const SABOTAGE_DISABLE_DURATION: f32 = 15.0;

pub const BUILDER_OVERCHARGE_DURATION: f32 = 10.0;
pub const BUILDER_OVERCHARGE_COOLDOWN: f32 = 30.0;
pub const BUILD_SPEED_MULTIPLIER: f32 = 2.0;

pub const GUARDIAN_BULWARK_DURATION: f32 = 6.0;
pub const GUARDIAN_BULWARK_COOLDOWN: f32 = 25.0;

pub const RANGER_REVEAL_SHOT_DURATION: f32 = 8.0;
pub const RANGER_REVEAL_SHOT_COOLDOWN: f32 = 20.0;

pub const SABOTEUR_CLOAK_DURATION: f32 = 12.0;
pub const SABOTEUR_CLOAK_COOLDOWN: f32 = 35.0;

/// Used for any role the timing table has no entry for.
pub const FALLBACK_ABILITY_COOLDOWN: f32 = 30.0;
pub const FALLBACK_ABILITY_DURATION: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityTiming {
    pub cooldown: f32,
    pub duration: f32,
}

impl AbilityTiming {
    pub const FALLBACK: AbilityTiming = AbilityTiming {
        cooldown: FALLBACK_ABILITY_COOLDOWN,
        duration: FALLBACK_ABILITY_DURATION,
    };
}

/// Per-role cooldown and active-duration lookup.
///
/// Lookups never yield zero for a missing role: callers fall back to
/// [`AbilityTable::fallback`] and are expected to log that they did.
#[derive(Debug, Clone)]
pub struct AbilityTable {
    timings: HashMap<Role, AbilityTiming>,
    fallback: AbilityTiming,
}

impl AbilityTable {
    pub fn empty(fallback: AbilityTiming) -> Self {
        Self {
            timings: HashMap::new(),
            fallback,
        }
    }

    pub fn standard() -> Self {
        let mut table = Self::empty(AbilityTiming::FALLBACK);
        table.set(
            Role::Builder,
            AbilityTiming {
                cooldown: BUILDER_OVERCHARGE_COOLDOWN,
                duration: BUILDER_OVERCHARGE_DURATION,
            },
        );
        table.set(
            Role::Guardian,
            AbilityTiming {
                cooldown: GUARDIAN_BULWARK_COOLDOWN,
                duration: GUARDIAN_BULWARK_DURATION,
            },
        );
        table.set(
            Role::Ranger,
            AbilityTiming {
                cooldown: RANGER_REVEAL_SHOT_COOLDOWN,
                duration: RANGER_REVEAL_SHOT_DURATION,
            },
        );
        table.set(
            Role::Saboteur,
            AbilityTiming {
                cooldown: SABOTEUR_CLOAK_COOLDOWN,
                duration: SABOTEUR_CLOAK_DURATION,
            },
        );
        table
    }

    pub fn set(&mut self, role: Role, timing: AbilityTiming) {
        self.timings.insert(role, timing);
    }

    pub fn lookup(&self, role: Role) -> Option<AbilityTiming> {
        self.timings.get(&role).copied()
    }

    pub fn fallback(&self) -> AbilityTiming {
        self.fallback
    }
}

impl Default for AbilityTable {
    fn default() -> Self {
        Self::standard()
    }
}

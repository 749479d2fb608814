//! Role abilities: validation, activation and per-tick decay
//!
//! Each player owns one [`PlayerAbilityState`]. Activation is validated in a
//! fixed order (readiness, phase, alive) and, once accepted, sets the active
//! window and the cooldown in the same step before broadcasting. The tick
//! decays both timers independently and closes the active window exactly
//! once.
//!
//! Role-specific effects are expressed as [`AbilityBehavior`] variants that
//! toggle [`Capabilities`]; external systems (building, projectiles,
//! visibility) read those capabilities through the query methods.

use crate::collaborators::{AliveStateProvider, MatchPhaseGate};
use log::{debug, info, warn};
use shared::{
    AbilityTable, AbilityTiming, Broadcast, PlayerId, Rejection, Role, BUILD_SPEED_MULTIPLIER,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAbilityState {
    pub role: Role,
    pub cooldown_remaining: f32,
    pub is_active: bool,
    pub active_time_remaining: f32,
}

impl PlayerAbilityState {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            cooldown_remaining: 0.0,
            is_active: false,
            active_time_remaining: 0.0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining <= 0.0 && !self.is_active
    }
}

/// Effects an active ability grants its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    pub build_speed_multiplier: f32,
    pub blocks_projectiles: bool,
    pub reveal_shot_armed: bool,
    pub stealthed: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            build_speed_multiplier: 1.0,
            blocks_projectiles: false,
            reveal_shot_armed: false,
            stealthed: false,
        }
    }
}

/// The closed set of ability effects, one per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityBehavior {
    /// Builder: faster construction, read by the build system.
    Overcharge,
    /// Guardian: blocks incoming projectiles.
    Bulwark,
    /// Ranger: the next projectile fired reveals whoever it hits.
    RevealShot,
    /// Saboteur: reduced visibility.
    Cloak,
}

impl AbilityBehavior {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Builder => AbilityBehavior::Overcharge,
            Role::Guardian => AbilityBehavior::Bulwark,
            Role::Ranger => AbilityBehavior::RevealShot,
            Role::Saboteur => AbilityBehavior::Cloak,
        }
    }

    pub fn activate(&self, capabilities: &mut Capabilities) {
        match self {
            AbilityBehavior::Overcharge => {
                capabilities.build_speed_multiplier = BUILD_SPEED_MULTIPLIER
            }
            AbilityBehavior::Bulwark => capabilities.blocks_projectiles = true,
            AbilityBehavior::RevealShot => capabilities.reveal_shot_armed = true,
            AbilityBehavior::Cloak => capabilities.stealthed = true,
        }
    }

    pub fn deactivate(&self, capabilities: &mut Capabilities) {
        match self {
            AbilityBehavior::Overcharge => capabilities.build_speed_multiplier = 1.0,
            AbilityBehavior::Bulwark => capabilities.blocks_projectiles = false,
            AbilityBehavior::RevealShot => capabilities.reveal_shot_armed = false,
            AbilityBehavior::Cloak => capabilities.stealthed = false,
        }
    }
}

#[derive(Debug)]
struct AbilitySlot {
    state: PlayerAbilityState,
    capabilities: Capabilities,
    active_behavior: Option<AbilityBehavior>,
}

pub struct RoleAbilityCoordinator {
    phase: Arc<dyn MatchPhaseGate>,
    alive: Arc<dyn AliveStateProvider>,
    table: AbilityTable,
    behaviors: HashMap<Role, AbilityBehavior>,
    slots: BTreeMap<PlayerId, AbilitySlot>,
}

impl RoleAbilityCoordinator {
    pub fn new(
        phase: Arc<dyn MatchPhaseGate>,
        alive: Arc<dyn AliveStateProvider>,
        table: AbilityTable,
    ) -> Self {
        let behaviors = Role::ALL
            .iter()
            .map(|role| (*role, AbilityBehavior::for_role(*role)))
            .collect();

        Self {
            phase,
            alive,
            table,
            behaviors,
            slots: BTreeMap::new(),
        }
    }

    pub fn register_player(&mut self, player_id: PlayerId, role: Role) {
        self.slots.insert(
            player_id,
            AbilitySlot {
                state: PlayerAbilityState::new(role),
                capabilities: Capabilities::default(),
                active_behavior: None,
            },
        );
    }

    /// Drops the player's ability state together with any active capability.
    /// Nothing is broadcast and nothing fires for this player afterwards.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<PlayerAbilityState> {
        self.slots.remove(&player_id).map(|slot| slot.state)
    }

    pub fn state(&self, player_id: PlayerId) -> Option<PlayerAbilityState> {
        self.slots.get(&player_id).map(|slot| slot.state)
    }

    pub fn capabilities(&self, player_id: PlayerId) -> Option<Capabilities> {
        self.slots.get(&player_id).map(|slot| slot.capabilities)
    }

    pub fn timing_for(&self, role: Role) -> AbilityTiming {
        timing_for(&self.table, role)
    }

    /// Validates and applies an activation request.
    pub fn request_activate(
        &mut self,
        player_id: PlayerId,
        outbox: &mut Vec<Broadcast>,
    ) -> Result<Role, Rejection> {
        let slot = self
            .slots
            .get_mut(&player_id)
            .ok_or(Rejection::UnknownPlayer)?;

        if slot.state.is_active {
            return Err(Rejection::AlreadyActive);
        }
        if slot.state.cooldown_remaining > 0.0 {
            return Err(Rejection::OnCooldown);
        }

        let phase = self.phase.current_phase();
        if !phase.allows_abilities() {
            return Err(Rejection::WrongPhase(phase));
        }
        if self.alive.is_dead(player_id) {
            return Err(Rejection::Dead);
        }

        let role = slot.state.role;
        let timing = timing_for(&self.table, role);

        match self.behaviors.get(&role) {
            Some(behavior) => {
                behavior.activate(&mut slot.capabilities);
                slot.active_behavior = Some(*behavior);
            }
            None => warn!("No ability behavior registered for {}", role),
        }

        slot.state = PlayerAbilityState {
            role,
            cooldown_remaining: timing.cooldown,
            is_active: true,
            active_time_remaining: timing.duration,
        };

        info!(
            "Player {} activated {} ability ({:.1}s active, {:.1}s cooldown)",
            player_id, role, timing.duration, timing.cooldown
        );
        outbox.push(Broadcast::AbilityActivated { player_id, role });
        Ok(role)
    }

    /// Decays cooldowns and active windows by `dt` seconds.
    pub fn tick(&mut self, dt: f32, outbox: &mut Vec<Broadcast>) {
        for (player_id, slot) in self.slots.iter_mut() {
            slot.state.cooldown_remaining = (slot.state.cooldown_remaining - dt).max(0.0);

            if !slot.state.is_active {
                continue;
            }

            slot.state.active_time_remaining -= dt;
            if slot.state.active_time_remaining > 0.0 {
                continue;
            }

            slot.state.active_time_remaining = 0.0;
            slot.state.is_active = false;
            if let Some(behavior) = slot.active_behavior.take() {
                behavior.deactivate(&mut slot.capabilities);
            }

            debug!("Player {} {} ability expired", player_id, slot.state.role);
            outbox.push(Broadcast::AbilityDeactivated {
                player_id: *player_id,
            });
        }
    }

    pub fn build_speed_multiplier(&self, player_id: PlayerId) -> f32 {
        self.capabilities(player_id)
            .map(|caps| caps.build_speed_multiplier)
            .unwrap_or(1.0)
    }

    pub fn blocks_projectiles(&self, player_id: PlayerId) -> bool {
        self.capabilities(player_id)
            .map(|caps| caps.blocks_projectiles)
            .unwrap_or(false)
    }

    pub fn is_stealthed(&self, player_id: PlayerId) -> bool {
        self.capabilities(player_id)
            .map(|caps| caps.stealthed)
            .unwrap_or(false)
    }

    /// Called by the projectile system when the player fires. Returns true at
    /// most once per activation.
    pub fn consume_reveal_shot(&mut self, player_id: PlayerId) -> bool {
        match self.slots.get_mut(&player_id) {
            Some(slot) if slot.capabilities.reveal_shot_armed => {
                slot.capabilities.reveal_shot_armed = false;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn timing_for(table: &AbilityTable, role: Role) -> AbilityTiming {
    table.lookup(role).unwrap_or_else(|| {
        let fallback = table.fallback();
        warn!(
            "No ability timing for {}, using fallback ({:.1}s cooldown, {:.1}s duration)",
            role, fallback.cooldown, fallback.duration
        );
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{AliveRoster, SharedPhase};
    use shared::{
        MatchPhase, FALLBACK_ABILITY_COOLDOWN, FALLBACK_ABILITY_DURATION,
        GUARDIAN_BULWARK_COOLDOWN, GUARDIAN_BULWARK_DURATION,
    };

    struct Fixture {
        phase: Arc<SharedPhase>,
        roster: Arc<AliveRoster>,
        coordinator: RoleAbilityCoordinator,
    }

    fn fixture_with_table(table: AbilityTable) -> Fixture {
        let phase = Arc::new(SharedPhase::new(MatchPhase::Combat));
        let roster = Arc::new(AliveRoster::new());
        let coordinator = RoleAbilityCoordinator::new(phase.clone(), roster.clone(), table);
        Fixture {
            phase,
            roster,
            coordinator,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_table(AbilityTable::standard())
    }

    #[test]
    fn test_activation_sets_timers_and_broadcasts() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Guardian);

        let role = f.coordinator.request_activate(1, &mut outbox).unwrap();
        assert_eq!(role, Role::Guardian);

        let state = f.coordinator.state(1).unwrap();
        assert!(state.is_active);
        assert_eq!(state.cooldown_remaining, GUARDIAN_BULWARK_COOLDOWN);
        assert_eq!(state.active_time_remaining, GUARDIAN_BULWARK_DURATION);
        assert!(f.coordinator.blocks_projectiles(1));
        assert_eq!(
            outbox,
            vec![Broadcast::AbilityActivated {
                player_id: 1,
                role: Role::Guardian
            }]
        );
    }

    #[test]
    fn test_reject_while_active_leaves_state_unchanged() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Builder);
        f.coordinator.request_activate(1, &mut outbox).unwrap();
        let before = f.coordinator.state(1).unwrap();
        outbox.clear();

        assert_eq!(
            f.coordinator.request_activate(1, &mut outbox),
            Err(Rejection::AlreadyActive)
        );
        assert_eq!(f.coordinator.state(1).unwrap(), before);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_reject_while_cooling_down() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Guardian);
        f.coordinator.request_activate(1, &mut outbox).unwrap();

        f.coordinator.tick(GUARDIAN_BULWARK_DURATION, &mut outbox);
        let cooling = f.coordinator.state(1).unwrap();
        assert!(!cooling.is_active);
        assert!(cooling.cooldown_remaining > 0.0);
        outbox.clear();

        assert_eq!(
            f.coordinator.request_activate(1, &mut outbox),
            Err(Rejection::OnCooldown)
        );
        assert_eq!(f.coordinator.state(1).unwrap(), cooling);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_readiness_checked_before_phase() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Ranger);
        f.coordinator.request_activate(1, &mut outbox).unwrap();

        f.phase.set(MatchPhase::RoundEnd);
        assert_eq!(
            f.coordinator.request_activate(1, &mut outbox),
            Err(Rejection::AlreadyActive)
        );
    }

    #[test]
    fn test_reject_outside_build_and_combat() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Builder);

        for phase in [MatchPhase::Waiting, MatchPhase::RoundEnd] {
            f.phase.set(phase);
            assert_eq!(
                f.coordinator.request_activate(1, &mut outbox),
                Err(Rejection::WrongPhase(phase))
            );
        }
        assert!(outbox.is_empty());

        f.phase.set(MatchPhase::Build);
        assert!(f.coordinator.request_activate(1, &mut outbox).is_ok());
    }

    #[test]
    fn test_reject_dead_player() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Saboteur);
        f.roster.set_dead(1, true);

        assert_eq!(
            f.coordinator.request_activate(1, &mut outbox),
            Err(Rejection::Dead)
        );
        assert!(!f.coordinator.state(1).unwrap().is_active);
        assert!(!f.coordinator.is_stealthed(1));
    }

    #[test]
    fn test_reject_unknown_player() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        assert_eq!(
            f.coordinator.request_activate(42, &mut outbox),
            Err(Rejection::UnknownPlayer)
        );
    }

    #[test]
    fn test_expiry_fires_exactly_once() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Guardian);
        f.coordinator.request_activate(1, &mut outbox).unwrap();
        outbox.clear();

        for _ in 0..100 {
            f.coordinator.tick(0.5, &mut outbox);
        }

        assert_eq!(outbox, vec![Broadcast::AbilityDeactivated { player_id: 1 }]);
        assert!(!f.coordinator.blocks_projectiles(1));
    }

    #[test]
    fn test_active_until_expiry_tick() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Guardian);
        f.coordinator.request_activate(1, &mut outbox).unwrap();
        outbox.clear();

        f.coordinator.tick(GUARDIAN_BULWARK_DURATION - 0.5, &mut outbox);
        let state = f.coordinator.state(1).unwrap();
        assert!(state.is_active);
        assert!(state.active_time_remaining > 0.0);
        assert!(outbox.is_empty());

        f.coordinator.tick(0.5, &mut outbox);
        let state = f.coordinator.state(1).unwrap();
        assert!(!state.is_active);
        assert_eq!(state.active_time_remaining, 0.0);
    }

    #[test]
    fn test_cooldown_returns_to_idle() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Guardian);
        f.coordinator.request_activate(1, &mut outbox).unwrap();

        f.coordinator.tick(GUARDIAN_BULWARK_COOLDOWN + 1.0, &mut outbox);
        let state = f.coordinator.state(1).unwrap();
        assert_eq!(state.cooldown_remaining, 0.0);
        assert!(state.is_ready());

        assert!(f.coordinator.request_activate(1, &mut outbox).is_ok());
    }

    #[test]
    fn test_removed_player_never_expires() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Guardian);
        f.coordinator.request_activate(1, &mut outbox).unwrap();
        outbox.clear();

        f.coordinator.tick(1.0, &mut outbox);
        let removed = f.coordinator.remove_player(1).unwrap();
        assert!(removed.is_active);

        f.coordinator.tick(GUARDIAN_BULWARK_DURATION * 2.0, &mut outbox);
        assert!(outbox.is_empty());
        assert!(f.coordinator.is_empty());
        assert!(!f.coordinator.blocks_projectiles(1));
    }

    #[test]
    fn test_reveal_shot_consumed_once() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Ranger);

        assert!(!f.coordinator.consume_reveal_shot(1));
        f.coordinator.request_activate(1, &mut outbox).unwrap();
        assert!(f.coordinator.consume_reveal_shot(1));
        assert!(!f.coordinator.consume_reveal_shot(1));
        assert!(f.coordinator.state(1).unwrap().is_active);
    }

    #[test]
    fn test_builder_multiplier_reset_on_expiry() {
        let mut f = fixture();
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Builder);
        assert_eq!(f.coordinator.build_speed_multiplier(1), 1.0);

        f.coordinator.request_activate(1, &mut outbox).unwrap();
        assert_eq!(f.coordinator.build_speed_multiplier(1), BUILD_SPEED_MULTIPLIER);

        let duration = f.coordinator.timing_for(Role::Builder).duration;
        f.coordinator.tick(duration, &mut outbox);
        assert_eq!(f.coordinator.build_speed_multiplier(1), 1.0);
    }

    #[test]
    fn test_missing_timing_uses_fallback() {
        let mut f = fixture_with_table(AbilityTable::empty(AbilityTiming::FALLBACK));
        let mut outbox = Vec::new();
        f.coordinator.register_player(1, Role::Saboteur);

        f.coordinator.request_activate(1, &mut outbox).unwrap();
        let state = f.coordinator.state(1).unwrap();
        assert_eq!(state.cooldown_remaining, FALLBACK_ABILITY_COOLDOWN);
        assert_eq!(state.active_time_remaining, FALLBACK_ABILITY_DURATION);
        assert!(f.coordinator.is_stealthed(1));
    }
}

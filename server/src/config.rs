//! Tunables the server binary assembles from its command line

use crate::collaborators::PhaseDurations;
use crate::sabotage::SabotageSettings;
use shared::AbilityTable;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub phases: PhaseDurations,
    pub sabotage: SabotageSettings,
    pub abilities: AbilityTable,
    /// Drop rejected requests without replying to the requester.
    pub quiet_rejections: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            phases: PhaseDurations::default(),
            sabotage: SabotageSettings::default(),
            abilities: AbilityTable::standard(),
            quiet_rejections: false,
        }
    }
}

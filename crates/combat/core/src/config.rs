use crate::state::{SlotTag, Status};

/// Rule constants and tunable parameters of the action economy.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RulesConfig {
    /// Name of the effect that restricts the next ability to damage only.
    pub limiter_effect_name: String,
}

impl RulesConfig {
    // ===== fixed rule constants =====
    /// Face that marks a natural critical on the check die.
    pub const CRITICAL_FACE: u32 = 20;
    /// Sides of the check die.
    pub const CHECK_DIE_SIDES: u32 = 20;
    /// Tag carried by effects that unlock custom slots through their origin item.
    pub const ENABLER_TAG: &'static str = "enabler";

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_LIMITER_EFFECT_NAME: &'static str = "Next Ability Does Damage Only";

    pub fn new() -> Self {
        Self {
            limiter_effect_name: Self::DEFAULT_LIMITER_EFFECT_NAME.to_owned(),
        }
    }

    /// Slots every actor receives at the start of their turn.
    pub fn base_slots() -> [SlotTag; 2] {
        [SlotTag::Primary, SlotTag::Secondary]
    }

    /// Conditions that survive combat cleanup and block knock-out toggling.
    pub fn persistent_conditions() -> [Status; 4] {
        [Status::Ko, Status::Dead, Status::Comatose, Status::Brink]
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Action log entries.
//!
//! Every resolved ability writes one entry. Consumed slots point at it, damage
//! results are applied from it, and deleting it before any damage lands rolls
//! the slot and MP cost back.

use std::collections::BTreeMap;

use crate::ability::ActionType;
use crate::dice::RollResult;
use crate::state::{ActorId, ItemId, MessageId};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum DamageState {
    #[default]
    Pending,
    Applied,
    Reverted,
}

/// Rolled damage against one target.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageResult {
    pub amount: u32,
    pub state: DamageState,
}

impl DamageResult {
    pub fn pending(amount: u32) -> Self {
        Self {
            amount,
            state: DamageState::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionLogEntry {
    pub id: MessageId,
    pub actor: ActorId,
    pub item: ItemId,
    pub action_type: ActionType,
    pub roll: Option<RollResult>,
    pub is_critical: bool,
    pub is_success: Option<bool>,
    pub targets: Vec<ActorId>,
    pub damage: BTreeMap<ActorId, DamageResult>,
    pub mp_cost: u32,
    /// Set once the MP cost has been refunded.
    pub mp_restored: bool,
}

impl ActionLogEntry {
    pub fn new(actor: ActorId, item: ItemId, action_type: ActionType) -> Self {
        Self {
            id: MessageId(0),
            actor,
            item,
            action_type,
            roll: None,
            is_critical: false,
            is_success: None,
            targets: Vec::new(),
            damage: BTreeMap::new(),
            mp_cost: 0,
            mp_restored: false,
        }
    }

    pub fn has_pending_damage(&self) -> bool {
        self.damage.values().any(|d| d.state == DamageState::Pending)
    }

    pub fn any_damage_applied(&self) -> bool {
        self.damage.values().any(|d| d.state == DamageState::Applied)
    }

    /// Marks the MP cost refunded. Returns the amount to refund, once.
    pub fn take_refund(&mut self) -> Option<u32> {
        if self.mp_cost == 0 || self.mp_restored {
            return None;
        }
        self.mp_restored = true;
        Some(self.mp_cost)
    }
}

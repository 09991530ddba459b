//! Per-actor action slot state machine.
//!
//! Each actor holds a multiset of `available` slot tags and an ordered list of
//! `used` entries. Consuming a slot moves exactly one tag from `available` into
//! `used` together with the result that consumed it, so invalidating that
//! result can put the tag back.
//!
//! # Resolution order
//!
//! 1. **Exact**: the ability's own type tag is available
//! 2. **Fallback**: a secondary ability may take a primary slot once no
//!    secondary slot is left
//! 3. **Tag**: a custom slot named after one of the ability's tags
//! 4. **Enabler**: an enabler ability may take a custom slot declared by the
//!    origin item of an active `enabler` effect
//!
//! Reactions never resolve through this machine; they flip `used_reaction`.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::ability::ActionType;
use crate::config::RulesConfig;
use crate::error::{CombatError, ErrorSeverity};

use super::{EffectId, ItemId, MessageId};

/// A named token representing one use of an action category.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotTag {
    Primary,
    Secondary,
    /// Slot named after an ability tag, usually granted by an effect.
    Custom(String),
}

impl SlotTag {
    pub fn from_name(name: &str) -> Self {
        match name {
            "primary" => Self::Primary,
            "secondary" => Self::Secondary,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Slot consumed by an exact match for this action type.
    pub fn for_action(action_type: ActionType) -> Option<Self> {
        match action_type {
            ActionType::Primary => Some(Self::Primary),
            ActionType::Secondary => Some(Self::Secondary),
            ActionType::Reaction => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for SlotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("no {action_type} slot available")]
    NoSlotAvailable { action_type: ActionType },

    #[error("reactions do not consume action slots")]
    ReactionNotSlotted,

    #[error("slot {slot} is no longer available")]
    SlotMissing { slot: SlotTag },
}

impl CombatError for SlotError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoSlotAvailable { .. } => ErrorSeverity::Recoverable,
            Self::ReactionNotSlotted => ErrorSeverity::Validation,
            Self::SlotMissing { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NoSlotAvailable { .. } => "SLOT_NONE_AVAILABLE",
            Self::ReactionNotSlotted => "SLOT_REACTION",
            Self::SlotMissing { .. } => "SLOT_MISSING",
        }
    }
}

/// A consumed slot and the result that consumed it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsedSlot {
    pub slot: SlotTag,
    pub action_type: ActionType,
    pub result: MessageId,
}

/// What the ability asks of the slot machine.
#[derive(Clone, Copy, Debug)]
pub struct SlotRequest<'a> {
    pub action_type: ActionType,
    pub tags: &'a BTreeSet<String>,
    /// The ability declares enabler effects of its own.
    pub enabler: bool,
}

/// An active effect that can authorize a custom slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnablerCandidate {
    pub effect: EffectId,
    pub origin_item: Option<ItemId>,
    /// Slots opened by the effect's `EnableCombatTurnSlot` changes.
    pub granted_slots: Vec<String>,
    /// Tags declared by the effect's origin item.
    pub origin_tags: Vec<String>,
    /// The effect itself carries the `enabler` tag.
    pub tagged_enabler: bool,
}

/// How a slot was matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionPath {
    Exact,
    Fallback,
    Tag,
    Enabler,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotResolution {
    pub slot: SlotTag,
    pub path: ResolutionPath,
    /// Enabler effect that is spent together with the slot.
    pub enabler: Option<EnablerCandidate>,
}

/// Available and used slots for one actor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionState {
    pub available: Vec<SlotTag>,
    pub used: Vec<UsedSlot>,
    pub used_reaction: bool,
}

impl Default for ActionState {
    fn default() -> Self {
        let mut state = Self {
            available: Vec::new(),
            used: Vec::new(),
            used_reaction: false,
        };
        state.reset(false);
        state
    }
}

impl ActionState {
    /// Turn-start reset: base slots plus the focus bonus.
    pub fn reset(&mut self, focus: bool) {
        self.available = RulesConfig::base_slots().to_vec();
        if focus {
            self.available.push(SlotTag::Secondary);
        }
        self.used.clear();
    }

    /// Total slots owned this turn, spent or not.
    pub fn slot_count(&self) -> usize {
        self.available.len() + self.used.len()
    }

    pub fn is_available(&self, slot: &SlotTag) -> bool {
        self.available.contains(slot)
    }

    /// Adds a named slot once. Returns false if it was already available.
    pub fn grant(&mut self, slot: SlotTag) -> bool {
        if self.available.contains(&slot) {
            return false;
        }
        self.available.push(slot);
        true
    }

    /// Adds a slot even if an equal tag is already available.
    pub fn grant_bonus(&mut self, slot: SlotTag) {
        self.available.push(slot);
    }

    /// Finds the slot an ability would consume, without mutating.
    pub fn resolve(
        &self,
        request: SlotRequest<'_>,
        enablers: &[EnablerCandidate],
    ) -> Result<SlotResolution, SlotError> {
        let exact = SlotTag::for_action(request.action_type).ok_or(SlotError::ReactionNotSlotted)?;

        if self.is_available(&exact) {
            return Ok(SlotResolution {
                slot: exact,
                path: ResolutionPath::Exact,
                enabler: None,
            });
        }

        if request.action_type == ActionType::Secondary && self.is_available(&SlotTag::Primary) {
            return Ok(SlotResolution {
                slot: SlotTag::Primary,
                path: ResolutionPath::Fallback,
                enabler: None,
            });
        }

        let tag_match = self
            .available
            .iter()
            .find(|slot| matches!(slot, SlotTag::Custom(name) if request.tags.contains(name)));
        if let Some(slot) = tag_match {
            let enabler = enablers
                .iter()
                .find(|c| c.granted_slots.iter().any(|s| s == slot.as_str()))
                .cloned();
            return Ok(SlotResolution {
                slot: slot.clone(),
                path: ResolutionPath::Tag,
                enabler,
            });
        }

        if request.enabler {
            for candidate in enablers.iter().filter(|c| c.tagged_enabler) {
                let free = candidate
                    .origin_tags
                    .iter()
                    .map(|tag| SlotTag::Custom(tag.clone()))
                    .find(|slot| self.is_available(slot));
                if let Some(slot) = free {
                    return Ok(SlotResolution {
                        slot,
                        path: ResolutionPath::Enabler,
                        enabler: Some(candidate.clone()),
                    });
                }
            }
        }

        Err(SlotError::NoSlotAvailable {
            action_type: request.action_type,
        })
    }

    /// Moves one matching tag from `available` into `used`.
    pub fn consume(
        &mut self,
        resolution: &SlotResolution,
        action_type: ActionType,
        result: MessageId,
    ) -> Result<(), SlotError> {
        let index = self
            .available
            .iter()
            .position(|slot| *slot == resolution.slot)
            .ok_or_else(|| SlotError::SlotMissing {
                slot: resolution.slot.clone(),
            })?;
        let slot = self.available.remove(index);
        self.used.push(UsedSlot {
            slot,
            action_type,
            result,
        });
        Ok(())
    }

    /// Returns the slot consumed by `result` to `available`.
    ///
    /// Yields `None` when no used entry references `result`, which makes
    /// repeated restores no-ops.
    pub fn restore(&mut self, result: MessageId) -> Option<UsedSlot> {
        let index = self.used.iter().position(|u| u.result == result)?;
        let entry = self.used.remove(index);
        self.available.push(entry.slot.clone());
        Some(entry)
    }
}

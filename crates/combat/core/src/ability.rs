//! Abilities and effect-carrying items.
//!
//! An [`Ability`] is the item an actor uses: it declares its slot type, costs,
//! check/resistance attributes, dice expressions and the effect lists that fan
//! out after resolution. Items of kind [`AbilityKind::Effect`] only exist to
//! carry effect templates and durations referenced from other abilities.

use std::collections::BTreeSet;

use crate::dice;
use crate::effect::{DurationRule, EffectTemplate};
use crate::state::{ActorId, ItemId};

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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AbilityKind {
    #[default]
    Action,
    Trait,
    /// Carrier for effect templates; never used directly.
    Effect,
}

/// Slot category an ability draws from.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionType {
    #[default]
    Primary,
    Secondary,
    Reaction,
}

/// Declared target intent.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TargetMode {
    /// Always the acting actor.
    #[strum(serialize = "self")]
    SelfOnly,
    /// Exactly one target other than the actor.
    #[default]
    Single,
    /// At least one target, none on the actor's side.
    Enemy,
    /// At least one target, all on the actor's side.
    Ally,
    /// At least one target of any side.
    All,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LimitationUnits {
    /// Uses reset when the owner's turn comes around.
    Turn,
    /// Uses reset when combat starts or ends.
    Combat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limitation {
    pub max: u32,
    pub units: LimitationUnits,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ability {
    pub id: ItemId,
    pub name: String,
    pub owner: Option<ActorId>,
    pub kind: AbilityKind,
    pub action_type: ActionType,
    pub target: TargetMode,
    pub cost_mp: u32,
    /// Attribute added to the check roll.
    pub check_attribute: Option<String>,
    /// Attribute of the first target the check is compared against (CR).
    pub resistance: Option<String>,
    pub base_damage: Option<String>,
    pub direct_hit_damage: Option<String>,
    pub healing: Option<String>,
    pub restore_mp: Option<String>,
    pub barrier: Option<String>,
    /// Effects applied to targets.
    pub grants: Vec<ItemId>,
    /// Effects applied to the user.
    pub source_grants: Vec<ItemId>,
    /// Items whose effects prepare extra slots, applied regardless of the roll.
    pub enables: Vec<ItemId>,
    /// Items applied to the user when the check die meets `proc_trigger`.
    pub procs: Vec<ItemId>,
    /// Items whose same-named effects must be active and are consumed.
    pub requires: Vec<ItemId>,
    pub proc_trigger: Option<u32>,
    pub tags: BTreeSet<String>,
    pub limitation: Option<Limitation>,
    pub uses: u32,
    pub durations: Vec<DurationRule>,
    pub effects: Vec<EffectTemplate>,
    /// Trait that costs the owner their movement and grants focus.
    pub sacrifices_movement: bool,
}

impl Ability {
    pub fn new(id: ItemId, name: impl Into<String>, kind: AbilityKind, action_type: ActionType) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            kind,
            action_type,
            target: TargetMode::default(),
            cost_mp: 0,
            check_attribute: None,
            resistance: None,
            base_damage: None,
            direct_hit_damage: None,
            healing: None,
            restore_mp: None,
            barrier: None,
            grants: Vec::new(),
            source_grants: Vec::new(),
            enables: Vec::new(),
            procs: Vec::new(),
            requires: Vec::new(),
            proc_trigger: None,
            tags: BTreeSet::new(),
            limitation: None,
            uses: 0,
            durations: Vec::new(),
            effects: Vec::new(),
            sacrifices_movement: false,
        }
    }

    /// An effect carrier item with the given templates.
    pub fn effect_item(id: ItemId, name: impl Into<String>, effects: Vec<EffectTemplate>) -> Self {
        let mut item = Self::new(id, name, AbilityKind::Effect, ActionType::Primary);
        item.effects = effects;
        item
    }

    pub fn is_reaction(&self) -> bool {
        self.action_type == ActionType::Reaction
    }

    /// Whether the ability runs a check against a target resistance.
    pub fn has_check(&self) -> bool {
        self.resistance.is_some()
    }

    pub fn has_damage(&self) -> bool {
        self.base_damage.is_some() || self.direct_hit_damage.is_some()
    }

    pub fn has_healing(&self) -> bool {
        self.healing.is_some()
    }

    pub fn remaining_uses(&self) -> Option<i64> {
        self.limitation
            .map(|limit| i64::from(limit.max) - i64::from(self.uses))
    }

    /// Anything that is not damage: restoration, barrier, grants, procs.
    pub fn has_non_damage_component(&self) -> bool {
        self.healing.is_some()
            || self.restore_mp.is_some()
            || self.barrier.is_some()
            || !self.grants.is_empty()
            || !self.procs.is_empty()
    }

    /// Drops every non-damage field so only damage resolves.
    pub fn strip_non_damage(&mut self) {
        self.healing = None;
        self.restore_mp = None;
        self.barrier = None;
        self.grants.clear();
        self.procs.clear();
        self.proc_trigger = None;
    }

    /// Critical hit: doubles dice counts in healing if present, otherwise damage.
    pub fn double_critical_dice(&mut self) {
        if let Some(healing) = self.healing.as_mut() {
            *healing = dice::double_dice_counts(healing);
            return;
        }
        for formula in [self.base_damage.as_mut(), self.direct_hit_damage.as_mut()]
            .into_iter()
            .flatten()
        {
            *formula = dice::double_dice_counts(formula);
        }
    }
}

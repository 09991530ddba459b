//! Effects, changes and their dispatch keys.
//!
//! An [`Effect`] lives on the actor it modifies. Its `origin` is a weak
//! reference used for lookup only: deleting the origin item leaves the effect
//! in place. Changes in `custom` mode are dispatched by [`EffectKey`] to the
//! processor registered for that key; other modes are plain data modifiers.

mod duration;
mod stacking;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::combat::CombatPointer;
use crate::state::{ActorId, EffectId, ItemId, Status};

pub use duration::{
    Boundary, DurationRule, DurationUnits, EffectDuration, Qualifier, first_expiring_rule,
};
pub use stacking::{StackingDecision, StackingPolicy};

/// Dispatch tag of a change.
///
/// Known keys map to processors. Anything else parses to [`EffectKey::Other`]
/// and has no processor, so dispatching it fails closed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKey {
    DamageOverTime,
    ProcTrigger,
    AbilitiesLimiter,
    TransferEffectToAllies,
    EnableCombatTurnSlot,
    PrimaryBaseDamageBuff,
    AbilityBaseDamageBuff,
    DamageDiceReroll,
    Other(String),
}

impl EffectKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DamageOverTime => "DamageOverTime",
            Self::ProcTrigger => "ProcTrigger",
            Self::AbilitiesLimiter => "AbilitiesLimiter",
            Self::TransferEffectToAllies => "TransferEffectToAllies",
            Self::EnableCombatTurnSlot => "EnableCombatTurnSlot",
            Self::PrimaryBaseDamageBuff => "PrimaryBaseDamageBuff",
            Self::AbilityBaseDamageBuff => "AbilityBaseDamageBuff",
            Self::DamageDiceReroll => "DamageDiceReroll",
            Self::Other(key) => key,
        }
    }
}

impl FromStr for EffectKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DamageOverTime" => Self::DamageOverTime,
            "ProcTrigger" => Self::ProcTrigger,
            "AbilitiesLimiter" => Self::AbilitiesLimiter,
            "TransferEffectToAllies" => Self::TransferEffectToAllies,
            "EnableCombatTurnSlot" => Self::EnableCombatTurnSlot,
            "PrimaryBaseDamageBuff" => Self::PrimaryBaseDamageBuff,
            "AbilityBaseDamageBuff" => Self::AbilityBaseDamageBuff,
            "DamageDiceReroll" => Self::DamageDiceReroll,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a change combines with the value it modifies.
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
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u8)]
pub enum ChangeMode {
    /// Dispatched to the processor registered for the key.
    #[default]
    Custom = 0,
    Multiply = 1,
    Add = 2,
    Override = 3,
    Downgrade = 4,
    Upgrade = 5,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Change {
    pub key: EffectKey,
    pub mode: ChangeMode,
    pub value: String,
}

impl Change {
    pub fn custom(key: EffectKey, value: impl Into<String>) -> Self {
        Self {
            key,
            mode: ChangeMode::Custom,
            value: value.into(),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.mode == ChangeMode::Custom
    }

    /// Numeric value, or `None` when the value is not an integer.
    pub fn numeric_value(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }
}

/// Weak back-reference to whatever created an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    Item(ItemId),
    Effect(EffectId),
}

impl Origin {
    pub fn item(&self) -> Option<ItemId> {
        match self {
            Self::Item(id) => Some(*id),
            Self::Effect(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectFlags {
    pub stackable: StackingPolicy,
    /// Actor whose effect this is a clone of.
    pub transferred_by: Option<ActorId>,
    /// Marked by a requirement check; deleted once roll modifiers are confirmed.
    pub pending_deletion: bool,
}

/// Declarative effect carried by an item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectTemplate {
    pub name: String,
    pub changes: Vec<Change>,
    pub stackable: StackingPolicy,
    /// Status tags toggled instead of creating an effect record.
    pub statuses: BTreeSet<Status>,
    pub tags: BTreeSet<String>,
    pub durations: Vec<DurationRule>,
}

impl EffectTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_change(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    pub fn with_stacking(mut self, policy: StackingPolicy) -> Self {
        self.stackable = policy;
        self
    }

    pub fn with_duration(mut self, rule: DurationRule) -> Self {
        self.durations.push(rule);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Grants status tags rather than a change set.
    pub fn is_status_grant(&self) -> bool {
        !self.statuses.is_empty() && self.changes.is_empty()
    }
}

/// An effect instance attached to an actor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Effect {
    pub id: EffectId,
    pub name: String,
    pub changes: Vec<Change>,
    pub duration: EffectDuration,
    pub origin: Option<Origin>,
    /// Actor that granted the effect; compared by the `differentSource` policy.
    pub source: Option<ActorId>,
    pub flags: EffectFlags,
    pub disabled: bool,
    pub statuses: BTreeSet<Status>,
    pub tags: BTreeSet<String>,
}

impl Effect {
    /// Instantiates a template. The id is assigned by persistence on creation.
    pub fn from_template(
        template: &EffectTemplate,
        origin: Option<Origin>,
        source: Option<ActorId>,
        rule: DurationRule,
        start: CombatPointer,
    ) -> Self {
        Self {
            id: EffectId(0),
            name: template.name.clone(),
            changes: template.changes.clone(),
            duration: EffectDuration { rule, start },
            origin,
            source,
            flags: EffectFlags {
                stackable: template.stackable,
                ..EffectFlags::default()
            },
            disabled: false,
            statuses: template.statuses.clone(),
            tags: template.tags.clone(),
        }
    }

    pub fn origin_item(&self) -> Option<ItemId> {
        self.origin.and_then(|o| o.item())
    }

    /// Changes dispatched to processors.
    pub fn custom_changes(&self) -> impl Iterator<Item = &Change> + '_ {
        self.changes.iter().filter(|c| c.is_custom())
    }

    pub fn has_custom_key(&self, key: &EffectKey) -> bool {
        self.custom_changes().any(|c| &c.key == key)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn grants_persistent_condition(&self) -> bool {
        self.statuses.iter().any(Status::is_persistent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_parse_to_other() {
        let key: EffectKey = "DamageOverTime".parse().unwrap();
        assert_eq!(key, EffectKey::DamageOverTime);
        let key: EffectKey = "LucidDreaming".parse().unwrap();
        assert_eq!(key, EffectKey::Other("LucidDreaming".into()));
        assert_eq!(key.to_string(), "LucidDreaming");
    }

    #[test]
    fn change_modes_follow_numeric_codes() {
        assert_eq!(ChangeMode::from_repr(0), Some(ChangeMode::Custom));
        assert_eq!(ChangeMode::from_repr(5), Some(ChangeMode::Upgrade));
        assert_eq!(ChangeMode::from_repr(6), None);
    }

    #[test]
    fn from_template_copies_changes_and_policy() {
        let template = EffectTemplate::new("Regen")
            .with_change(Change::custom(EffectKey::DamageOverTime, "-3"))
            .with_stacking(StackingPolicy::AnySource);
        let effect = Effect::from_template(
            &template,
            Some(Origin::Item(ItemId(4))),
            Some(ActorId(1)),
            DurationRule::None,
            CombatPointer::new(2, 1),
        );
        assert_eq!(effect.changes, template.changes);
        assert_eq!(effect.flags.stackable, StackingPolicy::AnySource);
        assert_eq!(effect.origin_item(), Some(ItemId(4)));
        assert_eq!(effect.duration.start, CombatPointer::new(2, 1));
        assert_eq!(effect.custom_changes().next().and_then(Change::numeric_value), Some(-3));
    }
}

use std::collections::{BTreeMap, BTreeSet};

use crate::effect::Effect;

use super::{ActionState, ActorId, EffectId, ResourcePools, Status};

/// Which side of the encounter an actor fights on.
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
pub enum ActorKind {
    /// Player character. Acts in the first phase of every round.
    #[default]
    Player,
    /// Non-player character on the opposing side.
    Npc,
}

/// Attribute buckets.
///
/// Player characters keep resistances in `secondary`; NPCs keep everything in
/// `primary`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    pub primary: BTreeMap<String, i32>,
    pub secondary: BTreeMap<String, i32>,
}

impl Attributes {
    pub fn with_primary(mut self, name: impl Into<String>, value: i32) -> Self {
        self.primary.insert(name.into(), value);
        self
    }

    pub fn with_secondary(mut self, name: impl Into<String>, value: i32) -> Self {
        self.secondary.insert(name.into(), value);
        self
    }
}

/// A combat participant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub points: ResourcePools,
    pub attributes: Attributes,
    pub action_state: ActionState,
    pub effects: Vec<Effect>,
    pub statuses: BTreeSet<Status>,
    pub has_moved: bool,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>, kind: ActorKind, points: ResourcePools) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            points,
            attributes: Attributes::default(),
            action_state: ActionState::default(),
            effects: Vec::new(),
            statuses: BTreeSet::new(),
            has_moved: false,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn has_status(&self, status: &Status) -> bool {
        self.statuses.contains(status)
    }

    /// Returns true if any persistent condition (ko, dead, ...) is active.
    pub fn has_persistent_condition(&self) -> bool {
        self.statuses.iter().any(Status::is_persistent)
    }

    /// Sets or clears a status. Returns true if the set changed.
    pub fn toggle_status(&mut self, status: Status, active: bool) -> bool {
        if active {
            self.statuses.insert(status)
        } else {
            self.statuses.remove(&status)
        }
    }

    /// Resistance value used by checks targeting this actor.
    pub fn resistance(&self, attribute: &str) -> i32 {
        let bucket = match self.kind {
            ActorKind::Npc => &self.attributes.primary,
            ActorKind::Player => &self.attributes.secondary,
        };
        bucket.get(attribute).copied().unwrap_or(0)
    }

    /// Values exposed to dice formulas as `@name` references.
    pub fn roll_data(&self) -> BTreeMap<String, i64> {
        let mut data: BTreeMap<String, i64> = self
            .attributes
            .secondary
            .iter()
            .map(|(k, v)| (k.clone(), i64::from(*v)))
            .collect();
        // primary wins on name clashes
        data.extend(
            self.attributes
                .primary
                .iter()
                .map(|(k, v)| (k.clone(), i64::from(*v))),
        );
        data
    }

    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|e| e.id == id)
    }

    /// Effects that are not disabled.
    pub fn active_effects(&self) -> impl Iterator<Item = &Effect> + '_ {
        self.effects.iter().filter(|e| !e.disabled)
    }

    pub fn find_effect_named(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name == name)
    }

    pub fn remove_effect(&mut self, id: EffectId) -> Option<Effect> {
        let index = self.effects.iter().position(|e| e.id == id)?;
        Some(self.effects.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistance_reads_bucket_by_kind() {
        let attributes = Attributes::default()
            .with_primary("def", 11)
            .with_secondary("def", 14);
        let pc = Actor::new(ActorId(1), "Ysolde", ActorKind::Player, ResourcePools::new(30, 10))
            .with_attributes(attributes.clone());
        let npc = Actor::new(ActorId(2), "Goblin", ActorKind::Npc, ResourcePools::new(20, 0))
            .with_attributes(attributes);

        assert_eq!(pc.resistance("def"), 14);
        assert_eq!(npc.resistance("def"), 11);
        assert_eq!(npc.resistance("mag"), 0);
    }

    #[test]
    fn toggle_reports_changes_only() {
        let mut actor = Actor::new(ActorId(1), "A", ActorKind::Player, ResourcePools::new(10, 10));
        assert!(actor.toggle_status(Status::Focus, true));
        assert!(!actor.toggle_status(Status::Focus, true));
        assert!(actor.toggle_status(Status::Focus, false));
        assert!(!actor.has_status(&Status::Focus));
    }
}

use crate::state::{ActorId, EffectId};

use super::Effect;

/// How a new instance interacts with same-named effects already on the target.
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
#[strum(serialize_all = "camelCase")]
pub enum StackingPolicy {
    /// One instance per granting actor.
    #[default]
    DifferentSource,
    /// Every application stacks.
    AnySource,
    /// A new application removes every same-named instance first.
    Replaces,
}

/// Outcome of a stacking check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackingDecision {
    Create,
    /// Delete these effects, then create.
    Replace(Vec<EffectId>),
    Refuse,
}

impl StackingPolicy {
    /// Decides whether an effect named `name` granted by `source` may be created
    /// on a target that currently holds `existing`.
    pub fn decide(&self, existing: &[Effect], name: &str, source: Option<ActorId>) -> StackingDecision {
        match self {
            Self::AnySource => StackingDecision::Create,
            Self::Replaces => {
                let ids: Vec<EffectId> = existing
                    .iter()
                    .filter(|e| e.name == name)
                    .map(|e| e.id)
                    .collect();
                if ids.is_empty() {
                    StackingDecision::Create
                } else {
                    StackingDecision::Replace(ids)
                }
            }
            Self::DifferentSource => {
                let duplicate = existing
                    .iter()
                    .any(|e| e.name == name && source.is_some() && e.source == source);
                if duplicate {
                    StackingDecision::Refuse
                } else {
                    StackingDecision::Create
                }
            }
        }
    }
}

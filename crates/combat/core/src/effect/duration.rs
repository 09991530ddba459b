//! Duration rules and turn-boundary expiry tests.
//!
//! A rule is evaluated against the combat pointer captured when the effect
//! was created (`start`) and the pointer after a turn change (`now`). Only
//! forward progress can satisfy a rule; stepping back never revives or
//! expires anything on its own.

use crate::combat::CombatPointer;

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
pub enum DurationUnits {
    Rounds,
    Turns,
}

/// Turn-boundary duration types.
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
#[strum(serialize_all = "camelCase")]
pub enum Boundary {
    EndOfThis,
    EndOfNext,
    /// Shares the `EndOfThis` test; see DESIGN.md.
    StartOfNext,
}

/// Event-driven expiry.
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
#[strum(serialize_all = "camelCase")]
pub enum Qualifier {
    /// Ends after the owner's next new ability use.
    NextAbility,
    /// Ends the first time the owner takes damage.
    UntilDamage,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DurationRule {
    #[default]
    None,
    Amount { amount: u32, units: DurationUnits },
    Boundary { boundary: Boundary, units: DurationUnits },
    Qualifier(Qualifier),
}

impl DurationRule {
    pub fn has_qualifier(&self, qualifier: Qualifier) -> bool {
        matches!(self, Self::Qualifier(q) if *q == qualifier)
    }

    /// Whether a turn change to `now` satisfies this rule.
    ///
    /// `turns_per_round` converts round progress into elapsed turns for
    /// turn-counted amounts.
    pub fn is_expired(&self, start: CombatPointer, now: CombatPointer, turns_per_round: usize) -> bool {
        match *self {
            Self::None | Self::Qualifier(_) => false,
            Self::Boundary { boundary, units } => match (boundary, units) {
                (Boundary::EndOfThis | Boundary::StartOfNext, DurationUnits::Rounds) => {
                    now.round > start.round
                }
                (Boundary::EndOfThis | Boundary::StartOfNext, DurationUnits::Turns) => {
                    now.round > start.round || now.turn > start.turn
                }
                (Boundary::EndOfNext, DurationUnits::Rounds) => now.round > start.round + 1,
                (Boundary::EndOfNext, DurationUnits::Turns) => {
                    now.round > start.round && now.turn > start.turn
                }
            },
            Self::Amount { amount, units } => match units {
                DurationUnits::Rounds => i64::from(now.round) - i64::from(start.round) >= i64::from(amount),
                DurationUnits::Turns => {
                    start.turns_until(now, turns_per_round) >= i64::from(amount)
                }
            },
        }
    }
}

/// Rule and creation snapshot of an effect instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectDuration {
    pub rule: DurationRule,
    pub start: CombatPointer,
}

/// Index of the first rule, in declaration order, that says the effect expired.
pub fn first_expiring_rule(
    rules: &[DurationRule],
    start: CombatPointer,
    now: CombatPointer,
    turns_per_round: usize,
) -> Option<usize> {
    rules
        .iter()
        .position(|rule| rule.is_expired(start, now, turns_per_round))
}

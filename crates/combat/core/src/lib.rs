//! Deterministic combat rules shared by the runtime and offline tools.
//!
//! `combat-core` defines the canonical data model of the action economy
//! (actors, slots, abilities, effects, durations, combat ordering) and the
//! pure rule functions that operate on it. Nothing here awaits or performs
//! I/O; the runtime crate threads these types through persistence, the event
//! bus and the user-facing collaborators.
pub mod ability;
pub mod combat;
pub mod config;
pub mod dice;
pub mod effect;
pub mod error;
pub mod log;
pub mod state;

pub use ability::{Ability, AbilityKind, ActionType, Limitation, LimitationUnits, TargetMode};
pub use combat::{Combat, CombatPointer, Combatant, Direction, TurnChange};
pub use config::RulesConfig;
pub use dice::{DiceError, DiceExpr, DiceTerm, Keep, RollResult};
pub use effect::{
    Boundary, Change, ChangeMode, DurationRule, DurationUnits, Effect, EffectDuration, EffectFlags,
    EffectKey, EffectTemplate, Origin, Qualifier, StackingDecision, StackingPolicy,
    first_expiring_rule,
};
pub use error::{CombatError, ErrorSeverity};
pub use log::{ActionLogEntry, DamageResult, DamageState};
pub use state::{
    ActionState, Actor, ActorId, ActorKind, Attributes, EffectId, EnablerCandidate, ItemId,
    MessageId, ResolutionPath, ResourceError, ResourceKind, ResourceMeter, ResourcePools,
    SlotError, SlotRequest, SlotResolution, SlotTag, Status, UsedSlot,
};

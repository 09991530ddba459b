//! Unified error types surfaced by the engine API.
//!
//! Wraps failures from the rules, persistence and effect processors so
//! callers can bubble them up with consistent context, and classifies each
//! one into the error taxonomy that decides how it is reported.
use std::fmt;

use combat_core::{
    ActorId, CombatError, DiceError, EffectId, EffectKey, ItemId, MessageId, ResourceError,
    SlotError,
};
use thiserror::Error;

pub use crate::repository::RepositoryError;
use crate::guards::GuardKind;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{guard} rejected the action: {reason}")]
    GuardRejected { guard: GuardKind, reason: String },

    #[error("guard {guard} is not registered")]
    GuardNotRegistered { guard: GuardKind },

    #[error("no processor registered for effect key {key}")]
    UnregisteredEffectKey { key: EffectKey },

    #[error("invalid value {value:?} for effect key {key}")]
    InvalidChangeValue { key: EffectKey, value: String },

    #[error("actor {0} not found")]
    ActorNotFound(ActorId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("effect {effect} not found on {actor}")]
    EffectNotFound { actor: ActorId, effect: EffectId },

    #[error("log entry {0} not found")]
    LogEntryNotFound(MessageId),

    #[error("failed to apply effects to {target}")]
    EffectApplication {
        target: ActorId,
        #[source]
        source: Box<EngineError>,
    },

    #[error("no combat is active")]
    NoActiveCombat,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Dice(#[from] DiceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// How an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Expected refusal: warn the user, abort the action.
    GuardRejection,
    /// Unexpected failure while executing mechanics.
    ResolutionFailure,
    /// Failure confined to one target; other targets continue.
    EffectApplicationFailure,
    /// Storage failed. Never swallowed.
    PersistenceFailure,
    /// A handler or guard is missing.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::GuardRejection => "guard rejection",
            ErrorCategory::ResolutionFailure => "resolution failure",
            ErrorCategory::EffectApplicationFailure => "effect application failure",
            ErrorCategory::PersistenceFailure => "persistence failure",
            ErrorCategory::Configuration => "configuration",
        };
        write!(f, "{}", label)
    }
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GuardRejected { .. } | Self::Slot(_) | Self::Resource(_) => {
                ErrorCategory::GuardRejection
            }
            Self::GuardNotRegistered { .. } | Self::UnregisteredEffectKey { .. } | Self::Config(_) => {
                ErrorCategory::Configuration
            }
            Self::EffectApplication { .. } | Self::InvalidChangeValue { .. } => {
                ErrorCategory::EffectApplicationFailure
            }
            Self::Repository(_)
            | Self::ActorNotFound(_)
            | Self::ItemNotFound(_)
            | Self::EffectNotFound { .. }
            | Self::LogEntryNotFound(_) => ErrorCategory::PersistenceFailure,
            Self::Dice(_) | Self::NoActiveCombat => ErrorCategory::ResolutionFailure,
        }
    }

    /// Stable code for logs, reusing the rule error codes where available.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Slot(e) => e.error_code(),
            Self::Resource(e) => e.error_code(),
            Self::Dice(e) => e.error_code(),
            Self::GuardRejected { .. } => "GUARD_REJECTED",
            Self::GuardNotRegistered { .. } => "GUARD_NOT_REGISTERED",
            Self::UnregisteredEffectKey { .. } => "EFFECT_KEY_UNREGISTERED",
            Self::InvalidChangeValue { .. } => "EFFECT_VALUE_INVALID",
            Self::ActorNotFound(_) => "ACTOR_NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::EffectNotFound { .. } => "EFFECT_NOT_FOUND",
            Self::LogEntryNotFound(_) => "LOG_ENTRY_NOT_FOUND",
            Self::EffectApplication { .. } => "EFFECT_APPLICATION",
            Self::NoActiveCombat => "NO_ACTIVE_COMBAT",
            Self::Config(_) => "CONFIG",
            Self::Repository(_) => "REPOSITORY",
        }
    }

    pub fn is_persistence(&self) -> bool {
        self.category() == ErrorCategory::PersistenceFailure
    }

    pub(crate) fn rejected(guard: GuardKind, reason: impl Into<String>) -> Self {
        Self::GuardRejected {
            guard,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            EngineError::rejected(GuardKind::MeetsMpCost, "need 4 MP").category(),
            ErrorCategory::GuardRejection
        );
        assert_eq!(
            EngineError::Repository(RepositoryError::LockPoisoned).category(),
            ErrorCategory::PersistenceFailure
        );
        assert_eq!(
            EngineError::UnregisteredEffectKey {
                key: EffectKey::Other("LucidDreaming".into())
            }
            .category(),
            ErrorCategory::Configuration
        );
        let nested = EngineError::EffectApplication {
            target: ActorId(3),
            source: Box::new(EngineError::ItemNotFound(ItemId(9))),
        };
        assert_eq!(nested.category(), ErrorCategory::EffectApplicationFailure);
        assert!(!nested.is_persistence());
    }

    #[test]
    fn rule_errors_keep_their_codes() {
        let err: EngineError = SlotError::ReactionNotSlotted.into();
        assert_eq!(err.error_code(), "SLOT_REACTION");
    }
}

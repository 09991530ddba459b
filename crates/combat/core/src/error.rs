//! Common error infrastructure for combat-core.
//!
//! Domain-specific errors (`SlotError`, `DiceError`, `ResourceError`) live next
//! to the rules they validate and implement [`CombatError`] so callers can
//! classify them uniformly.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the rules refused the request; a different action may succeed
/// - **Validation**: malformed input such as an unparsable dice formula
/// - **Internal**: state that should be impossible under the slot/resource invariants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// The rules rejected the request; nothing was mutated.
    ///
    /// Examples: no action slot left, not enough MP.
    Recoverable,

    /// Invalid input that should not be retried unchanged.
    ///
    /// Examples: formula syntax errors, unknown attribute references.
    Validation,

    /// Unexpected state inconsistency. These indicate bugs.
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Common trait for all combat-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
/// - Error codes are stable strings suitable for logs and notifications
pub trait CombatError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a stable machine-readable code for this error.
    fn error_code(&self) -> &'static str;

    /// Returns true if the error is recoverable.
    fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }
}

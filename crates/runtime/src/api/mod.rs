//! Public engine API surface.
//!
//! Error types and the collaborator traits the engine consumes live here so
//! the orchestration modules can stay focused on rules.

pub mod errors;
pub mod providers;

pub use errors::{EngineError, ErrorCategory, Result};
pub use providers::{
    AutoPrompt, CollectingNotifier, Notification, NotificationLevel, Notifier, Prompt,
    RollEvaluator, RollModifiers, ScriptedPrompt, TracingNotifier,
};

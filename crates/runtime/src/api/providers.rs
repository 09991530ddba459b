//! Collaborators the engine consumes but does not own.
//!
//! Runtime users plug in implementations of [`RollEvaluator`], [`Notifier`]
//! and [`Prompt`] so the engine can run against real dice and dialogs, or
//! against scripted fixtures under test.
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use combat_core::{Ability, Actor, RollResult};
use tracing::{error, info, warn};

use super::errors::Result;

/// Extra dice and flat penalty collected before a check is rolled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollModifiers {
    pub bonus_dice: u32,
    pub penalty: u32,
}

/// Evaluates a dice formula into a structured result.
///
/// Implementations must be deterministic for a given die source so tests can
/// replay exact outcomes.
#[async_trait]
pub trait RollEvaluator: Send + Sync {
    async fn evaluate(&self, formula: &str, data: &BTreeMap<String, i64>) -> Result<RollResult>;
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Confirmation and roll-modifier dialogs.
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn confirm(&self, title: &str, body: &str) -> bool;

    /// `None` means the user cancelled.
    async fn roll_modifiers(&self, actor: &Actor, ability: &Ability) -> Option<RollModifiers>;
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        info!(target: "runtime::notify", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "runtime::notify", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "runtime::notify", "{}", message);
    }
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
#[strum(serialize_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Records every notification for later inspection.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(NotificationLevel::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NotificationLevel::Error)
    }

    fn push(&self, level: NotificationLevel, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                level,
                message: message.to_owned(),
            });
    }
}

impl Notifier for CollectingNotifier {
    fn info(&self, message: &str) {
        self.push(NotificationLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(NotificationLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(NotificationLevel::Error, message);
    }
}

/// Confirms everything and never adds modifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoPrompt;

#[async_trait]
impl Prompt for AutoPrompt {
    async fn confirm(&self, _title: &str, _body: &str) -> bool {
        true
    }

    async fn roll_modifiers(&self, _actor: &Actor, _ability: &Ability) -> Option<RollModifiers> {
        Some(RollModifiers::default())
    }
}

/// Replays queued answers, then behaves like [`AutoPrompt`].
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    confirms: Mutex<VecDeque<bool>>,
    modifiers: Mutex<VecDeque<Option<RollModifiers>>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm(self, answer: bool) -> Self {
        self.confirms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(answer);
        self
    }

    pub fn with_modifiers(self, answer: Option<RollModifiers>) -> Self {
        self.modifiers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(answer);
        self
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn confirm(&self, _title: &str, _body: &str) -> bool {
        self.confirms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(true)
    }

    async fn roll_modifiers(&self, _actor: &Actor, _ability: &Ability) -> Option<RollModifiers> {
        self.modifiers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Some(RollModifiers::default()))
    }
}

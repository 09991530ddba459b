//! Async orchestration of the combat action economy.
//!
//! This crate threads the pure rules of `combat-core` through persistence,
//! the event bus and the user-facing collaborators. Consumers build an
//! [`Engine`] and drive ability use, damage settlement and the combat turn
//! order through it.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the engine facade and its builder
//! - [`api`] exposes errors and the collaborator traits
//! - [`guards`] validates an ability use before anything is spent
//! - [`resolver`] performs the mechanical resolution
//! - [`pipeline`] and [`processors`] apply effects and their behaviors
//! - [`slots`], [`turns`] and [`duration`] manage the action economy over time
//! - [`events`] provides topic-based event routing
//! - [`repository`] provides the persistence adapters
pub mod api;
pub mod config;
pub mod context;
pub mod duration;
pub mod events;
pub mod guards;
pub mod pipeline;
pub mod processors;
pub mod repository;
pub mod resolver;
pub mod roll;
pub mod runtime;
pub mod slots;
pub mod turns;

pub use api::{
    AutoPrompt, CollectingNotifier, EngineError, ErrorCategory, Notifier, Prompt, Result,
    RollEvaluator, RollModifiers, ScriptedPrompt, TracingNotifier,
};
pub use config::EngineConfig;
pub use context::EngineContext;
pub use events::{Event, EventBus, EventHandler, HandlerCriticality, Topic};
pub use guards::{Guard, GuardChain, GuardInput, GuardKind};
pub use pipeline::EffectPipeline;
pub use processors::{EffectProcessor, EffectRegistry, ProcessOutcome};
pub use repository::{ActionLog, ActorStore, InMemoryStore, ItemStore, RepositoryError, Store};
pub use resolver::{ActionResolver, ActionResult, DamagePacket, ResolveOptions};
pub use roll::{DiceRoller, ScriptedRoller};
pub use runtime::{Engine, EngineBuilder};
pub use slots::SlotManager;
pub use turns::TurnController;

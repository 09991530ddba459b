//! Typed registry of effect-behavior processors.
//!
//! Every `custom`-mode [`Change`] carries an [`EffectKey`] that is resolved
//! against this registry. Keys without a registered processor fail closed with
//! [`EngineError::UnregisteredEffectKey`] instead of being ignored.
//!
//! Processors share one capability interface with four entry points, all with
//! no-op defaults:
//! - [`EffectProcessor::process`] for events routed through the bus
//! - [`EffectProcessor::on_created`] / [`EffectProcessor::on_removed`] for
//!   effect lifecycle hooks
//! - [`EffectProcessor::modify_damage`] for damage rewrites before rolling

mod damage;
mod dot;
mod enable_slot;
mod limiter;
mod proc_trigger;
mod transfer;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use combat_core::{Ability, Actor, ActorId, Change, Effect, EffectKey};
use tracing::{debug, error};

use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::events::{Event, EventHandler, HandlerCriticality, Topic};
use crate::resolver::DamagePacket;

pub use damage::{AbilityBaseDamageBuff, DamageDiceReroll, PrimaryBaseDamageBuff};
pub use dot::{DamageOverTimeProcessor, DamageOverTimeScanner};
pub use enable_slot::EnableCombatTurnSlot;
pub use limiter::AbilitiesLimiter;
pub use proc_trigger::ProcTriggerProcessor;
pub use transfer::EffectTransferProcessor;

/// What a processor decided about the event it handled.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Continue,
    /// The in-flight action must not proceed.
    Blocked,
    /// The in-flight ability was rewritten and must resolve in this form.
    Rewritten(Box<Ability>),
}

#[async_trait]
pub trait EffectProcessor: Send + Sync {
    fn key(&self) -> EffectKey;

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Important
    }

    async fn process(&self, _ctx: &EngineContext, _event: &Event) -> Result<ProcessOutcome> {
        Ok(ProcessOutcome::Continue)
    }

    async fn on_created(
        &self,
        _ctx: &EngineContext,
        _actor: ActorId,
        _effect: &Effect,
        _change: &Change,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_removed(
        &self,
        _ctx: &EngineContext,
        _actor: ActorId,
        _effect: &Effect,
        _change: &Change,
    ) -> Result<()> {
        Ok(())
    }

    async fn modify_damage(
        &self,
        _ctx: &EngineContext,
        _actor: &Actor,
        _change: &Change,
        _packet: &mut DamagePacket,
    ) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum Lifecycle {
    Created,
    Removed,
}

pub struct EffectRegistry {
    processors: HashMap<EffectKey, Arc<dyn EffectProcessor>>,
}

impl EffectRegistry {
    pub fn empty() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Registry with every built-in processor.
    pub fn standard() -> Self {
        let processors: [Arc<dyn EffectProcessor>; 8] = [
            Arc::new(DamageOverTimeProcessor),
            Arc::new(ProcTriggerProcessor),
            Arc::new(AbilitiesLimiter),
            Arc::new(EffectTransferProcessor),
            Arc::new(EnableCombatTurnSlot),
            Arc::new(PrimaryBaseDamageBuff),
            Arc::new(AbilityBaseDamageBuff),
            Arc::new(DamageDiceReroll),
        ];
        processors
            .into_iter()
            .fold(Self::empty(), |registry, p| registry.with(p))
    }

    pub fn with(mut self, processor: Arc<dyn EffectProcessor>) -> Self {
        self.register(processor);
        self
    }

    pub fn register(&mut self, processor: Arc<dyn EffectProcessor>) -> Option<Arc<dyn EffectProcessor>> {
        self.processors.insert(processor.key(), processor)
    }

    pub fn unregister(&mut self, key: &EffectKey) -> Option<Arc<dyn EffectProcessor>> {
        self.processors.remove(key)
    }

    pub fn get(&self, key: &EffectKey) -> Result<&Arc<dyn EffectProcessor>> {
        self.processors
            .get(key)
            .ok_or_else(|| EngineError::UnregisteredEffectKey { key: key.clone() })
    }

    pub fn contains(&self, key: &EffectKey) -> bool {
        self.processors.contains_key(key)
    }

    /// Routes an effect-topic event to the processor for its key.
    pub async fn dispatch(&self, ctx: &EngineContext, event: &Event) -> Result<ProcessOutcome> {
        let Some(key) = event.effect_key() else {
            return Ok(ProcessOutcome::Continue);
        };
        let processor = self.get(&key)?;
        debug!(target: "runtime::processors", %key, event = event.name(), "dispatching");
        processor.process(ctx, event).await
    }

    /// Runs `on_created` for each custom change of a freshly created effect.
    pub async fn created(&self, ctx: &EngineContext, actor: ActorId, effect: &Effect) -> Result<()> {
        self.lifecycle(ctx, actor, effect, Lifecycle::Created).await
    }

    /// Runs `on_removed` for each custom change of a deleted effect.
    pub async fn removed(&self, ctx: &EngineContext, actor: ActorId, effect: &Effect) -> Result<()> {
        self.lifecycle(ctx, actor, effect, Lifecycle::Removed).await
    }

    /// Unregistered keys and failing processors are reported per change so one
    /// bad change does not starve the others. Critical processors and
    /// persistence failures still propagate.
    async fn lifecycle(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        effect: &Effect,
        stage: Lifecycle,
    ) -> Result<()> {
        for change in effect.custom_changes() {
            let processor = match self.get(&change.key) {
                Ok(processor) => processor,
                Err(e) => {
                    error!(
                        target: "runtime::processors",
                        key = %change.key,
                        effect = %effect.name,
                        "no processor registered"
                    );
                    ctx.notifier.error(&e.to_string());
                    continue;
                }
            };
            let outcome = match stage {
                Lifecycle::Created => processor.on_created(ctx, actor, effect, change).await,
                Lifecycle::Removed => processor.on_removed(ctx, actor, effect, change).await,
            };
            if let Err(e) = outcome {
                if e.is_persistence() || processor.criticality() == HandlerCriticality::Critical {
                    return Err(e);
                }
                error!(
                    target: "runtime::processors",
                    key = %change.key,
                    effect = %effect.name,
                    stage = ?stage,
                    error = %e,
                    "processor hook failed"
                );
                ctx.notifier.error(&e.to_string());
            }
        }
        Ok(())
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Bus handler that forwards effect-topic events to the registry.
pub struct EffectDispatcher;

#[async_trait]
impl EventHandler for EffectDispatcher {
    fn name(&self) -> &'static str {
        "effect_dispatcher"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Effect]
    }

    async fn handle(&self, ctx: &EngineContext, event: &Event) -> Result<()> {
        ctx.effects.dispatch(ctx, event).await.map(|_| ())
    }
}

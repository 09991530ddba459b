//! Engine facade.
//!
//! [`Engine`] owns the explicit [`EngineContext`] and the guard chain, and
//! sequences one ability use: guards, the damage-only restriction, mechanical
//! resolution, procs, effect fan-out and finally slot consumption.
//! [`EngineBuilder`] wires default collaborators for anything not supplied.

use std::sync::Arc;

use combat_core::{ActorId, Combatant, DamageState, ItemId, MessageId, TargetMode, TurnChange};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::api::{
    AutoPrompt, EngineError, Notifier, Prompt, Result, RollEvaluator, TracingNotifier,
};
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::duration::DurationManager;
use crate::events::{Event, EventBus, EventHandler, Topic};
use crate::guards::{GuardChain, GuardInput, GuardKind};
use crate::pipeline::EffectPipeline;
use crate::processors::{DamageOverTimeScanner, EffectDispatcher, EffectRegistry, ProcessOutcome};
use crate::repository::{InMemoryStore, Store};
use crate::resolver::{ActionResolver, ActionResult, ResolveOptions};
use crate::roll::DiceRoller;
use crate::slots::SlotManager;
use crate::turns::TurnController;

pub struct Engine {
    ctx: EngineContext,
    guards: Arc<GuardChain>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Replaces the user's target selection.
    pub fn select_targets(&self, targets: Vec<ActorId>) {
        self.ctx.targets.set(targets);
    }

    /// Receives every event published on `topic` after its handlers ran.
    pub fn observe(&self, topic: Topic) -> Option<broadcast::Receiver<Event>> {
        self.ctx.bus.observe(topic)
    }

    /// Uses an ability with the default guard sequence for the current
    /// combat state.
    pub async fn use_ability(&self, actor: ActorId, item: ItemId) -> Result<ActionResult> {
        let sequence = GuardChain::default_sequence(self.ctx.in_combat().await);
        self.use_ability_with(actor, item, sequence).await
    }

    /// Uses an ability with an explicit guard sequence.
    ///
    /// Guard rejections and resolution failures are reported through the
    /// notifier and yield an unhandled result. Persistence failures propagate.
    pub async fn use_ability_with(
        &self,
        actor: ActorId,
        item: ItemId,
        sequence: &[GuardKind],
    ) -> Result<ActionResult> {
        let ctx = &self.ctx;
        let ability = ctx.require_item(item).await?;
        let mut input = GuardInput::new(actor, ability);
        if !self.guards.evaluate(ctx, &mut input, sequence).await? {
            return Ok(ActionResult::failed());
        }

        let mut ability = input.ability;
        let owner = ctx.require_actor(actor).await?;
        let limiter = owner
            .active_effects()
            .find(|e| e.name == ctx.config.rules.limiter_effect_name)
            .map(|e| e.id);
        if let Some(effect) = limiter {
            let pending = Event::AbilityPending {
                actor,
                ability: Box::new(ability.clone()),
                effect,
            };
            match ctx.effects.dispatch(ctx, &pending).await {
                Ok(ProcessOutcome::Continue) => {}
                Ok(ProcessOutcome::Blocked) => return Ok(ActionResult::failed()),
                Ok(ProcessOutcome::Rewritten(rewritten)) => ability = *rewritten,
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => {
                    error!(target: "runtime::engine", actor = %actor, error = %e, "restriction check failed");
                    ctx.notifier.error(&e.to_string());
                    return Ok(ActionResult::failed());
                }
            }
        }

        let targets = if ability.target == TargetMode::SelfOnly {
            vec![actor]
        } else {
            ctx.targets.get()
        };
        let options = ResolveOptions {
            modifiers: input.modifiers,
            targets,
        };
        let result = ActionResolver
            .execute(ctx, actor, ability.clone(), options)
            .await?;
        if !result.handled_successfully {
            return Ok(result);
        }

        if ability.proc_trigger.is_some() && !ability.procs.is_empty() {
            ctx.bus
                .publish(
                    ctx,
                    Event::ProcTrigger {
                        actor,
                        item: ability.id,
                        roll: result.roll.clone(),
                        targets: result.targets.clone(),
                    },
                )
                .await?;
        }

        EffectPipeline
            .handle_effects(ctx, actor, &ability, &result)
            .await?;

        if ctx.in_combat().await
            && let Some(message) = result.message
        {
            match SlotManager::mark_used(ctx, actor, &ability, message).await {
                Ok(_) => {}
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => {
                    warn!(target: "runtime::engine", actor = %actor, error = %e, "slot not consumed");
                    ctx.notifier.warn(&e.to_string());
                }
            }
        }

        Ok(result)
    }

    /// Deletes a log entry and rolls back its slot and MP cost.
    ///
    /// Returns `false` without touching anything once any of the entry's
    /// damage has been applied.
    pub async fn delete_log_entry(&self, id: MessageId) -> Result<bool> {
        let ctx = &self.ctx;
        let mut entry = ctx
            .store
            .entry(id)
            .await?
            .ok_or(EngineError::LogEntryNotFound(id))?;
        if entry.any_damage_applied() {
            ctx.notifier
                .warn("Damage from this action was already applied; revert it first");
            return Ok(false);
        }

        SlotManager::rollback(ctx, &mut entry).await?;
        ctx.store.remove_entry(id).await?;
        info!(target: "runtime::engine", entry = %id, actor = %entry.actor, "log entry deleted");
        Ok(true)
    }

    /// Applies a pending damage result. Barrier absorbs first.
    ///
    /// Returns the HP lost.
    pub async fn apply_damage(&self, id: MessageId, target: ActorId) -> Result<u32> {
        let ctx = &self.ctx;
        let mut entry = ctx
            .store
            .entry(id)
            .await?
            .ok_or(EngineError::LogEntryNotFound(id))?;
        let Some(result) = entry.damage.get_mut(&target) else {
            return Err(EngineError::ActorNotFound(target));
        };
        if result.state != DamageState::Pending {
            debug!(target: "runtime::engine", entry = %id, defender = %target, state = %result.state, "damage already settled");
            return Ok(0);
        }

        let amount = result.amount;
        let (absorbed, lost) = ctx
            .update_actor(target, |a| a.points.take_damage(amount))
            .await?;
        result.state = DamageState::Applied;
        ctx.store.update_entry(&entry).await?;
        info!(
            target: "runtime::engine",
            entry = %id,
            defender = %target,
            amount,
            absorbed,
            lost,
            "damage applied"
        );

        ctx.bus
            .publish(
                ctx,
                Event::Damaged {
                    actor: target,
                    amount,
                    source: Some(id),
                },
            )
            .await?;
        Ok(lost)
    }

    /// Settles a damage result without dealing it, or heals back damage that
    /// was applied.
    pub async fn revert_damage(&self, id: MessageId, target: ActorId) -> Result<()> {
        let ctx = &self.ctx;
        let mut entry = ctx
            .store
            .entry(id)
            .await?
            .ok_or(EngineError::LogEntryNotFound(id))?;
        let Some(result) = entry.damage.get_mut(&target) else {
            return Err(EngineError::ActorNotFound(target));
        };
        if result.state == DamageState::Reverted {
            return Ok(());
        }

        if result.state == DamageState::Applied {
            let amount = result.amount;
            ctx.update_actor(target, |a| a.points.hp.restore(amount))
                .await?;
        }
        result.state = DamageState::Reverted;
        ctx.store.update_entry(&entry).await?;
        debug!(target: "runtime::engine", entry = %id, defender = %target, "damage reverted");
        Ok(())
    }

    pub async fn start_combat(&self, combatants: Vec<Combatant>) -> Result<TurnChange> {
        TurnController::start_combat(&self.ctx, combatants).await
    }

    pub async fn next_turn(&self) -> Result<Option<TurnChange>> {
        TurnController::next_turn(&self.ctx).await
    }

    pub async fn previous_turn(&self) -> Result<Option<TurnChange>> {
        TurnController::previous_turn(&self.ctx).await
    }

    pub async fn end_combat(&self) -> Result<()> {
        TurnController::end_combat(&self.ctx).await
    }

    pub async fn add_combatant(&self, combatant: Combatant) -> Result<()> {
        TurnController::add_combatant(&self.ctx, combatant).await
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn Store>>,
    roller: Option<Arc<dyn RollEvaluator>>,
    notifier: Option<Arc<dyn Notifier>>,
    prompt: Option<Arc<dyn Prompt>>,
    guards: Option<GuardChain>,
    registry: Option<EffectRegistry>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: None,
            roller: None,
            notifier: None,
            prompt: None,
            guards: None,
            registry: None,
            handlers: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Persistence backend. Defaults to an empty [`InMemoryStore`].
    pub fn store<S: Store + 'static>(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Dice evaluator. Defaults to a [`DiceRoller`] seeded from the config.
    pub fn roller<R: RollEvaluator + 'static>(mut self, roller: Arc<R>) -> Self {
        self.roller = Some(roller);
        self
    }

    pub fn notifier<N: Notifier + 'static>(mut self, notifier: Arc<N>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn prompt<P: Prompt + 'static>(mut self, prompt: Arc<P>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Replaces the standard guard chain.
    pub fn guards(mut self, guards: GuardChain) -> Self {
        self.guards = Some(guards);
        self
    }

    /// Replaces the standard effect processors.
    pub fn registry(mut self, registry: EffectRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Subscribes an extra handler after the built-in ones.
    pub fn handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Result<Engine> {
        if self.config.event_buffer_size == 0 {
            return Err(EngineError::Config(
                "event_buffer_size must be at least 1".into(),
            ));
        }

        let bus = EventBus::with_capacity(self.config.event_buffer_size);
        bus.subscribe(Arc::new(DamageOverTimeScanner));
        bus.subscribe(Arc::new(DurationManager));
        bus.subscribe(Arc::new(EffectDispatcher));
        for handler in self.handlers {
            bus.subscribe(handler);
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let roller = self
            .roller
            .unwrap_or_else(|| Arc::new(DiceRoller::new(self.config.rng_seed)));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));
        let prompt = self.prompt.unwrap_or_else(|| Arc::new(AutoPrompt));
        let effects = Arc::new(self.registry.unwrap_or_default());

        let ctx = EngineContext::new(
            store,
            bus,
            effects,
            roller,
            notifier,
            prompt,
            Arc::new(self.config),
        );
        Ok(Engine {
            ctx,
            guards: Arc::new(self.guards.unwrap_or_default()),
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

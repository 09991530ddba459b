//! Copies an effect onto the owner's allies and removes the copies again.

use async_trait::async_trait;
use combat_core::{
    ActorId, Change, CombatPointer, DurationRule, Effect, EffectDuration, EffectKey,
    StackingPolicy,
};
use tracing::{debug, error};

use super::{EffectProcessor, ProcessOutcome};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::events::Event;
use crate::pipeline::EffectPipeline;

/// Clones carry no duration of their own; the origin item's rules expire them.
/// They are written straight to the store, so creating one never re-enters
/// this processor.
pub struct EffectTransferProcessor;

impl EffectTransferProcessor {
    async fn transfer(&self, ctx: &EngineContext, actor: ActorId, effect: &Effect) -> Result<()> {
        if effect.flags.transferred_by.is_some() {
            return Ok(());
        }
        let Some(combat) = ctx.combat().await else {
            debug!(target: "runtime::processors", effect = %effect.name, "no combat, nothing to transfer");
            return Ok(());
        };
        let start = combat.pointer();

        for ally in combat.allies_of(actor) {
            if let Err(e) = self.copy_to(ctx, actor, ally, effect, start).await {
                if e.is_persistence() {
                    return Err(e);
                }
                error!(target: "runtime::processors", ally = %ally, error = %e, "transfer failed");
                let message = e.to_string();
                let wrapped = EngineError::EffectApplication {
                    target: ally,
                    source: Box::new(e),
                };
                ctx.notifier.error(&format!("{wrapped}: {message}"));
            }
        }
        Ok(())
    }

    async fn copy_to(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        ally: ActorId,
        effect: &Effect,
        start: CombatPointer,
    ) -> Result<()> {
        let target = ctx.require_actor(ally).await?;
        if effect.flags.stackable == StackingPolicy::Replaces {
            let pipeline = EffectPipeline;
            for existing in target.effects.iter().filter(|e| e.name == effect.name) {
                pipeline.delete_effect(ctx, ally, existing.id).await?;
            }
        }

        let mut clone = effect.clone();
        clone.duration = EffectDuration {
            rule: DurationRule::None,
            start,
        };
        clone.disabled = false;
        clone.flags.transferred_by = Some(actor);
        clone.flags.pending_deletion = false;
        let id = ctx.store.create_effect(ally, clone).await?;
        debug!(
            target: "runtime::processors",
            from = %actor,
            to = %ally,
            effect = %effect.name,
            id = %id,
            "effect transferred"
        );
        Ok(())
    }

    /// Deletes every clone `actor` handed out under this effect's name.
    async fn remove(&self, ctx: &EngineContext, actor: ActorId, effect: &Effect) -> Result<()> {
        if effect.flags.transferred_by.is_some() {
            return Ok(());
        }
        let pipeline = EffectPipeline;
        for holder in ctx.store.actors().await? {
            let clones = holder
                .effects
                .iter()
                .filter(|e| e.flags.transferred_by == Some(actor) && e.name == effect.name);
            for clone in clones {
                pipeline.delete_effect(ctx, holder.id, clone.id).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EffectProcessor for EffectTransferProcessor {
    fn key(&self) -> EffectKey {
        EffectKey::TransferEffectToAllies
    }

    async fn process(&self, ctx: &EngineContext, event: &Event) -> Result<ProcessOutcome> {
        match event {
            Event::TransferEffectToAllies { actor, effect } => {
                self.transfer(ctx, *actor, effect).await?
            }
            Event::TransferEffectToAlliesDelete { actor, effect } => {
                self.remove(ctx, *actor, effect).await?
            }
            _ => {}
        }
        Ok(ProcessOutcome::Continue)
    }

    async fn on_created(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        effect: &Effect,
        _change: &Change,
    ) -> Result<()> {
        self.transfer(ctx, actor, effect).await
    }

    async fn on_removed(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        effect: &Effect,
        _change: &Change,
    ) -> Result<()> {
        self.remove(ctx, actor, effect).await
    }
}

//! Prerequisite effects and roll modifiers.
//!
//! `hasRequiredEffects` only flags one instance per prerequisite; they are
//! consumed by `hasModifiers` once the user commits to the roll, or unflagged
//! if the user backs out or a later guard rejects.

use async_trait::async_trait;
use combat_core::{ActorId, EffectId};
use tracing::debug;

use super::{Guard, GuardInput, GuardKind};
use crate::api::{EngineError, Result, RollModifiers};
use crate::context::EngineContext;
use crate::events::Event;
use crate::pipeline::EffectPipeline;

pub struct HasRequiredEffects;

#[async_trait]
impl Guard for HasRequiredEffects {
    fn kind(&self) -> GuardKind {
        GuardKind::HasRequiredEffects
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        if input.ability.requires.is_empty() {
            return Ok(());
        }
        let actor = ctx.require_actor(input.actor).await?;

        let mut matched: Vec<EffectId> = Vec::new();
        for required in &input.ability.requires {
            let name = ctx.store.item(*required).await?.map(|item| item.name);
            // one instance per requirement, never one already claimed
            let hit = actor
                .active_effects()
                .filter(|e| !matched.contains(&e.id))
                .find(|e| {
                    e.origin_item() == Some(*required) || name.as_deref() == Some(e.name.as_str())
                })
                .map(|e| e.id);
            let Some(hit) = hit else {
                let label = name.unwrap_or_else(|| required.to_string());
                return Err(EngineError::rejected(
                    self.kind(),
                    format!("{} requires {label}", input.ability.name),
                ));
            };
            matched.push(hit);
        }

        for id in matched {
            set_pending(ctx, input.actor, id, true).await?;
            if !input.pending_deletion.contains(&id) {
                input.pending_deletion.push(id);
            }
        }
        Ok(())
    }
}

/// Collects roll modifiers for checked abilities and finalizes prerequisites.
pub struct HasModifiers;

#[async_trait]
impl Guard for HasModifiers {
    fn kind(&self) -> GuardKind {
        GuardKind::HasModifiers
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        let modifiers = if input.ability.has_check() {
            let actor = ctx.require_actor(input.actor).await?;
            match ctx.prompt.roll_modifiers(&actor, &input.ability).await {
                Some(modifiers) => modifiers,
                None => {
                    release_pending(ctx, input).await?;
                    return Err(EngineError::rejected(self.kind(), "roll cancelled"));
                }
            }
        } else {
            RollModifiers::default()
        };

        let pipeline = EffectPipeline;
        for id in std::mem::take(&mut input.pending_deletion) {
            pipeline.delete_effect(ctx, input.actor, id).await?;
        }
        debug!(
            target: "runtime::guards",
            actor = %input.actor,
            bonus_dice = modifiers.bonus_dice,
            penalty = modifiers.penalty,
            "modifiers finalized"
        );
        input.modifiers = Some(modifiers);

        ctx.bus
            .publish(
                ctx,
                Event::ModifiersFinalized {
                    actor: input.actor,
                    item: input.ability.id,
                    modifiers,
                },
            )
            .await
    }
}

/// Unflags every prerequisite marked so far.
pub(super) async fn release_pending(ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
    for id in std::mem::take(&mut input.pending_deletion) {
        set_pending(ctx, input.actor, id, false).await?;
    }
    Ok(())
}

async fn set_pending(ctx: &EngineContext, actor: ActorId, id: EffectId, pending: bool) -> Result<()> {
    let owner = ctx.require_actor(actor).await?;
    let Some(effect) = owner.effect(id) else {
        return Ok(());
    };
    let mut effect = effect.clone();
    effect.flags.pending_deletion = pending;
    ctx.store.update_effect(actor, &effect).await?;
    Ok(())
}

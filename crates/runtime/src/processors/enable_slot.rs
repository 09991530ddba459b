use async_trait::async_trait;
use combat_core::{ActorId, Change, Effect, EffectKey, SlotTag};
use tracing::debug;

use super::{EffectProcessor, ProcessOutcome};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::events::Event;

/// Opens the named custom slot on the effect owner's action state.
///
/// Granting is idempotent: a slot that is already available is left alone.
pub struct EnableCombatTurnSlot;

impl EnableCombatTurnSlot {
    async fn grant(&self, ctx: &EngineContext, actor: ActorId, change: &Change) -> Result<()> {
        let name = change.value.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidChangeValue {
                key: change.key.clone(),
                value: change.value.clone(),
            });
        }
        let slot = SlotTag::from_name(name);
        let granted = ctx
            .update_actor(actor, |a| a.action_state.grant(slot.clone()))
            .await?;
        debug!(target: "runtime::processors", actor = %actor, %slot, granted, "slot enabled");
        Ok(())
    }
}

#[async_trait]
impl EffectProcessor for EnableCombatTurnSlot {
    fn key(&self) -> EffectKey {
        EffectKey::EnableCombatTurnSlot
    }

    async fn process(&self, ctx: &EngineContext, event: &Event) -> Result<ProcessOutcome> {
        if let Event::EnableCombatTurnSlot { actor, change, .. } = event {
            self.grant(ctx, *actor, change).await?;
        }
        Ok(ProcessOutcome::Continue)
    }

    async fn on_created(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        _effect: &Effect,
        change: &Change,
    ) -> Result<()> {
        self.grant(ctx, actor, change).await
    }
}

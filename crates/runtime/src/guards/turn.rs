//! Guards over turn order and the action economy.

use async_trait::async_trait;

use super::{Guard, GuardInput, GuardKind};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::slots::SlotManager;

/// Blocks a new action while an earlier one still has damage to apply.
pub struct HasNoUnappliedDamage;

#[async_trait]
impl Guard for HasNoUnappliedDamage {
    fn kind(&self) -> GuardKind {
        GuardKind::HasNoUnappliedDamage
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        let entries = ctx.store.entries_for(input.actor).await?;
        match entries.iter().find(|e| e.has_pending_damage()) {
            Some(entry) => Err(EngineError::rejected(
                self.kind(),
                format!("apply or revert the damage of {} first", entry.id),
            )),
            None => Ok(()),
        }
    }
}

/// Reactions may be used at any time; everything else waits for the turn.
pub struct IsActorsTurn;

#[async_trait]
impl Guard for IsActorsTurn {
    fn kind(&self) -> GuardKind {
        GuardKind::IsActorsTurn
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        if input.ability.is_reaction() {
            return Ok(());
        }
        let combat = ctx.combat().await.ok_or(EngineError::NoActiveCombat)?;
        match combat.current() {
            Some(current) if current.actor == input.actor => Ok(()),
            _ => Err(EngineError::rejected(self.kind(), "it is not your turn")),
        }
    }
}

/// One reaction per round.
pub struct IsReaction;

#[async_trait]
impl Guard for IsReaction {
    fn kind(&self) -> GuardKind {
        GuardKind::IsReaction
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        if !input.ability.is_reaction() {
            return Ok(());
        }
        let actor = ctx.require_actor(input.actor).await?;
        if actor.action_state.used_reaction {
            return Err(EngineError::rejected(
                self.kind(),
                format!("{} already reacted this round", actor.name),
            ));
        }
        Ok(())
    }
}

pub struct HasAvailableActionSlot;

#[async_trait]
impl Guard for HasAvailableActionSlot {
    fn kind(&self) -> GuardKind {
        GuardKind::HasAvailableActionSlot
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        if input.ability.is_reaction() {
            return Ok(());
        }
        let actor = ctx.require_actor(input.actor).await?;
        SlotManager::resolve(ctx, &actor, &input.ability).await?;
        Ok(())
    }
}

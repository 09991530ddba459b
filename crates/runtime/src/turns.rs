//! Combat lifecycle and the round/turn pointer.
//!
//! Pointer moves and the reaction reset for every combatant happen under one
//! write lock, so no reader ever sees a new pointer with stale reaction flags.
//! The combat update is published after the lock is released; duration sweeps
//! and damage-over-time react to it.

use combat_core::{ActorId, Combat, Combatant, LimitationUnits, Status, TurnChange};
use tracing::{debug, info};

use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::events::Event;
use crate::pipeline::EffectPipeline;
use crate::slots::SlotManager;

pub struct TurnController;

impl TurnController {
    /// Cleans up every combatant, orders them and begins round 1.
    pub async fn start_combat(ctx: &EngineContext, combatants: Vec<Combatant>) -> Result<TurnChange> {
        let actors: Vec<ActorId> = combatants.iter().map(|c| c.actor).collect();
        Self::cleanup(ctx, &actors).await?;

        let (change, combat) = {
            let mut slot = ctx.combat_slot().write().await;
            let mut combat = Combat::new(combatants);
            let change = combat.start();
            if let Some(first) = combat.current() {
                ctx.update_actor(first.actor, SlotManager::reset_turn).await?;
            }
            *slot = Some(combat.clone());
            (change, combat)
        };

        info!(
            target: "runtime::turns",
            combatants = combat.turns_per_round(),
            first = ?combat.current().map(|c| c.actor),
            "combat started"
        );
        ctx.bus
            .publish(ctx, Event::CombatUpdated { change, combat })
            .await?;
        Ok(change)
    }

    pub async fn next_turn(ctx: &EngineContext) -> Result<Option<TurnChange>> {
        Self::advance(ctx, true).await
    }

    /// Steps back one turn. `None` at the very first turn.
    pub async fn previous_turn(ctx: &EngineContext) -> Result<Option<TurnChange>> {
        Self::advance(ctx, false).await
    }

    async fn advance(ctx: &EngineContext, forward: bool) -> Result<Option<TurnChange>> {
        let (change, combat) = {
            let mut slot = ctx.combat_slot().write().await;
            let combat = slot.as_mut().ok_or(EngineError::NoActiveCombat)?;
            let moved = if forward {
                combat.next_turn()
            } else {
                combat.previous_turn()
            };
            let Some(change) = moved else {
                debug!(target: "runtime::turns", forward, "pointer did not move");
                return Ok(None);
            };

            for combatant in combat.combatants() {
                ctx.update_actor(combatant.actor, |a| a.action_state.used_reaction = false)
                    .await?;
            }
            if forward && let Some(incoming) = combat.current().map(|c| c.actor) {
                ctx.update_actor(incoming, SlotManager::reset_turn).await?;
                Self::reset_uses(ctx, incoming, &[LimitationUnits::Turn]).await?;
            }
            (change, combat.clone())
        };

        debug!(
            target: "runtime::turns",
            round = change.current.round,
            turn = change.current.turn,
            direction = %change.direction,
            "turn changed"
        );
        ctx.bus
            .publish(ctx, Event::CombatUpdated { change, combat })
            .await?;
        Ok(Some(change))
    }

    /// Ends the active combat and cleans up its combatants.
    pub async fn end_combat(ctx: &EngineContext) -> Result<()> {
        let combat = ctx
            .combat_slot()
            .write()
            .await
            .take()
            .ok_or(EngineError::NoActiveCombat)?;
        let actors: Vec<ActorId> = combat.combatants().iter().map(|c| c.actor).collect();
        Self::cleanup(ctx, &actors).await?;
        info!(target: "runtime::turns", rounds = combat.round(), "combat ended");
        Ok(())
    }

    /// Adds a combatant mid-fight and gives them fresh slots.
    pub async fn add_combatant(ctx: &EngineContext, combatant: Combatant) -> Result<()> {
        let mut slot = ctx.combat_slot().write().await;
        let combat = slot.as_mut().ok_or(EngineError::NoActiveCombat)?;
        if combat.contains(combatant.actor) {
            return Ok(());
        }
        let actor = combatant.actor;
        combat.add_combatant(combatant);
        ctx.update_actor(actor, SlotManager::reset_all).await?;
        debug!(target: "runtime::turns", actor = %actor, "combatant added");
        Ok(())
    }

    /// Shared start/end cleanup: limited uses, effects, statuses and action state.
    ///
    /// Effects and statuses that are persistent conditions survive. Transferred
    /// clones that survive are disabled.
    async fn cleanup(ctx: &EngineContext, actors: &[ActorId]) -> Result<()> {
        let pipeline = EffectPipeline;
        for &id in actors {
            Self::reset_uses(ctx, id, &[LimitationUnits::Combat, LimitationUnits::Turn]).await?;

            let actor = ctx.require_actor(id).await?;
            let doomed: Vec<_> = actor
                .effects
                .iter()
                .filter(|e| e.flags.transferred_by.is_none() && !e.grants_persistent_condition())
                .map(|e| e.id)
                .collect();
            for effect in doomed {
                pipeline.delete_effect(ctx, id, effect).await?;
            }

            let disabled = ctx
                .update_actor(id, |a| {
                    a.statuses.retain(Status::is_persistent);
                    SlotManager::reset_all(a);
                    let mut disabled = 0;
                    for effect in a.effects.iter_mut().filter(|e| e.flags.transferred_by.is_some()) {
                        effect.disabled = true;
                        disabled += 1;
                    }
                    disabled
                })
                .await?;
            debug!(target: "runtime::turns", actor = %id, disabled, "combatant cleaned up");
        }
        Ok(())
    }

    async fn reset_uses(ctx: &EngineContext, actor: ActorId, units: &[LimitationUnits]) -> Result<()> {
        for mut item in ctx.store.items_owned_by(actor).await? {
            let resets = item
                .limitation
                .is_some_and(|limit| units.contains(&limit.units));
            if resets && item.uses > 0 {
                item.uses = 0;
                ctx.store.save_item(&item).await?;
            }
        }
        Ok(())
    }
}

//! Slot bookkeeping around the pure [`ActionState`] machine.
//!
//! [`ActionState::resolve`] only sees data; this module gathers the enabler
//! candidates from the actor's effects and their origin items, persists the
//! consumed slot against the log entry that spent it, and undoes that when the
//! entry is deleted.

use combat_core::{
    Ability, ActionLogEntry, ActionState, ActionType, Actor, ActorId, EffectKey, EnablerCandidate,
    MessageId, RulesConfig, SlotRequest, SlotResolution, Status,
};
use tracing::{debug, info};

use crate::api::Result;
use crate::context::EngineContext;
use crate::pipeline::EffectPipeline;

pub struct SlotManager;

impl SlotManager {
    /// Active effects that can authorize a custom slot.
    pub async fn enabler_candidates(ctx: &EngineContext, actor: &Actor) -> Result<Vec<EnablerCandidate>> {
        let mut candidates = Vec::new();
        for effect in actor.active_effects() {
            let granted_slots: Vec<String> = effect
                .custom_changes()
                .filter(|c| c.key == EffectKey::EnableCombatTurnSlot)
                .map(|c| c.value.trim().to_owned())
                .collect();
            let tagged_enabler = effect.has_tag(RulesConfig::ENABLER_TAG);
            if granted_slots.is_empty() && !tagged_enabler {
                continue;
            }

            let origin_tags = match effect.origin_item() {
                Some(id) => ctx
                    .store
                    .item(id)
                    .await?
                    .map(|item| {
                        item.tags
                            .into_iter()
                            .filter(|t| t != RulesConfig::ENABLER_TAG)
                            .collect()
                    })
                    .unwrap_or_default(),
                None => Vec::new(),
            };

            candidates.push(EnablerCandidate {
                effect: effect.id,
                origin_item: effect.origin_item(),
                granted_slots,
                origin_tags,
                tagged_enabler,
            });
        }
        Ok(candidates)
    }

    /// Finds the slot `ability` would consume without spending it.
    pub async fn resolve(ctx: &EngineContext, actor: &Actor, ability: &Ability) -> Result<SlotResolution> {
        let candidates = Self::enabler_candidates(ctx, actor).await?;
        let request = SlotRequest {
            action_type: ability.action_type,
            tags: &ability.tags,
            enabler: ability.tags.contains(RulesConfig::ENABLER_TAG),
        };
        Ok(actor.action_state.resolve(request, &candidates)?)
    }

    /// Spends the slot for a resolved action and binds it to `result`.
    ///
    /// Reactions only flag the round's reaction as used. A slot authorized by
    /// an enabler effect, either a tagged enabler or the effect that opened the
    /// consumed custom slot, also spends one use of the effect's origin item
    /// and removes the effect.
    pub async fn mark_used(
        ctx: &EngineContext,
        actor: ActorId,
        ability: &Ability,
        result: MessageId,
    ) -> Result<Option<SlotResolution>> {
        let mut owner = ctx.require_actor(actor).await?;
        if ability.is_reaction() {
            owner.action_state.used_reaction = true;
            ctx.store.save_actor(&owner).await?;
            debug!(target: "runtime::slots", actor = %actor, %result, "reaction used");
            return Ok(None);
        }

        let resolution = Self::resolve(ctx, &owner, ability).await?;
        owner
            .action_state
            .consume(&resolution, ability.action_type, result)?;
        ctx.store.save_actor(&owner).await?;
        info!(
            target: "runtime::slots",
            actor = %owner.name,
            ability = %ability.name,
            slot = %resolution.slot,
            path = ?resolution.path,
            %result,
            "slot consumed"
        );

        if let Some(candidate) = &resolution.enabler {
            Self::spend_enabler(ctx, actor, candidate).await?;
        }
        Ok(Some(resolution))
    }

    async fn spend_enabler(ctx: &EngineContext, actor: ActorId, candidate: &EnablerCandidate) -> Result<()> {
        if let Some(id) = candidate.origin_item
            && let Some(mut item) = ctx.store.item(id).await?
        {
            item.uses += 1;
            ctx.store.save_item(&item).await?;
        }
        EffectPipeline.delete_effect(ctx, actor, candidate.effect).await?;
        debug!(target: "runtime::slots", actor = %actor, effect = %candidate.effect, "enabler spent");
        Ok(())
    }

    /// Returns the slot and MP spent by `entry`.
    ///
    /// Safe to call repeatedly: a slot is restored only while a used entry
    /// still references the result, and the MP refund is taken once.
    pub async fn rollback(ctx: &EngineContext, entry: &mut ActionLogEntry) -> Result<bool> {
        let refund = entry.take_refund();
        let is_reaction = entry.action_type == ActionType::Reaction;
        let id = entry.id;

        let restored = ctx
            .update_actor(entry.actor, |a| {
                let slot = a.action_state.restore(id);
                if let Some(amount) = refund {
                    a.points.mp.restore(amount);
                }
                if is_reaction {
                    a.action_state.used_reaction = false;
                }
                slot
            })
            .await?;
        if refund.is_some() {
            ctx.store.update_entry(entry).await?;
        }

        debug!(
            target: "runtime::slots",
            actor = %entry.actor,
            result = %id,
            slot = ?restored.as_ref().map(|u| u.slot.to_string()),
            refund = refund.unwrap_or(0),
            "action rolled back"
        );
        Ok(restored.is_some() || refund.is_some())
    }

    /// Turn-start reset: base slots, the focus bonus and movement.
    ///
    /// Focus pays out its bonus secondary here and then lapses, so it lasts
    /// from the sacrificed movement until the owner's next turn.
    pub fn reset_turn(actor: &mut Actor) {
        let focus = actor.toggle_status(Status::Focus, false);
        actor.action_state.reset(focus);
        actor.has_moved = false;
    }

    /// Out-of-combat reset: fresh slots and no used reaction.
    pub fn reset_all(actor: &mut Actor) {
        actor.action_state = ActionState::default();
        actor.has_moved = false;
    }
}

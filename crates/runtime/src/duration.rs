//! Effect expiry.
//!
//! Turn-boundary rules are swept on every combat update; qualifier rules
//! react to damage and ability-use events. An effect's rules come from its
//! origin item when that item declares any, otherwise from the effect itself.
//! The first rule in declaration order that reports expiry decides.

use async_trait::async_trait;
use combat_core::{
    Actor, ActorId, Combat, DurationRule, Effect, EffectId, ItemId, Qualifier, first_expiring_rule,
};
use tracing::{debug, info};

use crate::api::Result;
use crate::context::EngineContext;
use crate::events::{Event, EventHandler, HandlerCriticality, Topic};
use crate::pipeline::EffectPipeline;

pub struct DurationManager;

impl DurationManager {
    async fn rules_for(ctx: &EngineContext, effect: &Effect) -> Result<Vec<DurationRule>> {
        if let Some(id) = effect.origin_item()
            && let Some(item) = ctx.store.item(id).await?
            && !item.durations.is_empty()
        {
            return Ok(item.durations);
        }
        Ok(vec![effect.duration.rule])
    }

    /// Deletes every effect whose turn-boundary rules are satisfied at the
    /// combat's current pointer.
    pub async fn sweep(ctx: &EngineContext, combat: &Combat) -> Result<usize> {
        let now = combat.pointer();
        let turns_per_round = combat.turns_per_round();
        let mut expired = 0;

        for actor in ctx.store.actors().await? {
            for effect in actor.active_effects() {
                let rules = Self::rules_for(ctx, effect).await?;
                let Some(index) = first_expiring_rule(&rules, effect.duration.start, now, turns_per_round)
                else {
                    continue;
                };
                info!(
                    target: "runtime::duration",
                    actor = %actor.name,
                    effect = %effect.name,
                    rule = ?rules[index],
                    start = ?effect.duration.start,
                    now = ?now,
                    "effect expired"
                );
                EffectPipeline.delete_effect(ctx, actor.id, effect.id).await?;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn qualified(
        ctx: &EngineContext,
        actor: &Actor,
        qualifier: Qualifier,
    ) -> Result<Vec<(EffectId, String, Option<ItemId>)>> {
        let mut hits = Vec::new();
        for effect in actor.active_effects() {
            let rules = Self::rules_for(ctx, effect).await?;
            if rules.iter().any(|r| r.has_qualifier(qualifier)) {
                hits.push((effect.id, effect.name.clone(), effect.origin_item()));
            }
        }
        Ok(hits)
    }

    async fn on_damage(ctx: &EngineContext, actor: ActorId) -> Result<()> {
        let owner = ctx.require_actor(actor).await?;
        for (id, name, _) in Self::qualified(ctx, &owner, Qualifier::UntilDamage).await? {
            debug!(target: "runtime::duration", actor = %owner.name, effect = %name, "ended by damage");
            EffectPipeline.delete_effect(ctx, actor, id).await?;
        }
        Ok(())
    }

    /// `nextAbility` effects end on the owner's next ability, except the
    /// ability that created them.
    async fn on_ability_use(ctx: &EngineContext, actor: ActorId, item: ItemId) -> Result<()> {
        let owner = ctx.require_actor(actor).await?;
        let used_name = ctx.store.item(item).await?.map(|i| i.name);

        for (id, name, origin) in Self::qualified(ctx, &owner, Qualifier::NextAbility).await? {
            let origin_name = match origin {
                Some(origin) => ctx.store.item(origin).await?.map(|i| i.name),
                None => None,
            };
            let is_origin = origin == Some(item)
                || match origin_name {
                    Some(origin_name) => used_name.as_ref() == Some(&origin_name),
                    None => used_name.as_deref() == Some(name.as_str()),
                };
            if is_origin {
                continue;
            }
            debug!(target: "runtime::duration", actor = %owner.name, effect = %name, "ended by ability use");
            EffectPipeline.delete_effect(ctx, actor, id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for DurationManager {
    fn name(&self) -> &'static str {
        "duration_manager"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Ability, Topic::Damage, Topic::Combat]
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Important
    }

    async fn handle(&self, ctx: &EngineContext, event: &Event) -> Result<()> {
        match event {
            Event::CombatUpdated { combat, .. } => {
                let expired = Self::sweep(ctx, combat).await?;
                debug!(target: "runtime::duration", expired, "sweep complete");
            }
            Event::Damaged { actor, .. } => Self::on_damage(ctx, *actor).await?,
            Event::AbilityUsed {
                actor,
                item,
                is_new_ability_use: true,
            } => Self::on_ability_use(ctx, *actor, *item).await?,
            _ => {}
        }
        Ok(())
    }
}

//! Fans a resolved action out into effect instances.
//!
//! Grants land on the targets, source grants on the user, and enablers are
//! processed whether the check hit or not. Every created effect runs the
//! `on_created` hook of its custom changes; every deletion through
//! [`EffectPipeline::delete_effect`] runs `on_removed`.

mod enabler;

use combat_core::{
    Ability, ActorId, DurationRule, Effect, EffectId, EffectTemplate, ItemId, Origin,
    StackingDecision, StackingPolicy,
};
use tracing::{debug, error, warn};

use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::resolver::ActionResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct EffectPipeline;

impl EffectPipeline {
    /// Applies the effects carried by `refs` to every target on behalf of
    /// `granting`.
    ///
    /// A failure on one target is reported and the remaining targets still
    /// receive their effects. Persistence failures abort.
    pub async fn apply_granted(
        &self,
        ctx: &EngineContext,
        granting: &Ability,
        refs: &[ItemId],
        targets: &[ActorId],
        source: ActorId,
    ) -> Result<()> {
        if refs.is_empty() || targets.is_empty() {
            return Ok(());
        }

        let mut carriers = Vec::with_capacity(refs.len());
        for id in refs {
            match ctx.store.item(*id).await? {
                Some(item) => carriers.push(item),
                None => {
                    warn!(target: "runtime::pipeline", item = %id, granting = %granting.name, "effect item missing");
                }
            }
        }

        for &target in targets {
            for carrier in &carriers {
                let outcome = self
                    .apply_templates(ctx, granting, &carrier.effects, target, source)
                    .await;
                self.report(ctx, target, outcome)?;
            }
        }
        Ok(())
    }

    /// Applies an item's own effects to `actor`. Used for enablers and procs.
    pub async fn add_linked_effects(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        item: &Ability,
        source: ActorId,
    ) -> Result<()> {
        let outcome = self
            .apply_templates(ctx, item, &item.effects, actor, source)
            .await;
        self.report(ctx, actor, outcome)
    }

    /// Runs the post-resolution effect steps of `ability`.
    pub async fn handle_effects(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        ability: &Ability,
        result: &ActionResult,
    ) -> Result<()> {
        let missed = ctx.config.grants_require_success && result.is_success == Some(false);
        if missed {
            debug!(target: "runtime::pipeline", ability = %ability.name, "check failed, grants skipped");
        } else {
            self.apply_granted(ctx, ability, &ability.grants, &result.targets, actor)
                .await?;
            self.apply_granted(ctx, ability, &ability.source_grants, &[actor], actor)
                .await?;
        }

        for id in &ability.enables {
            self.process_enabler(ctx, actor, *id).await?;
        }
        Ok(())
    }

    /// Deletes an effect and runs the `on_removed` hooks of its changes.
    pub async fn delete_effect(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        effect: EffectId,
    ) -> Result<Option<Effect>> {
        let removed = ctx.store.delete_effect(actor, effect).await?;
        if let Some(effect) = &removed {
            debug!(target: "runtime::pipeline", actor = %actor, effect = %effect.name, id = %effect.id, "effect deleted");
            ctx.effects.removed(ctx, actor, effect).await?;
        }
        Ok(removed)
    }

    async fn apply_templates(
        &self,
        ctx: &EngineContext,
        granting: &Ability,
        templates: &[EffectTemplate],
        target: ActorId,
        source: ActorId,
    ) -> Result<()> {
        for template in templates {
            let actor = ctx.require_actor(target).await?;

            if template.is_status_grant() {
                let missing: Vec<_> = template
                    .statuses
                    .iter()
                    .filter(|s| !actor.has_status(s))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    ctx.update_actor(target, |a| {
                        for status in missing {
                            a.toggle_status(status, true);
                        }
                    })
                    .await?;
                }
                continue;
            }

            let origin = Origin::Item(granting.id);
            let already_applied = actor
                .effects
                .iter()
                .any(|e| e.name == template.name && e.origin == Some(origin));
            if already_applied && template.stackable != StackingPolicy::AnySource {
                debug!(target: "runtime::pipeline", effect = %template.name, actor = %target, "already applied");
                continue;
            }

            match template
                .stackable
                .decide(&actor.effects, &template.name, Some(source))
            {
                StackingDecision::Refuse => {
                    debug!(target: "runtime::pipeline", effect = %template.name, actor = %target, "refused by stacking");
                    continue;
                }
                StackingDecision::Replace(ids) => {
                    for id in ids {
                        self.delete_effect(ctx, target, id).await?;
                    }
                }
                StackingDecision::Create => {}
            }

            let rule = granting
                .durations
                .first()
                .or_else(|| template.durations.first())
                .copied()
                .unwrap_or(DurationRule::None);
            let start = ctx.pointer().await;
            let mut effect = Effect::from_template(template, Some(origin), Some(source), rule, start);
            effect.id = ctx.store.create_effect(target, effect.clone()).await?;
            debug!(
                target: "runtime::pipeline",
                effect = %effect.name,
                id = %effect.id,
                actor = %target,
                rule = ?rule,
                "effect created"
            );
            ctx.effects.created(ctx, target, &effect).await?;
        }
        Ok(())
    }

    fn report(&self, ctx: &EngineContext, target: ActorId, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_persistence() => Err(e),
            Err(e) => {
                error!(
                    target: "runtime::pipeline",
                    actor = %target,
                    error = %e,
                    "effect application failed"
                );
                let message = format!("{e}");
                let wrapped = EngineError::EffectApplication {
                    target,
                    source: Box::new(e),
                };
                ctx.notifier.error(&format!("{wrapped}: {message}"));
                Ok(())
            }
        }
    }
}

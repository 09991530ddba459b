//! Restricts the next ability to damage only.

use async_trait::async_trait;
use combat_core::EffectKey;
use tracing::info;

use super::{EffectProcessor, ProcessOutcome};
use crate::api::Result;
use crate::context::EngineContext;
use crate::events::Event;
use crate::pipeline::EffectPipeline;

/// Inspects an ability about to resolve under the damage-only restriction.
///
/// Source grants, enablers and abilities without damage are blocked. Mixed
/// abilities lose their non-damage parts. The restricting effect is spent in
/// every case.
pub struct AbilitiesLimiter;

impl AbilitiesLimiter {
    const WARNING: &'static str = "Your next ability can only deal damage";
}

#[async_trait]
impl EffectProcessor for AbilitiesLimiter {
    fn key(&self) -> EffectKey {
        EffectKey::AbilitiesLimiter
    }

    async fn process(&self, ctx: &EngineContext, event: &Event) -> Result<ProcessOutcome> {
        let Event::AbilityPending {
            actor,
            ability,
            effect,
        } = event
        else {
            return Ok(ProcessOutcome::Continue);
        };

        let outcome = if !ability.source_grants.is_empty()
            || !ability.enables.is_empty()
            || !ability.has_damage()
        {
            ProcessOutcome::Blocked
        } else if ability.has_non_damage_component() {
            let mut stripped = ability.clone();
            stripped.strip_non_damage();
            ProcessOutcome::Rewritten(stripped)
        } else {
            ProcessOutcome::Continue
        };

        if outcome != ProcessOutcome::Continue {
            ctx.notifier.warn(Self::WARNING);
        }
        info!(
            target: "runtime::processors",
            actor = %actor,
            ability = %ability.name,
            blocked = outcome == ProcessOutcome::Blocked,
            rewritten = matches!(outcome, ProcessOutcome::Rewritten(_)),
            "damage-only restriction applied"
        );

        EffectPipeline.delete_effect(ctx, *actor, *effect).await?;
        Ok(outcome)
    }
}

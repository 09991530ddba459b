use async_trait::async_trait;
use combat_core::{EffectKey, RulesConfig};
use tracing::{debug, info, warn};

use super::{EffectProcessor, ProcessOutcome};
use crate::api::Result;
use crate::context::EngineContext;
use crate::events::Event;
use crate::pipeline::EffectPipeline;

/// Applies an ability's proc items to its user when the d20 meets the
/// ability's proc threshold.
///
/// Checked abilities reuse the deciding face of their check roll; anything
/// else rolls a fresh d20.
pub struct ProcTriggerProcessor;

#[async_trait]
impl EffectProcessor for ProcTriggerProcessor {
    fn key(&self) -> EffectKey {
        EffectKey::ProcTrigger
    }

    async fn process(&self, ctx: &EngineContext, event: &Event) -> Result<ProcessOutcome> {
        let Event::ProcTrigger {
            actor, item, roll, ..
        } = event
        else {
            return Ok(ProcessOutcome::Continue);
        };
        let item = ctx.require_item(*item).await?;
        if item.procs.is_empty() {
            return Ok(ProcessOutcome::Continue);
        }

        let face = match roll.as_ref().filter(|_| item.has_check()) {
            Some(roll) => roll.check_face(),
            None => {
                let formula = format!("1d{}", RulesConfig::CHECK_DIE_SIDES);
                let data = Default::default();
                ctx.roller.evaluate(&formula, &data).await?.check_face()
            }
        }
        .unwrap_or(0);

        let Some(threshold) = item.proc_trigger.filter(|t| face >= *t) else {
            debug!(
                target: "runtime::processors",
                ability = %item.name,
                face,
                threshold = ?item.proc_trigger,
                "proc not triggered"
            );
            return Ok(ProcessOutcome::Continue);
        };

        let owner = ctx.require_actor(*actor).await?;
        let pipeline = EffectPipeline;
        for proc_id in &item.procs {
            let Some(proc_item) = ctx.store.item(*proc_id).await? else {
                warn!(target: "runtime::processors", item = %proc_id, "proc item missing");
                continue;
            };
            pipeline
                .add_linked_effects(ctx, *actor, &proc_item, *actor)
                .await?;
            info!(
                target: "runtime::processors",
                actor = %owner.name,
                ability = %item.name,
                proc = %proc_item.name,
                face,
                threshold,
                "proc triggered"
            );
            ctx.notifier
                .info(&format!("{} triggers {}", owner.name, proc_item.name));
        }
        Ok(ProcessOutcome::Continue)
    }
}

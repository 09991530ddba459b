use combat_core::{ActorId, ItemId, SlotTag, Status};
use tracing::{debug, info, warn};

use super::EffectPipeline;
use crate::api::Result;
use crate::context::EngineContext;

impl EffectPipeline {
    /// Prepares an enabler item: checks its uses, pays movement for traits
    /// that sacrifice it, then applies its effects to the user.
    ///
    /// Refusals are warnings; the action that carried the enabler has already
    /// resolved and stays resolved.
    pub async fn process_enabler(&self, ctx: &EngineContext, actor: ActorId, id: ItemId) -> Result<()> {
        let Some(item) = ctx.store.item(id).await? else {
            warn!(target: "runtime::pipeline", item = %id, "enabler item missing");
            return Ok(());
        };

        if item.remaining_uses().is_some_and(|left| left <= 0) {
            ctx.notifier
                .warn(&format!("{} has no uses remaining", item.name));
            return Ok(());
        }

        if item.sacrifices_movement {
            if !ctx.in_combat().await {
                ctx.notifier
                    .warn(&format!("{} can only be used in combat", item.name));
                return Ok(());
            }
            let owner = ctx.require_actor(actor).await?;
            if owner.has_moved {
                ctx.notifier
                    .warn(&format!("{} has already moved this turn", owner.name));
                return Ok(());
            }

            let focused = ctx
                .update_actor(actor, |a| {
                    a.has_moved = true;
                    let gained = a.toggle_status(Status::Focus, true);
                    if gained {
                        a.action_state.grant_bonus(SlotTag::Secondary);
                    }
                    gained
                })
                .await?;
            info!(
                target: "runtime::pipeline",
                actor = %owner.name,
                item = %item.name,
                focused,
                "movement sacrificed"
            );
        }

        debug!(target: "runtime::pipeline", actor = %actor, item = %item.name, "applying enabler");
        self.add_linked_effects(ctx, actor, &item, actor).await
    }
}

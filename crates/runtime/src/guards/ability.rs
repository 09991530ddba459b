//! Guards over the ability itself and its costs.

use async_trait::async_trait;
use combat_core::{AbilityKind, ResourceKind};
use tracing::debug;

use super::{Guard, GuardInput, GuardKind};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;

/// Only `action` abilities can be used. Traits and effect carriers cannot.
pub struct IsAction;

#[async_trait]
impl Guard for IsAction {
    fn kind(&self) -> GuardKind {
        GuardKind::IsAction
    }

    async fn check(&self, _ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        if input.ability.kind == AbilityKind::Action {
            return Ok(());
        }
        Err(EngineError::rejected(
            self.kind(),
            format!("{} is a {}, not an action", input.ability.name, input.ability.kind),
        ))
    }
}

/// Limited abilities need a remaining use and a confirmation.
///
/// The use is counted here, as soon as the user confirms, not when the
/// ability resolves.
pub struct HasRemainingUses;

#[async_trait]
impl Guard for HasRemainingUses {
    fn kind(&self) -> GuardKind {
        GuardKind::HasRemainingUses
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        let Some(remaining) = input.ability.remaining_uses() else {
            return Ok(());
        };
        if remaining <= 0 {
            return Err(EngineError::rejected(
                self.kind(),
                format!("{} has no uses left", input.ability.name),
            ));
        }

        let body = format!("{} has {remaining} use(s) remaining.", input.ability.name);
        if !ctx.prompt.confirm("Use limited ability?", &body).await {
            return Err(EngineError::rejected(self.kind(), "use cancelled"));
        }

        let mut item = ctx.require_item(input.ability.id).await?;
        item.uses += 1;
        ctx.store.save_item(&item).await?;
        input.ability.uses = item.uses;
        debug!(
            target: "runtime::guards",
            ability = %input.ability.name,
            uses = item.uses,
            "use counted"
        );
        Ok(())
    }
}

pub struct MeetsMpCost;

#[async_trait]
impl Guard for MeetsMpCost {
    fn kind(&self) -> GuardKind {
        GuardKind::MeetsMpCost
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        let cost = input.ability.cost_mp;
        if cost == 0 {
            return Ok(());
        }
        let actor = ctx.require_actor(input.actor).await?;
        let available = actor.points.get(ResourceKind::Mp).value;
        if available < cost {
            return Err(EngineError::rejected(
                self.kind(),
                format!("{} needs {cost} MP, {} has {available}", input.ability.name, actor.name),
            ));
        }
        Ok(())
    }
}

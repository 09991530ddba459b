//! Target-intent validation.

use async_trait::async_trait;
use combat_core::{ActorId, ActorKind, TargetMode};

use super::{Guard, GuardInput, GuardKind};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;

/// Checks the selected targets against the ability's declared target mode.
///
/// Self-targeting replaces the selection with the actor. Every other mode
/// only inspects the selection and puts it back untouched, pass or fail.
pub struct TargetsMatchActionIntent;

impl TargetsMatchActionIntent {
    async fn kinds(ctx: &EngineContext, targets: &[ActorId]) -> Result<Vec<ActorKind>> {
        let mut kinds = Vec::with_capacity(targets.len());
        for &target in targets {
            kinds.push(ctx.require_actor(target).await?.kind);
        }
        Ok(kinds)
    }

    fn reject(&self, reason: impl Into<String>) -> EngineError {
        EngineError::rejected(self.kind(), reason)
    }
}

#[async_trait]
impl Guard for TargetsMatchActionIntent {
    fn kind(&self) -> GuardKind {
        GuardKind::TargetsMatchActionIntent
    }

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()> {
        let mode = input.ability.target;
        if mode == TargetMode::SelfOnly {
            ctx.targets.set(vec![input.actor]);
            return Ok(());
        }

        let _restore = ctx.targets.preserve();
        let targets = ctx.targets.get();
        if targets.is_empty() {
            return Err(self.reject(format!("{} needs a target", input.ability.name)));
        }

        let own_kind = ctx.require_actor(input.actor).await?.kind;
        let kinds = Self::kinds(ctx, &targets).await?;

        match mode {
            TargetMode::Single => {
                if targets.len() != 1 {
                    return Err(self.reject(format!(
                        "{} takes exactly one target, {} selected",
                        input.ability.name,
                        targets.len()
                    )));
                }
                if targets[0] == input.actor {
                    return Err(self.reject("cannot target yourself"));
                }
            }
            TargetMode::Enemy => {
                if targets.contains(&input.actor) || kinds.iter().any(|k| *k == own_kind) {
                    return Err(self.reject(format!(
                        "{} can only target enemies",
                        input.ability.name
                    )));
                }
            }
            TargetMode::Ally => {
                if kinds.iter().any(|k| *k != own_kind) {
                    return Err(self.reject(format!(
                        "{} can only target allies",
                        input.ability.name
                    )));
                }
            }
            TargetMode::All | TargetMode::SelfOnly => {}
        }
        Ok(())
    }
}

//! Mechanical resolution of a single ability use.
//!
//! Order matters: MP is paid before the check is rolled so a miss never
//! refunds it, critical doubling rewrites the formulas before anything else is
//! rolled, and `AbilityUsed` is published once the log entry is written but
//! before the effect pipeline runs, so effects granted by this use never see
//! it.

mod damage;

use std::collections::BTreeMap;

use combat_core::{
    Ability, ActionLogEntry, ActorId, MessageId, ResourceKind, RollResult, RulesConfig, dice,
};
use tracing::{debug, error, info};

use crate::api::{Result, RollModifiers};
use crate::context::EngineContext;
use crate::events::Event;

pub use damage::DamagePacket;

/// Outcome handed back to the caller and to the effect pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResult {
    pub handled_successfully: bool,
    pub roll: Option<RollResult>,
    pub is_critical: bool,
    /// `None` when the ability has no check.
    pub is_success: Option<bool>,
    pub targets: Vec<ActorId>,
    /// Log entry written for this use.
    pub message: Option<MessageId>,
}

impl ActionResult {
    pub fn failed() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub modifiers: Option<RollModifiers>,
    pub targets: Vec<ActorId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionResolver;

impl ActionResolver {
    /// Resolves `ability` for `actor`.
    ///
    /// Failures other than persistence are reported through the notifier and
    /// yield an unhandled result; persistence failures propagate.
    pub async fn execute(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        ability: Ability,
        options: ResolveOptions,
    ) -> Result<ActionResult> {
        let name = ability.name.clone();
        match self.resolve(ctx, actor, ability, options).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_persistence() => Err(e),
            Err(e) => {
                error!(
                    target: "runtime::resolver",
                    actor = %actor,
                    ability = %name,
                    code = e.error_code(),
                    error = %e,
                    "resolution failed"
                );
                ctx.notifier.error(&format!("{name} failed: {e}"));
                Ok(ActionResult::failed())
            }
        }
    }

    async fn resolve(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        mut ability: Ability,
        options: ResolveOptions,
    ) -> Result<ActionResult> {
        if ability.cost_mp > 0 {
            let cost = ability.cost_mp;
            ctx.update_actor(actor, |a| a.points.mp.spend(ResourceKind::Mp, cost))
                .await??;
            debug!(target: "runtime::resolver", actor = %actor, cost, "MP paid");
        }

        let owner = ctx.require_actor(actor).await?;
        let data = owner.roll_data();
        let modifiers = options.modifiers.unwrap_or_default();
        let formula = dice::check_formula(
            modifiers.bonus_dice,
            modifiers.penalty,
            ability.check_attribute.as_deref(),
        );
        let roll = ctx.roller.evaluate(&formula, &data).await?;

        let is_critical = roll.check_face() == Some(RulesConfig::CRITICAL_FACE);
        if is_critical {
            ability.double_critical_dice();
        }

        let targets = options.targets;
        let is_success = match ability.resistance.as_deref() {
            Some(attribute) => {
                let resistance = match targets.first() {
                    Some(first) => ctx.require_actor(*first).await?.resistance(attribute),
                    None => 0,
                };
                Some(is_critical || roll.total >= i64::from(resistance))
            }
            None => None,
        };

        self.restore(ctx, actor, &ability, &data).await?;

        let mut entry = ActionLogEntry::new(actor, ability.id, ability.action_type);
        if ability.has_damage() && is_success != Some(false) {
            entry.damage = self.roll_damage(ctx, &owner, &ability, &targets).await?;
        }
        entry.roll = Some(roll.clone());
        entry.is_critical = is_critical;
        entry.is_success = is_success;
        entry.targets = targets.clone();
        entry.mp_cost = ability.cost_mp;
        let message = ctx.store.append(entry).await?;

        info!(
            target: "runtime::resolver",
            actor = %owner.name,
            ability = %ability.name,
            formula = %roll.formula,
            total = roll.total,
            is_critical,
            is_success = ?is_success,
            %message,
            "ability resolved"
        );

        ctx.bus
            .publish(
                ctx,
                Event::AbilityUsed {
                    actor,
                    item: ability.id,
                    is_new_ability_use: true,
                },
            )
            .await?;

        Ok(ActionResult {
            handled_successfully: true,
            roll: Some(roll),
            is_critical,
            is_success,
            targets,
            message: Some(message),
        })
    }

    /// Healing, MP restoration and barrier, all on the acting actor.
    async fn restore(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        ability: &Ability,
        data: &BTreeMap<String, i64>,
    ) -> Result<()> {
        let mut gains = [0u32; 3];
        let formulas = [&ability.healing, &ability.restore_mp, &ability.barrier];
        for (gain, formula) in gains.iter_mut().zip(formulas) {
            if let Some(formula) = formula {
                let rolled = ctx.roller.evaluate(formula, data).await?;
                *gain = u32::try_from(rolled.total.max(0)).unwrap_or(u32::MAX);
            }
        }
        let [healing, mp, barrier] = gains;
        if healing == 0 && mp == 0 && barrier == 0 {
            return Ok(());
        }

        let (healed, restored) = ctx
            .update_actor(actor, |a| {
                let healed = a.points.hp.restore(healing);
                let restored = a.points.mp.restore(mp);
                a.points.bp.add_unclamped(barrier);
                (healed, restored)
            })
            .await?;
        debug!(
            target: "runtime::resolver",
            actor = %actor,
            healed,
            restored,
            barrier,
            "restoration applied"
        );
        Ok(())
    }
}

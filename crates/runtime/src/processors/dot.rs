//! Damage over time.
//!
//! Ticks happen on phase transitions: when play passes from the last
//! combatant of one side to the other side, or the round wraps. The combatant
//! whose turn closed the phase takes a flat HP delta from each active
//! `DamageOverTime` change. Stepping backward over the same boundary reverses
//! the delta.

use async_trait::async_trait;
use combat_core::{ActorId, Change, EffectKey, Status};
use tracing::{debug, info};

use super::{EffectProcessor, ProcessOutcome};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::events::{Event, EventHandler, Topic};

pub struct DamageOverTimeProcessor;

impl DamageOverTimeProcessor {
    async fn apply(
        &self,
        ctx: &EngineContext,
        actor: ActorId,
        change: &Change,
        effect_name: &str,
        is_moving_forward: bool,
    ) -> Result<()> {
        let value = change
            .numeric_value()
            .ok_or_else(|| EngineError::InvalidChangeValue {
                key: change.key.clone(),
                value: change.value.clone(),
            })?;
        if !is_moving_forward && !ctx.config.reverse_dot_on_undo {
            return Ok(());
        }
        let delta = if is_moving_forward { value } else { value.saturating_neg() };
        if delta == 0 {
            return Ok(());
        }

        let (name, hp, knocked_out) = ctx
            .update_actor(actor, |a| {
                a.points.hp.apply_loss(delta);
                let knocked_out = is_moving_forward
                    && a.points.hp.is_depleted()
                    && !a.has_persistent_condition()
                    && a.toggle_status(Status::Ko, true);
                (a.name.clone(), a.points.hp.value, knocked_out)
            })
            .await?;

        info!(
            target: "runtime::processors",
            actor = %name,
            effect = effect_name,
            delta,
            hp,
            knocked_out,
            "damage over time applied"
        );
        let verb = if is_moving_forward { "takes" } else { "recovers" };
        ctx.notifier.info(&format!(
            "{name} {verb} {} damage from {effect_name}",
            delta.abs()
        ));
        Ok(())
    }
}

#[async_trait]
impl EffectProcessor for DamageOverTimeProcessor {
    fn key(&self) -> EffectKey {
        EffectKey::DamageOverTime
    }

    async fn process(&self, ctx: &EngineContext, event: &Event) -> Result<ProcessOutcome> {
        if let Event::DamageOverTime {
            actor,
            effect,
            change,
            is_moving_forward,
        } = event
        {
            let owner = ctx.require_actor(*actor).await?;
            let name = owner
                .effect(*effect)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| effect.to_string());
            self.apply(ctx, *actor, change, &name, *is_moving_forward)
                .await?;
        }
        Ok(ProcessOutcome::Continue)
    }
}

/// Watches combat updates and emits `DamageOverTime` events on phase
/// transitions.
pub struct DamageOverTimeScanner;

#[async_trait]
impl EventHandler for DamageOverTimeScanner {
    fn name(&self) -> &'static str {
        "dot_scanner"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Combat]
    }

    async fn handle(&self, ctx: &EngineContext, event: &Event) -> Result<()> {
        let Event::CombatUpdated { change, combat } = event else {
            return Ok(());
        };
        if !(change.turn_changed() || change.round_changed()) || change.previous.round == 0 {
            return Ok(());
        }

        let is_moving_forward = change.is_forward();
        // The boundary crossed sits after `previous` going forward and after
        // `current` going backward.
        let closing_turn = if is_moving_forward {
            change.previous.turn
        } else {
            change.current.turn
        };
        let Some(combatant) = combat.combatant_at(closing_turn) else {
            return Ok(());
        };
        if !combat.is_phase_transition(closing_turn) {
            debug!(
                target: "runtime::processors",
                actor = %combatant.actor,
                turn = closing_turn,
                "not a phase transition"
            );
            return Ok(());
        }

        let actor = ctx.require_actor(combatant.actor).await?;
        let ticks: Vec<(_, Change)> = actor
            .active_effects()
            .flat_map(|effect| {
                effect
                    .custom_changes()
                    .filter(|c| c.key == EffectKey::DamageOverTime)
                    .map(move |c| (effect.id, c.clone()))
            })
            .collect();

        for (effect, change) in ticks {
            ctx.bus
                .publish(
                    ctx,
                    Event::DamageOverTime {
                        actor: actor.id,
                        effect,
                        change,
                        is_moving_forward,
                    },
                )
                .await?;
        }
        Ok(())
    }
}

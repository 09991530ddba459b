//! Processors that rewrite damage before it is rolled.

use async_trait::async_trait;
use combat_core::{ActionType, Actor, Change, EffectKey, dice};

use super::EffectProcessor;
use crate::api::{EngineError, Result};
use crate::context::EngineContext;
use crate::resolver::DamagePacket;

fn numeric(change: &Change) -> Result<i64> {
    change
        .numeric_value()
        .ok_or_else(|| EngineError::InvalidChangeValue {
            key: change.key.clone(),
            value: change.value.clone(),
        })
}

/// Flat bonus to damage dealt by primary abilities.
pub struct PrimaryBaseDamageBuff;

#[async_trait]
impl EffectProcessor for PrimaryBaseDamageBuff {
    fn key(&self) -> EffectKey {
        EffectKey::PrimaryBaseDamageBuff
    }

    async fn modify_damage(
        &self,
        _ctx: &EngineContext,
        _actor: &Actor,
        change: &Change,
        packet: &mut DamagePacket,
    ) -> Result<()> {
        let bonus = numeric(change)?;
        if packet.action_type == ActionType::Primary {
            packet.flat_bonus += bonus;
        }
        Ok(())
    }
}

/// Flat bonus to damage dealt by any ability.
pub struct AbilityBaseDamageBuff;

#[async_trait]
impl EffectProcessor for AbilityBaseDamageBuff {
    fn key(&self) -> EffectKey {
        EffectKey::AbilityBaseDamageBuff
    }

    async fn modify_damage(
        &self,
        _ctx: &EngineContext,
        _actor: &Actor,
        change: &Change,
        packet: &mut DamagePacket,
    ) -> Result<()> {
        packet.flat_bonus += numeric(change)?;
        Ok(())
    }
}

/// Rolls extra direct-hit dice and keeps the best of the original count.
pub struct DamageDiceReroll;

#[async_trait]
impl EffectProcessor for DamageDiceReroll {
    fn key(&self) -> EffectKey {
        EffectKey::DamageDiceReroll
    }

    async fn modify_damage(
        &self,
        _ctx: &EngineContext,
        _actor: &Actor,
        change: &Change,
        packet: &mut DamagePacket,
    ) -> Result<()> {
        let extra = u32::try_from(numeric(change)?).map_err(|_| EngineError::InvalidChangeValue {
            key: change.key.clone(),
            value: change.value.clone(),
        })?;
        if let Some(formula) = packet.direct_hit_damage.as_mut() {
            *formula = dice::reroll_dice(formula, extra);
        }
        Ok(())
    }
}

use std::collections::BTreeMap;

use combat_core::{Ability, ActionType, Actor, ActorId, DamageResult};
use tracing::{debug, trace};

use super::ActionResolver;
use crate::api::Result;
use crate::context::EngineContext;

/// Damage formulas of an in-flight ability, open to rewriting by the
/// processors of the attacker's active effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamagePacket {
    pub base_damage: Option<String>,
    pub direct_hit_damage: Option<String>,
    pub action_type: ActionType,
    /// Added once per target after rolling.
    pub flat_bonus: i64,
}

impl DamagePacket {
    pub fn from_ability(ability: &Ability) -> Self {
        Self {
            base_damage: ability.base_damage.clone(),
            direct_hit_damage: ability.direct_hit_damage.clone(),
            action_type: ability.action_type,
            flat_bonus: 0,
        }
    }
}

impl ActionResolver {
    /// Rolls pending damage against every target.
    pub(super) async fn roll_damage(
        &self,
        ctx: &EngineContext,
        attacker: &Actor,
        ability: &Ability,
        targets: &[ActorId],
    ) -> Result<BTreeMap<ActorId, DamageResult>> {
        let mut packet = DamagePacket::from_ability(ability);
        for change in attacker.active_effects().flat_map(|e| e.custom_changes()) {
            // only damage modifiers act here; other keys are dispatched elsewhere
            let Ok(processor) = ctx.effects.get(&change.key) else {
                trace!(target: "runtime::resolver", key = %change.key, "no processor for damage pass");
                continue;
            };
            processor
                .modify_damage(ctx, attacker, change, &mut packet)
                .await?;
        }

        let data = attacker.roll_data();
        let mut damage = BTreeMap::new();
        for target in targets {
            let mut total = packet.flat_bonus;
            for formula in [&packet.base_damage, &packet.direct_hit_damage]
                .into_iter()
                .flatten()
            {
                total += ctx.roller.evaluate(formula, &data).await?.total;
            }
            let amount = u32::try_from(total.max(0)).unwrap_or(u32::MAX);
            debug!(
                target: "runtime::resolver",
                attacker = %attacker.name,
                defender = %target,
                amount,
                "damage rolled"
            );
            damage.insert(*target, DamageResult::pending(amount));
        }
        Ok(damage)
    }
}

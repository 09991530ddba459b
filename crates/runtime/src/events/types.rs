//! Event payloads and routing topics.

use combat_core::{
    Ability, ActorId, Change, Combat, Effect, EffectId, EffectKey, ItemId, MessageId, RollResult,
    TurnChange,
};

use crate::api::RollModifiers;

/// Topics for event routing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    /// Ability lifecycle (modifiers chosen, ability resolved).
    Ability,
    /// Damage landing on an actor.
    Damage,
    /// Effect-behavior triggers dispatched to processors.
    Effect,
    /// Round and turn changes.
    Combat,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Ability, Topic::Damage, Topic::Effect, Topic::Combat];
}

#[derive(Debug, Clone)]
pub enum Event {
    /// Published after every mechanical consequence of an ability applied.
    AbilityUsed {
        actor: ActorId,
        item: ItemId,
        is_new_ability_use: bool,
    },

    ModifiersFinalized {
        actor: ActorId,
        item: ItemId,
        modifiers: RollModifiers,
    },

    Damaged {
        actor: ActorId,
        amount: u32,
        source: Option<MessageId>,
    },

    DamageOverTime {
        actor: ActorId,
        effect: EffectId,
        change: Change,
        is_moving_forward: bool,
    },

    ProcTrigger {
        actor: ActorId,
        item: ItemId,
        roll: Option<RollResult>,
        targets: Vec<ActorId>,
    },

    TransferEffectToAllies {
        actor: ActorId,
        effect: Effect,
    },

    TransferEffectToAlliesDelete {
        actor: ActorId,
        effect: Effect,
    },

    EnableCombatTurnSlot {
        actor: ActorId,
        effect: EffectId,
        change: Change,
    },

    /// An ability about to resolve while the actor carries the damage-only
    /// restriction. Dispatched to the limiter, never broadcast.
    AbilityPending {
        actor: ActorId,
        ability: Box<Ability>,
        effect: EffectId,
    },

    CombatUpdated {
        change: TurnChange,
        combat: Combat,
    },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::AbilityUsed { .. } | Event::ModifiersFinalized { .. } => Topic::Ability,
            Event::Damaged { .. } => Topic::Damage,
            Event::DamageOverTime { .. }
            | Event::ProcTrigger { .. }
            | Event::TransferEffectToAllies { .. }
            | Event::TransferEffectToAlliesDelete { .. }
            | Event::EnableCombatTurnSlot { .. }
            | Event::AbilityPending { .. } => Topic::Effect,
            Event::CombatUpdated { .. } => Topic::Combat,
        }
    }

    /// Processor key for effect-topic events.
    pub fn effect_key(&self) -> Option<EffectKey> {
        match self {
            Event::DamageOverTime { .. } => Some(EffectKey::DamageOverTime),
            Event::ProcTrigger { .. } => Some(EffectKey::ProcTrigger),
            Event::TransferEffectToAllies { .. } | Event::TransferEffectToAlliesDelete { .. } => {
                Some(EffectKey::TransferEffectToAllies)
            }
            Event::EnableCombatTurnSlot { .. } => Some(EffectKey::EnableCombatTurnSlot),
            Event::AbilityPending { .. } => Some(EffectKey::AbilitiesLimiter),
            _ => None,
        }
    }

    /// Actor the event concerns, when there is exactly one.
    pub fn actor(&self) -> Option<ActorId> {
        match self {
            Event::AbilityUsed { actor, .. }
            | Event::ModifiersFinalized { actor, .. }
            | Event::Damaged { actor, .. }
            | Event::DamageOverTime { actor, .. }
            | Event::ProcTrigger { actor, .. }
            | Event::TransferEffectToAllies { actor, .. }
            | Event::TransferEffectToAlliesDelete { actor, .. }
            | Event::EnableCombatTurnSlot { actor, .. }
            | Event::AbilityPending { actor, .. } => Some(*actor),
            Event::CombatUpdated { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::AbilityUsed { .. } => "onAbilityUse",
            Event::ModifiersFinalized { .. } => "modifiersFinalized",
            Event::Damaged { .. } => "onDamage",
            Event::DamageOverTime { .. } => "DamageOverTime",
            Event::ProcTrigger { .. } => "ProcTrigger",
            Event::TransferEffectToAllies { .. } => "TransferEffectToAllies",
            Event::TransferEffectToAlliesDelete { .. } => "TransferEffectToAlliesDelete",
            Event::EnableCombatTurnSlot { .. } => "EnableCombatTurnSlot",
            Event::AbilityPending { .. } => "AbilityPending",
            Event::CombatUpdated { .. } => "updateCombat",
        }
    }
}

//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use combat_core::{
    Ability, AbilityKind, ActionType, Actor, ActorId, ActorKind, Attributes, Combatant,
    DurationRule, Effect, EffectId, EffectTemplate, ItemId, ResourcePools, TargetMode,
};
use combat_runtime::{
    ActorStore, CollectingNotifier, Engine, EngineConfig, GuardChain, InMemoryStore,
    ScriptedRoller,
};

pub const HERO: ActorId = ActorId(1);
pub const ALLY: ActorId = ActorId(2);
pub const GOBLIN: ActorId = ActorId(3);

pub struct Harness {
    pub engine: Engine,
    pub store: Arc<InMemoryStore>,
    pub roller: Arc<ScriptedRoller>,
    pub notifier: Arc<CollectingNotifier>,
}

impl Harness {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self::with_guards(faces, GuardChain::standard())
    }

    pub fn with_guards(faces: impl IntoIterator<Item = u32>, guards: GuardChain) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.insert_actor(hero()).expect("insert hero");
        store.insert_actor(ally()).expect("insert ally");
        store.insert_actor(goblin()).expect("insert goblin");

        let roller = Arc::new(ScriptedRoller::new(faces));
        let notifier = Arc::new(CollectingNotifier::new());
        let engine = Engine::builder()
            .config(EngineConfig::default().with_seed(1))
            .store(Arc::clone(&store))
            .roller(Arc::clone(&roller))
            .notifier(Arc::clone(&notifier))
            .guards(guards)
            .build()
            .expect("engine should build");

        Self {
            engine,
            store,
            roller,
            notifier,
        }
    }

    pub fn add_item(&self, item: Ability) -> ItemId {
        let id = item.id;
        self.store.insert_item(item).expect("insert item");
        id
    }

    pub fn actor(&self, id: ActorId) -> Actor {
        self.store.actor_cached(id).expect("actor should exist")
    }

    pub fn effect_names(&self, id: ActorId) -> Vec<String> {
        self.actor(id).effects.into_iter().map(|e| e.name).collect()
    }

    pub fn edit_actor(&self, id: ActorId, edit: impl FnOnce(&mut Actor)) {
        let mut actor = self.actor(id);
        edit(&mut actor);
        self.store.insert_actor(actor).expect("save actor");
    }

    /// Writes an effect straight to the store, bypassing lifecycle hooks.
    pub async fn plant_effect(&self, actor: ActorId, template: &EffectTemplate) -> EffectId {
        let effect = Effect::from_template(
            template,
            None,
            Some(actor),
            template.durations.first().copied().unwrap_or(DurationRule::None),
            self.engine.context().pointer().await,
        );
        self.store
            .create_effect(actor, effect)
            .await
            .expect("create effect")
    }

    /// Hero and ally on the player side, the goblin opposite. The hero acts
    /// first.
    pub async fn start_skirmish(&self) {
        self.engine
            .start_combat(vec![
                Combatant::new(HERO, ActorKind::Player, Some(18)),
                Combatant::new(ALLY, ActorKind::Player, Some(12)),
                Combatant::new(GOBLIN, ActorKind::Npc, Some(15)),
            ])
            .await
            .expect("combat should start");
    }
}

pub fn hero() -> Actor {
    Actor::new(HERO, "Aria", ActorKind::Player, ResourcePools::new(30, 10))
        .with_attributes(
            Attributes::default()
                .with_primary("might", 2)
                .with_secondary("defense", 12),
        )
}

pub fn ally() -> Actor {
    Actor::new(ALLY, "Brann", ActorKind::Player, ResourcePools::new(30, 6))
}

pub fn goblin() -> Actor {
    Actor::new(GOBLIN, "Goblin", ActorKind::Npc, ResourcePools::new(30, 0))
        .with_attributes(Attributes::default().with_primary("defense", 10))
}

pub fn action(id: u32, name: &str, action_type: ActionType) -> Ability {
    let mut ability = Ability::new(ItemId(id), name, AbilityKind::Action, action_type);
    ability.owner = Some(HERO);
    ability
}

pub fn self_action(id: u32, name: &str, action_type: ActionType) -> Ability {
    let mut ability = action(id, name, action_type);
    ability.target = TargetMode::SelfOnly;
    ability
}

pub fn carrier(id: u32, template: EffectTemplate) -> Ability {
    let name = template.name.clone();
    Ability::effect_item(ItemId(id), name, vec![template])
}

//! In-memory [`Store`](crate::repository::Store) for tests and local runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use combat_core::{Ability, ActionLogEntry, Actor, ActorId, Effect, EffectId, ItemId, MessageId};
use serde::{Deserialize, Serialize};

use crate::repository::{ActionLog, ActorStore, ItemStore, RepositoryError, Result};

/// Serializable image of the whole store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    actors: Vec<Actor>,
    items: Vec<Ability>,
    log: Vec<ActionLogEntry>,
}

/// In-memory implementation of every repository contract.
///
/// Ids for effects and log entries are assigned from monotonically
/// increasing counters and never reused.
pub struct InMemoryStore {
    actors: RwLock<HashMap<ActorId, Actor>>,
    items: RwLock<HashMap<ItemId, Ability>>,
    log: RwLock<BTreeMap<MessageId, ActionLogEntry>>,
    next_effect: AtomicU32,
    next_message: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
            items: RwLock::new(HashMap::new()),
            log: RwLock::new(BTreeMap::new()),
            next_effect: AtomicU32::new(1),
            next_message: AtomicU32::new(1),
        }
    }

    /// Seeds an actor synchronously.
    pub fn insert_actor(&self, actor: Actor) -> Result<()> {
        self.bump_effect_counter(&actor);
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        actors.insert(actor.id, actor);
        Ok(())
    }

    /// Seeds an item synchronously.
    pub fn insert_item(&self, item: Ability) -> Result<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        items.insert(item.id, item);
        Ok(())
    }

    /// Serializes every document to JSON.
    pub fn to_json(&self) -> Result<String> {
        let mut snapshot = Snapshot::default();
        {
            let actors = self
                .actors
                .read()
                .map_err(|_| RepositoryError::LockPoisoned)?;
            snapshot.actors = actors.values().cloned().collect();
            snapshot.actors.sort_by_key(|a| a.id);
        }
        {
            let items = self
                .items
                .read()
                .map_err(|_| RepositoryError::LockPoisoned)?;
            snapshot.items = items.values().cloned().collect();
            snapshot.items.sort_by_key(|i| i.id);
        }
        {
            let log = self.log.read().map_err(|_| RepositoryError::LockPoisoned)?;
            snapshot.log = log.values().cloned().collect();
        }
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Rebuilds a store from [`InMemoryStore::to_json`] output.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let store = Self::new();
        for actor in snapshot.actors {
            store.insert_actor(actor)?;
        }
        for item in snapshot.items {
            store.insert_item(item)?;
        }
        {
            let mut log = store
                .log
                .write()
                .map_err(|_| RepositoryError::LockPoisoned)?;
            for entry in snapshot.log {
                store
                    .next_message
                    .fetch_max(entry.id.0 + 1, Ordering::Relaxed);
                log.insert(entry.id, entry);
            }
        }
        Ok(store)
    }

    fn bump_effect_counter(&self, actor: &Actor) {
        if let Some(max) = actor.effects.iter().map(|e| e.id.0).max() {
            self.next_effect.fetch_max(max + 1, Ordering::Relaxed);
        }
    }

    fn missing(kind: &'static str, id: impl ToString) -> RepositoryError {
        RepositoryError::Missing {
            kind,
            id: id.to_string(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActorStore for InMemoryStore {
    fn actor_cached(&self, id: ActorId) -> Option<Actor> {
        self.actors
            .read()
            .ok()
            .and_then(|actors| actors.get(&id).cloned())
    }

    async fn actor(&self, id: ActorId) -> Result<Option<Actor>> {
        let actors = self
            .actors
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(actors.get(&id).cloned())
    }

    async fn actors(&self) -> Result<Vec<Actor>> {
        let actors = self
            .actors
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut all: Vec<Actor> = actors.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn save_actor(&self, actor: &Actor) -> Result<()> {
        self.insert_actor(actor.clone())
    }

    async fn create_effect(&self, actor: ActorId, mut effect: Effect) -> Result<EffectId> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let owner = actors
            .get_mut(&actor)
            .ok_or_else(|| Self::missing("actor", actor))?;
        let id = EffectId(self.next_effect.fetch_add(1, Ordering::Relaxed));
        effect.id = id;
        owner.effects.push(effect);
        Ok(id)
    }

    async fn update_effect(&self, actor: ActorId, effect: &Effect) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let owner = actors
            .get_mut(&actor)
            .ok_or_else(|| Self::missing("actor", actor))?;
        let slot = owner
            .effect_mut(effect.id)
            .ok_or_else(|| Self::missing("effect", effect.id))?;
        *slot = effect.clone();
        Ok(())
    }

    async fn delete_effect(&self, actor: ActorId, effect: EffectId) -> Result<Option<Effect>> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let owner = actors
            .get_mut(&actor)
            .ok_or_else(|| Self::missing("actor", actor))?;
        Ok(owner.remove_effect(effect))
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    fn item_cached(&self, id: ItemId) -> Option<Ability> {
        self.items.read().ok().and_then(|items| items.get(&id).cloned())
    }

    async fn item(&self, id: ItemId) -> Result<Option<Ability>> {
        let items = self
            .items
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(items.get(&id).cloned())
    }

    async fn items_owned_by(&self, actor: ActorId) -> Result<Vec<Ability>> {
        let items = self
            .items
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut owned: Vec<Ability> = items
            .values()
            .filter(|i| i.owner == Some(actor))
            .cloned()
            .collect();
        owned.sort_by_key(|i| i.id);
        Ok(owned)
    }

    async fn save_item(&self, item: &Ability) -> Result<()> {
        self.insert_item(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let mut items = self
            .items
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(items.remove(&id).is_some())
    }
}

#[async_trait]
impl ActionLog for InMemoryStore {
    async fn append(&self, mut entry: ActionLogEntry) -> Result<MessageId> {
        let mut log = self.log.write().map_err(|_| RepositoryError::LockPoisoned)?;
        let id = MessageId(self.next_message.fetch_add(1, Ordering::Relaxed));
        entry.id = id;
        log.insert(id, entry);
        Ok(id)
    }

    async fn entry(&self, id: MessageId) -> Result<Option<ActionLogEntry>> {
        let log = self.log.read().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(log.get(&id).cloned())
    }

    async fn update_entry(&self, entry: &ActionLogEntry) -> Result<()> {
        let mut log = self.log.write().map_err(|_| RepositoryError::LockPoisoned)?;
        let slot = log
            .get_mut(&entry.id)
            .ok_or_else(|| Self::missing("log entry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    async fn remove_entry(&self, id: MessageId) -> Result<Option<ActionLogEntry>> {
        let mut log = self.log.write().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(log.remove(&id))
    }

    async fn entries_for(&self, actor: ActorId) -> Result<Vec<ActionLogEntry>> {
        let log = self.log.read().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(log.values().filter(|e| e.actor == actor).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{
        ActionType, ActorKind, CombatPointer, DurationRule, EffectTemplate, ResourcePools,
    };

    fn actor(id: u32) -> Actor {
        Actor::new(ActorId(id), format!("actor-{id}"), ActorKind::Player, ResourcePools::new(30, 10))
    }

    #[tokio::test]
    async fn effect_ids_are_unique_across_actors() {
        let store = InMemoryStore::new();
        store.insert_actor(actor(1)).unwrap();
        store.insert_actor(actor(2)).unwrap();
        let template = EffectTemplate::new("Haste");
        let effect = Effect::from_template(&template, None, None, DurationRule::None, CombatPointer::default());

        let a = store.create_effect(ActorId(1), effect.clone()).await.unwrap();
        let b = store.create_effect(ActorId(2), effect).await.unwrap();
        assert_ne!(a, b);
        assert!(store.actor_cached(ActorId(2)).unwrap().effect(b).is_some());
    }

    #[tokio::test]
    async fn snapshot_round_trips_and_keeps_counters_ahead() {
        let store = InMemoryStore::new();
        store.insert_actor(actor(1)).unwrap();
        let entry = ActionLogEntry::new(ActorId(1), ItemId(4), ActionType::Primary);
        let first = store.append(entry.clone()).await.unwrap();

        let restored = InMemoryStore::from_json(&store.to_json().unwrap()).unwrap();
        assert!(restored.entry(first).await.unwrap().is_some());
        let second = restored.append(entry).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn missing_actor_is_reported() {
        let store = InMemoryStore::new();
        let err = store.delete_effect(ActorId(7), EffectId(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Missing { kind: "actor", .. }));
    }
}

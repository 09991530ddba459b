//! Repository contracts for the documents the engine mutates.

use async_trait::async_trait;
use combat_core::{Ability, ActionLogEntry, Actor, ActorId, Effect, EffectId, ItemId, MessageId};

use super::Result;

/// Actors and the effects embedded in them.
#[async_trait]
pub trait ActorStore: Send + Sync {
    /// Cached read. Never blocks on I/O.
    fn actor_cached(&self, id: ActorId) -> Option<Actor>;

    async fn actor(&self, id: ActorId) -> Result<Option<Actor>>;

    async fn actors(&self) -> Result<Vec<Actor>>;

    /// Inserts or replaces the whole actor document.
    async fn save_actor(&self, actor: &Actor) -> Result<()>;

    /// Appends an effect to the actor and returns its assigned id.
    async fn create_effect(&self, actor: ActorId, effect: Effect) -> Result<EffectId>;

    async fn update_effect(&self, actor: ActorId, effect: &Effect) -> Result<()>;

    /// Removes an effect. `None` when it was already gone.
    async fn delete_effect(&self, actor: ActorId, effect: EffectId) -> Result<Option<Effect>>;
}

/// Abilities and effect-carrying items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    fn item_cached(&self, id: ItemId) -> Option<Ability>;

    async fn item(&self, id: ItemId) -> Result<Option<Ability>>;

    async fn items_owned_by(&self, actor: ActorId) -> Result<Vec<Ability>>;

    async fn save_item(&self, item: &Ability) -> Result<()>;

    /// Deleting an item never touches effects that reference it as origin.
    async fn delete_item(&self, id: ItemId) -> Result<bool>;
}

/// Resolved-action records.
#[async_trait]
pub trait ActionLog: Send + Sync {
    /// Stores the entry and returns its assigned id.
    async fn append(&self, entry: ActionLogEntry) -> Result<MessageId>;

    async fn entry(&self, id: MessageId) -> Result<Option<ActionLogEntry>>;

    async fn update_entry(&self, entry: &ActionLogEntry) -> Result<()>;

    async fn remove_entry(&self, id: MessageId) -> Result<Option<ActionLogEntry>>;

    async fn entries_for(&self, actor: ActorId) -> Result<Vec<ActionLogEntry>>;
}

/// Everything the engine persists.
pub trait Store: ActorStore + ItemStore + ActionLog {}

impl<T: ActorStore + ItemStore + ActionLog + ?Sized> Store for T {}

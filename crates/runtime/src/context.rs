//! Explicit engine context threaded through every operation.
//!
//! Bundles the collaborators and the shared combat pointer so guards,
//! resolvers and processors never reach for ambient global state.

use std::sync::{Arc, Mutex, PoisonError};

use combat_core::{Ability, Actor, ActorId, Combat, CombatPointer, ItemId};
use tokio::sync::RwLock;

use crate::api::{EngineError, Notifier, Prompt, Result, RollEvaluator};
use crate::config::EngineConfig;
use crate::events::EventBus;
use crate::processors::EffectRegistry;
use crate::repository::Store;

#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn Store>,
    pub bus: EventBus,
    pub effects: Arc<EffectRegistry>,
    pub roller: Arc<dyn RollEvaluator>,
    pub notifier: Arc<dyn Notifier>,
    pub prompt: Arc<dyn Prompt>,
    pub config: Arc<EngineConfig>,
    pub targets: TargetSelection,
    combat: Arc<RwLock<Option<Combat>>>,
}

impl EngineContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        bus: EventBus,
        effects: Arc<EffectRegistry>,
        roller: Arc<dyn RollEvaluator>,
        notifier: Arc<dyn Notifier>,
        prompt: Arc<dyn Prompt>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            bus,
            effects,
            roller,
            notifier,
            prompt,
            config,
            targets: TargetSelection::default(),
            combat: Arc::new(RwLock::new(None)),
        }
    }

    /// Snapshot of the active combat.
    pub async fn combat(&self) -> Option<Combat> {
        self.combat.read().await.clone()
    }

    pub async fn in_combat(&self) -> bool {
        self.combat
            .read()
            .await
            .as_ref()
            .is_some_and(Combat::is_started)
    }

    /// Current `{round, turn}`, or `{0, 0}` outside combat.
    pub async fn pointer(&self) -> CombatPointer {
        self.combat
            .read()
            .await
            .as_ref()
            .map(Combat::pointer)
            .unwrap_or_default()
    }

    pub(crate) fn combat_slot(&self) -> &Arc<RwLock<Option<Combat>>> {
        &self.combat
    }

    pub async fn require_actor(&self, id: ActorId) -> Result<Actor> {
        self.store
            .actor(id)
            .await?
            .ok_or(EngineError::ActorNotFound(id))
    }

    pub async fn require_item(&self, id: ItemId) -> Result<Ability> {
        self.store
            .item(id)
            .await?
            .ok_or(EngineError::ItemNotFound(id))
    }

    /// Loads an actor, applies `mutate` and saves the result.
    pub async fn update_actor<T, F>(&self, id: ActorId, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Actor) -> T + Send,
        T: Send,
    {
        let mut actor = self.require_actor(id).await?;
        let out = mutate(&mut actor);
        self.store.save_actor(&actor).await?;
        Ok(out)
    }
}

/// The user's current target selection.
#[derive(Clone, Debug, Default)]
pub struct TargetSelection(Arc<Mutex<Vec<ActorId>>>);

impl TargetSelection {
    pub fn get(&self) -> Vec<ActorId> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, targets: Vec<ActorId>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = targets;
    }

    /// Restores the current selection when the returned guard drops.
    pub fn preserve(&self) -> SelectionRestore {
        SelectionRestore {
            selection: self.clone(),
            saved: self.get(),
        }
    }
}

#[must_use = "the selection is restored when this guard drops"]
pub struct SelectionRestore {
    selection: TargetSelection,
    saved: Vec<ActorId>,
}

impl Drop for SelectionRestore {
    fn drop(&mut self) {
        self.selection.set(std::mem::take(&mut self.saved));
    }
}

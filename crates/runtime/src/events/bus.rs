//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error, trace};

use super::types::{Event, Topic};
use crate::api::{EngineError, Result};
use crate::context::EngineContext;

/// Defines how a handler failure is treated by the publisher.
///
/// - Critical handlers must succeed or the publish fails
/// - Important handlers log and notify but allow continuation
/// - Optional handlers can fail quietly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerCriticality {
    /// Failure propagates to the publisher.
    Critical,

    /// Failure is logged and reported to the user. This is the default.
    Important,

    /// Failure is logged at debug level only.
    Optional,
}

/// Subscriber invoked synchronously by [`EventBus::publish`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &'static str;

    /// Topics this handler is registered for.
    fn topics(&self) -> &'static [Topic];

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Important
    }

    async fn handle(&self, ctx: &EngineContext, event: &Event) -> Result<()>;
}

type HandlerTable = HashMap<Topic, Vec<Arc<dyn EventHandler>>>;

/// Topic-based event bus.
///
/// Handlers run in registration order and are awaited one by one, so a later
/// stage never observes a partially applied earlier stage. Observers receive a
/// broadcast copy once every handler has finished.
pub struct EventBus {
    handlers: Arc<RwLock<HandlerTable>>,
    channels: Arc<HashMap<Topic, broadcast::Sender<Event>>>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::ALL
            .iter()
            .map(|&topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();

        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(channels),
        }
    }

    /// Registers a handler for every topic it declares.
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for topic in handler.topics() {
            handlers
                .entry(*topic)
                .or_default()
                .push(Arc::clone(&handler));
        }
        debug!(target: "runtime::events", handler = handler.name(), "handler subscribed");
    }

    /// Receiver for broadcast copies of a topic.
    pub fn observe(&self, topic: Topic) -> Option<broadcast::Receiver<Event>> {
        self.channels.get(&topic).map(broadcast::Sender::subscribe)
    }

    /// Names of the handlers registered for `topic`, in dispatch order.
    pub fn handler_names(&self, topic: Topic) -> Vec<&'static str> {
        self.snapshot(topic).iter().map(|h| h.name()).collect()
    }

    /// Dispatches `event` to its topic's handlers and awaits them all.
    pub async fn publish(&self, ctx: &EngineContext, event: Event) -> Result<()> {
        let topic = event.topic();
        let handlers = self.snapshot(topic);
        trace!(
            target: "runtime::events",
            event = event.name(),
            %topic,
            handlers = handlers.len(),
            "publishing"
        );

        for handler in &handlers {
            if let Err(e) = handler.handle(ctx, &event).await {
                Self::handle_error(ctx, handler.as_ref(), &event, e)?;
            }
        }

        if let Some(tx) = self.channels.get(&topic)
            && tx.send(event).is_err()
        {
            // No observers for this topic - this is normal, not an error
            trace!(target: "runtime::events", %topic, "no observers");
        }

        Ok(())
    }

    fn snapshot(&self, topic: Topic) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .cloned()
            .unwrap_or_default()
    }

    fn handle_error(
        ctx: &EngineContext,
        handler: &dyn EventHandler,
        event: &Event,
        error: EngineError,
    ) -> Result<()> {
        if error.is_persistence() {
            error!(
                target: "runtime::events",
                handler = handler.name(),
                event = event.name(),
                error = %error,
                "Handler hit a persistence failure"
            );
            return Err(error);
        }
        match handler.criticality() {
            HandlerCriticality::Critical => {
                error!(
                    target: "runtime::events",
                    handler = handler.name(),
                    event = event.name(),
                    criticality = "critical",
                    error = %error,
                    "Critical handler failed"
                );
                Err(error)
            }
            HandlerCriticality::Important => {
                error!(
                    target: "runtime::events",
                    handler = handler.name(),
                    event = event.name(),
                    criticality = "important",
                    category = %error.category(),
                    error = %error,
                    "Handler failed, continuing"
                );
                ctx.notifier
                    .error(&format!("{} failed: {}", handler.name(), error));
                Ok(())
            }
            HandlerCriticality::Optional => {
                debug!(
                    target: "runtime::events",
                    handler = handler.name(),
                    event = event.name(),
                    criticality = "optional",
                    error = %error,
                    "Optional handler failed"
                );
                Ok(())
            }
        }
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            channels: Arc::clone(&self.channels),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

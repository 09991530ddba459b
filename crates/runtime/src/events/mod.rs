//! Topic-based event bus for engine events.
//!
//! Triggers such as "ability used" or "combat advanced" are published here
//! instead of calling their consumers directly. Registered handlers run in
//! registration order and the publisher awaits all of them; observers get a
//! best-effort broadcast copy afterwards.

mod bus;
mod types;

pub use bus::{EventBus, EventHandler, HandlerCriticality};
pub use types::{Event, Topic};

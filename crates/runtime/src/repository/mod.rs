//! Repository layer for actors, items, effects and the action log.
//!
//! The engine treats persistence as an external collaborator. Every lookup
//! has a synchronous cached variant for hot paths and an async variant that a
//! remote store may back with real I/O.

mod error;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use memory::InMemoryStore;
pub use traits::{ActionLog, ActorStore, ItemStore, Store};

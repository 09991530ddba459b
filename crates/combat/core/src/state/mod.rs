//! Mutable per-actor combat state.
//!
//! Actors own their resource pools, action slots, statuses and active
//! effects. Runtime layers clone or query this state but mutate it only
//! through the slot state machine, the resolver and effect processors.
mod actor;
mod ids;
mod resources;
mod slots;
mod status;

pub use actor::{Actor, ActorKind, Attributes};
pub use ids::{ActorId, EffectId, ItemId, MessageId};
pub use resources::{ResourceError, ResourceKind, ResourceMeter, ResourcePools};
pub use slots::{
    ActionState, EnablerCandidate, ResolutionPath, SlotError, SlotRequest, SlotResolution, SlotTag,
    UsedSlot,
};
pub use status::Status;

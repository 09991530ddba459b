//! Ordered, short-circuiting guard chain.
//!
//! Each guard is an independent async predicate over the acting actor, the
//! ability and the shared [`EngineContext`]. The chain runs the requested
//! guards strictly in order and stops at the first one that does not pass.
//!
//! A guard passes by returning `Ok(())`. Returning
//! [`EngineError::GuardRejected`] is an expected refusal and surfaces as a
//! warning; any other error is reported as a failure. Neither propagates:
//! [`GuardChain::evaluate`] answers whether the action may proceed and only
//! returns an error when persistence failed.

mod ability;
mod effects;
mod targeting;
mod turn;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use combat_core::{Ability, ActorId, EffectId};
use tracing::{debug, error, warn};

use crate::api::{EngineError, ErrorCategory, Result, RollModifiers};
use crate::context::EngineContext;

pub use ability::{HasRemainingUses, IsAction, MeetsMpCost};
pub use effects::{HasModifiers, HasRequiredEffects};
pub use targeting::TargetsMatchActionIntent;
pub use turn::{HasAvailableActionSlot, HasNoUnappliedDamage, IsActorsTurn, IsReaction};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum GuardKind {
    IsAction,
    HasNoUnappliedDamage,
    IsActorsTurn,
    IsReaction,
    TargetsMatchActionIntent,
    HasRequiredEffects,
    HasAvailableActionSlot,
    HasRemainingUses,
    #[strum(to_string = "meetsMPCost", serialize = "meetsMpCost")]
    MeetsMpCost,
    HasModifiers,
}

/// In-flight state shared by the guards of one evaluation.
#[derive(Clone, Debug)]
pub struct GuardInput {
    pub actor: ActorId,
    /// The ability as it will resolve. Guards may update it, e.g. `uses`.
    pub ability: Ability,
    /// Set once `hasModifiers` collected them.
    pub modifiers: Option<RollModifiers>,
    /// Effects flagged by `hasRequiredEffects`, deleted on confirmation.
    pub pending_deletion: Vec<EffectId>,
}

impl GuardInput {
    pub fn new(actor: ActorId, ability: Ability) -> Self {
        Self {
            actor,
            ability,
            modifiers: None,
            pending_deletion: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Guard: Send + Sync {
    fn kind(&self) -> GuardKind;

    async fn check(&self, ctx: &EngineContext, input: &mut GuardInput) -> Result<()>;
}

/// Registry of guard implementations plus the evaluation loop.
pub struct GuardChain {
    guards: HashMap<GuardKind, Arc<dyn Guard>>,
}

impl GuardChain {
    const OUT_OF_COMBAT: &'static [GuardKind] = &[GuardKind::IsAction, GuardKind::HasModifiers];

    const IN_COMBAT: &'static [GuardKind] = &[
        GuardKind::IsAction,
        GuardKind::HasNoUnappliedDamage,
        GuardKind::IsActorsTurn,
        GuardKind::IsReaction,
        GuardKind::TargetsMatchActionIntent,
        GuardKind::HasRequiredEffects,
        GuardKind::HasAvailableActionSlot,
        GuardKind::HasRemainingUses,
        GuardKind::MeetsMpCost,
        GuardKind::HasModifiers,
    ];

    /// An empty chain. Every guard name fails closed until registered.
    pub fn empty() -> Self {
        Self {
            guards: HashMap::new(),
        }
    }

    /// Chain with every standard guard registered.
    pub fn standard() -> Self {
        let guards: [Arc<dyn Guard>; 10] = [
            Arc::new(IsAction),
            Arc::new(HasNoUnappliedDamage),
            Arc::new(IsActorsTurn),
            Arc::new(IsReaction),
            Arc::new(TargetsMatchActionIntent),
            Arc::new(HasRequiredEffects),
            Arc::new(HasAvailableActionSlot),
            Arc::new(HasRemainingUses),
            Arc::new(MeetsMpCost),
            Arc::new(HasModifiers),
        ];
        guards
            .into_iter()
            .fold(Self::empty(), |chain, guard| chain.with(guard))
    }

    pub fn with(mut self, guard: Arc<dyn Guard>) -> Self {
        self.register(guard);
        self
    }

    /// Registers `guard`, replacing any implementation of the same kind.
    pub fn register(&mut self, guard: Arc<dyn Guard>) -> Option<Arc<dyn Guard>> {
        self.guards.insert(guard.kind(), guard)
    }

    pub fn unregister(&mut self, kind: GuardKind) -> Option<Arc<dyn Guard>> {
        self.guards.remove(&kind)
    }

    pub fn contains(&self, kind: GuardKind) -> bool {
        self.guards.contains_key(&kind)
    }

    /// Guards run by `use_ability` in and out of combat.
    pub fn default_sequence(in_combat: bool) -> &'static [GuardKind] {
        if in_combat {
            Self::IN_COMBAT
        } else {
            Self::OUT_OF_COMBAT
        }
    }

    /// Runs `sequence` in order and reports whether every guard passed.
    ///
    /// A chain that stops early unflags any prerequisites it had marked.
    pub async fn evaluate(
        &self,
        ctx: &EngineContext,
        input: &mut GuardInput,
        sequence: &[GuardKind],
    ) -> Result<bool> {
        let passed = self.run(ctx, input, sequence).await?;
        if !passed {
            effects::release_pending(ctx, input).await?;
        }
        Ok(passed)
    }

    async fn run(
        &self,
        ctx: &EngineContext,
        input: &mut GuardInput,
        sequence: &[GuardKind],
    ) -> Result<bool> {
        for &kind in sequence {
            let Some(guard) = self.guards.get(&kind) else {
                let err = EngineError::GuardNotRegistered { guard: kind };
                error!(
                    target: "runtime::guards",
                    guard = %kind,
                    actor = %input.actor,
                    "Guard is not registered, rejecting"
                );
                ctx.notifier.error(&err.to_string());
                return Ok(false);
            };

            match guard.check(ctx, input).await {
                Ok(()) => {
                    debug!(target: "runtime::guards", guard = %kind, actor = %input.actor, "passed");
                }
                Err(e) if e.category() == ErrorCategory::GuardRejection => {
                    warn!(
                        target: "runtime::guards",
                        guard = %kind,
                        actor = %input.actor,
                        ability = %input.ability.name,
                        reason = %e,
                        "Action rejected"
                    );
                    ctx.notifier.warn(&e.to_string());
                    return Ok(false);
                }
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => {
                    error!(
                        target: "runtime::guards",
                        guard = %kind,
                        actor = %input.actor,
                        ability = %input.ability.name,
                        error = %e,
                        "Guard failed"
                    );
                    ctx.notifier.error(&format!("{kind} failed: {e}"));
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl Default for GuardChain {
    fn default() -> Self {
        Self::standard()
    }
}

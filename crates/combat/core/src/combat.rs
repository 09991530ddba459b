//! Combat ordering and the round/turn pointer.
//!
//! Combatants are grouped player side first, then the opposing side, each
//! group sorted by initiative descending with unrolled initiative last.
//! `turn` always indexes into that order.

use crate::state::{ActorId, ActorKind};

/// `{round, turn}` position of a combat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatPointer {
    pub round: u32,
    pub turn: u32,
}

impl CombatPointer {
    pub const fn new(round: u32, turn: u32) -> Self {
        Self { round, turn }
    }

    /// Signed number of turns from `self` to `later`.
    pub fn turns_until(&self, later: CombatPointer, turns_per_round: usize) -> i64 {
        let rounds = i64::from(later.round) - i64::from(self.round);
        rounds * turns_per_round as i64 + i64::from(later.turn) - i64::from(self.turn)
    }
}

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
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Forward,
    /// Undo of a previous advance.
    Backward,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combatant {
    pub actor: ActorId,
    pub kind: ActorKind,
    pub initiative: Option<i32>,
}

impl Combatant {
    pub fn new(actor: ActorId, kind: ActorKind, initiative: Option<i32>) -> Self {
        Self {
            actor,
            kind,
            initiative,
        }
    }
}

/// Result of moving the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnChange {
    pub previous: CombatPointer,
    pub current: CombatPointer,
    pub direction: Direction,
}

impl TurnChange {
    pub fn round_changed(&self) -> bool {
        self.previous.round != self.current.round
    }

    pub fn turn_changed(&self) -> bool {
        self.previous.turn != self.current.turn
    }

    pub fn is_forward(&self) -> bool {
        self.direction == Direction::Forward
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combat {
    combatants: Vec<Combatant>,
    round: u32,
    turn: u32,
    previous: Option<CombatPointer>,
    started: bool,
}

impl Combat {
    pub fn new(combatants: impl IntoIterator<Item = Combatant>) -> Self {
        let mut combat = Self {
            combatants: combatants.into_iter().collect(),
            ..Self::default()
        };
        combat.setup_turns();
        combat
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn pointer(&self) -> CombatPointer {
        CombatPointer::new(self.round, self.turn)
    }

    pub fn previous(&self) -> Option<CombatPointer> {
        self.previous
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn turns_per_round(&self) -> usize {
        self.combatants.len()
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.combatants.iter().any(|c| c.actor == actor)
    }

    pub fn combatant_at(&self, turn: u32) -> Option<&Combatant> {
        self.combatants.get(turn as usize)
    }

    /// Combatant whose turn it is, once combat has started.
    pub fn current(&self) -> Option<&Combatant> {
        if !self.started {
            return None;
        }
        self.combatant_at(self.turn)
    }

    /// Other combatants on the same side as `actor`.
    pub fn allies_of(&self, actor: ActorId) -> Vec<ActorId> {
        let Some(kind) = self
            .combatants
            .iter()
            .find(|c| c.actor == actor)
            .map(|c| c.kind)
        else {
            return Vec::new();
        };
        self.combatants
            .iter()
            .filter(|c| c.kind == kind && c.actor != actor)
            .map(|c| c.actor)
            .collect()
    }

    pub fn add_combatant(&mut self, combatant: Combatant) {
        self.combatants.push(combatant);
        self.setup_turns();
    }

    pub fn remove_combatant(&mut self, actor: ActorId) -> Option<Combatant> {
        let index = self.combatants.iter().position(|c| c.actor == actor)?;
        let removed = self.combatants.remove(index);
        self.setup_turns();
        Some(removed)
    }

    /// Re-sorts the order and clamps the turn index.
    pub fn setup_turns(&mut self) {
        self.combatants.sort_by(|a, b| {
            side_rank(a.kind)
                .cmp(&side_rank(b.kind))
                .then_with(|| match (a.initiative, b.initiative) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
        let last = self.combatants.len().saturating_sub(1) as u32;
        self.turn = self.turn.min(last);
    }

    /// Begins round 1 at the first combatant.
    pub fn start(&mut self) -> TurnChange {
        let previous = self.pointer();
        self.started = true;
        self.round = 1;
        self.turn = 0;
        self.setup_turns();
        self.previous = Some(previous);
        TurnChange {
            previous,
            current: self.pointer(),
            direction: Direction::Forward,
        }
    }

    /// Advances to the next combatant, wrapping into the next round.
    pub fn next_turn(&mut self) -> Option<TurnChange> {
        if !self.started || self.combatants.is_empty() {
            return None;
        }
        let previous = self.pointer();
        let next = self.turn + 1;
        if next as usize >= self.combatants.len() {
            self.round += 1;
            self.turn = 0;
        } else {
            self.turn = next;
        }
        self.previous = Some(previous);
        Some(TurnChange {
            previous,
            current: self.pointer(),
            direction: Direction::Forward,
        })
    }

    /// Steps back one combatant. Refuses to go before round 1, turn 0.
    pub fn previous_turn(&mut self) -> Option<TurnChange> {
        if !self.started || self.combatants.is_empty() {
            return None;
        }
        let previous = self.pointer();
        if self.turn == 0 {
            if self.round <= 1 {
                return None;
            }
            self.round -= 1;
            self.turn = self.combatants.len() as u32 - 1;
        } else {
            self.turn -= 1;
        }
        self.previous = Some(previous);
        Some(TurnChange {
            previous,
            current: self.pointer(),
            direction: Direction::Backward,
        })
    }

    /// Whether the boundary after `from_turn` hands play to the other side
    /// or wraps the round.
    pub fn is_phase_transition(&self, from_turn: u32) -> bool {
        let Some(current) = self.combatant_at(from_turn) else {
            return false;
        };
        let next_index = from_turn as usize + 1;
        let is_last_turn = next_index >= self.combatants.len();
        let next = if is_last_turn {
            &self.combatants[0]
        } else {
            &self.combatants[next_index]
        };
        let last_of_kind = self
            .combatants
            .iter()
            .rposition(|c| c.kind == current.kind)
            .is_some_and(|index| index == from_turn as usize);

        current.kind != next.kind || (is_last_turn && last_of_kind)
    }
}

fn side_rank(kind: ActorKind) -> u8 {
    match kind {
        ActorKind::Player => 0,
        ActorKind::Npc => 1,
    }
}

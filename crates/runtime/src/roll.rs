//! Dice evaluators backing [`RollEvaluator`].

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use combat_core::{DiceExpr, RollResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::api::{Result, RollEvaluator};

/// Rolls real dice from a seedable RNG.
pub struct DiceRoller {
    rng: Mutex<StdRng>,
}

impl DiceRoller {
    /// A fixed seed makes every roll reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for DiceRoller {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl RollEvaluator for DiceRoller {
    async fn evaluate(&self, formula: &str, data: &BTreeMap<String, i64>) -> Result<RollResult> {
        let expr = DiceExpr::parse(formula)?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let result = expr.evaluate(data, |sides| rng.gen_range(1..=sides));
        trace!(target: "runtime::roll", formula, total = result.total, "rolled");
        Ok(result)
    }
}

/// Deterministic evaluator for tests and replays.
///
/// Pops queued faces in order, falling back to a fixed face once the queue is
/// empty. Every evaluated formula is journaled.
#[derive(Debug)]
pub struct ScriptedRoller {
    faces: Mutex<VecDeque<u32>>,
    fallback: u32,
    journal: Mutex<Vec<String>>,
}

impl ScriptedRoller {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: Mutex::new(faces.into_iter().collect()),
            fallback: 1,
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, face: u32) -> Self {
        self.fallback = face;
        self
    }

    pub fn push_faces(&self, faces: impl IntoIterator<Item = u32>) {
        self.faces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(faces);
    }

    pub fn evaluated_formulas(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RollEvaluator for ScriptedRoller {
    async fn evaluate(&self, formula: &str, data: &BTreeMap<String, i64>) -> Result<RollResult> {
        let expr = DiceExpr::parse(formula)?;
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(expr.source().to_owned());
        let mut faces = self.faces.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(expr.evaluate(data, |_| faces.pop_front().unwrap_or(self.fallback)))
    }
}

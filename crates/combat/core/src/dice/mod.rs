//! Dice expressions.
//!
//! Only what the combat rules need: sums of `NdM` terms (optionally keeping
//! the highest or lowest `K`), integer constants and `@name` references into
//! actor roll data. Faces come from an injected die source so evaluation stays
//! deterministic under test and replay.

mod formula;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::{CombatError, ErrorSeverity};

pub use formula::{check_formula, double_dice_counts, reroll_dice};

/// Upper bound on dice in a single term.
pub const MAX_DICE_PER_TERM: u32 = 100;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("empty dice formula")]
    Empty,

    #[error("unexpected '{found}' at position {position} in formula")]
    Unexpected { found: char, position: usize },

    #[error("expected {expected} at position {position} in formula")]
    Expected {
        expected: &'static str,
        position: usize,
    },

    #[error("dice must have at least one side")]
    ZeroSides,

    #[error("too many dice in one term: {count} (max 100)")]
    TooManyDice { count: u32 },
}

impl CombatError for DiceError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "DICE_EMPTY",
            Self::Unexpected { .. } => "DICE_UNEXPECTED",
            Self::Expected { .. } => "DICE_EXPECTED",
            Self::ZeroSides => "DICE_ZERO_SIDES",
            Self::TooManyDice { .. } => "DICE_TOO_MANY",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Keep {
    Highest(u32),
    Lowest(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sign {
    Plus,
    Minus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Term {
    Dice {
        count: u32,
        sides: u32,
        keep: Option<Keep>,
    },
    Constant(i64),
    Reference(String),
}

/// A parsed formula.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiceExpr {
    source: String,
    terms: Vec<(Sign, Term)>,
}

/// Faces rolled for one `NdM` term.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub keep: Option<Keep>,
    pub results: Vec<u32>,
}

impl DiceTerm {
    /// Faces that count toward the total.
    pub fn kept(&self) -> Vec<u32> {
        let mut faces = self.results.clone();
        match self.keep {
            None => faces,
            Some(Keep::Highest(k)) => {
                faces.sort_unstable_by(|a, b| b.cmp(a));
                faces.truncate(k as usize);
                faces
            }
            Some(Keep::Lowest(k)) => {
                faces.sort_unstable();
                faces.truncate(k as usize);
                faces
            }
        }
    }

    pub fn total(&self) -> i64 {
        self.kept().iter().map(|f| i64::from(*f)).sum()
    }

    /// The face that decides the term: the best kept die under keep-highest,
    /// the first die otherwise.
    pub fn deciding_face(&self) -> Option<u32> {
        match self.keep {
            Some(Keep::Highest(_)) => self.results.iter().copied().max(),
            Some(Keep::Lowest(_)) => self.results.iter().copied().min(),
            None => self.results.first().copied(),
        }
    }
}

/// Structured outcome of evaluating a formula.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollResult {
    pub formula: String,
    pub total: i64,
    pub dice: Vec<DiceTerm>,
}

impl RollResult {
    /// Deciding face of the first dice term (the check die).
    pub fn check_face(&self) -> Option<u32> {
        self.dice.first().and_then(DiceTerm::deciding_face)
    }
}

impl DiceExpr {
    pub fn parse(input: &str) -> Result<Self, DiceError> {
        let mut cursor = Cursor::new(input);
        cursor.skip_ws();
        if cursor.at_end() {
            return Err(DiceError::Empty);
        }

        let mut terms = Vec::new();
        let mut sign = Sign::Plus;
        if cursor.eat(b'-') {
            sign = Sign::Minus;
        } else {
            cursor.eat(b'+');
        }

        loop {
            cursor.skip_ws();
            let term = cursor.term()?;
            terms.push((sign, term));
            cursor.skip_ws();
            match cursor.peek() {
                None => break,
                Some(b'+') => sign = Sign::Plus,
                Some(b'-') => sign = Sign::Minus,
                Some(other) => {
                    return Err(DiceError::Unexpected {
                        found: other as char,
                        position: cursor.pos,
                    });
                }
            }
            cursor.pos += 1;
        }

        Ok(Self {
            source: input.trim().to_owned(),
            terms,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the formula. `die` returns a face for a die with the given
    /// number of sides; out-of-range faces are clamped into `1..=sides`.
    pub fn evaluate(
        &self,
        data: &BTreeMap<String, i64>,
        mut die: impl FnMut(u32) -> u32,
    ) -> RollResult {
        let mut total = 0i64;
        let mut dice = Vec::new();
        for (sign, term) in &self.terms {
            let value = match term {
                Term::Dice { count, sides, keep } => {
                    let results = (0..*count).map(|_| die(*sides).clamp(1, *sides)).collect();
                    let term = DiceTerm {
                        count: *count,
                        sides: *sides,
                        keep: *keep,
                        results,
                    };
                    let value = term.total();
                    dice.push(term);
                    value
                }
                Term::Constant(n) => *n,
                Term::Reference(name) => data.get(name).copied().unwrap_or(0),
            };
            total += match sign {
                Sign::Plus => value,
                Sign::Minus => -value,
            };
        }
        RollResult {
            formula: self.source.clone(),
            total,
            dice,
        }
    }
}

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            src: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.src[self.pos..].starts_with(s.as_bytes()) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
    }

    fn term(&mut self) -> Result<Term, DiceError> {
        let position = self.pos;
        match self.peek() {
            None => Err(DiceError::Expected {
                expected: "a term",
                position,
            }),
            Some(b'@') => {
                self.pos += 1;
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
                {
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(DiceError::Expected {
                        expected: "an attribute name",
                        position: self.pos,
                    });
                }
                let name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                Ok(Term::Reference(name))
            }
            Some(b'd') => {
                self.pos += 1;
                self.dice(1)
            }
            Some(b) if b.is_ascii_digit() => {
                let n = self.number().ok_or(DiceError::Expected {
                    expected: "a number",
                    position,
                })?;
                if self.eat(b'd') {
                    self.dice(n)
                } else {
                    Ok(Term::Constant(i64::from(n)))
                }
            }
            Some(other) => Err(DiceError::Unexpected {
                found: other as char,
                position,
            }),
        }
    }

    fn dice(&mut self, count: u32) -> Result<Term, DiceError> {
        let sides = self.number().ok_or(DiceError::Expected {
            expected: "die sides",
            position: self.pos,
        })?;
        if sides == 0 {
            return Err(DiceError::ZeroSides);
        }
        if count > MAX_DICE_PER_TERM {
            return Err(DiceError::TooManyDice { count });
        }
        let keep = if self.eat_str("kh") {
            Some(Keep::Highest(self.number().unwrap_or(1)))
        } else if self.eat_str("kl") {
            Some(Keep::Lowest(self.number().unwrap_or(1)))
        } else {
            None
        };
        Ok(Term::Dice { count, sides, keep })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faces(seq: &[u32]) -> impl FnMut(u32) -> u32 + '_ {
        let mut iter = seq.iter().copied();
        move |_| iter.next().unwrap_or(1)
    }

    #[test]
    fn evaluates_dice_constants_and_references() {
        let expr = DiceExpr::parse("2d6 + 3 - @def").unwrap();
        let data = BTreeMap::from([("def".to_owned(), 2)]);
        let roll = expr.evaluate(&data, faces(&[4, 5]));
        assert_eq!(roll.total, 10);
        assert_eq!(roll.dice[0].results, vec![4, 5]);
    }

    #[test]
    fn keep_highest_uses_best_face() {
        let expr = DiceExpr::parse("2d20kh1").unwrap();
        let roll = expr.evaluate(&BTreeMap::new(), faces(&[3, 20]));
        assert_eq!(roll.total, 20);
        assert_eq!(roll.check_face(), Some(20));
    }

    #[test]
    fn first_die_decides_without_keep() {
        let expr = DiceExpr::parse("1d20+5").unwrap();
        let roll = expr.evaluate(&BTreeMap::new(), faces(&[20]));
        assert_eq!(roll.check_face(), Some(20));
        assert_eq!(roll.total, 25);
    }

    #[test]
    fn faces_are_clamped_into_range() {
        let expr = DiceExpr::parse("1d6").unwrap();
        let roll = expr.evaluate(&BTreeMap::new(), faces(&[9]));
        assert_eq!(roll.total, 6);
    }

    #[test]
    fn missing_reference_counts_as_zero() {
        let expr = DiceExpr::parse("@str").unwrap();
        assert_eq!(expr.evaluate(&BTreeMap::new(), faces(&[])).total, 0);
    }

    #[test]
    fn rejects_malformed_formulas() {
        assert_eq!(DiceExpr::parse("  "), Err(DiceError::Empty));
        assert!(matches!(
            DiceExpr::parse("2d"),
            Err(DiceError::Expected { .. })
        ));
        assert_eq!(DiceExpr::parse("1d0"), Err(DiceError::ZeroSides));
        assert!(matches!(
            DiceExpr::parse("2d6 * 2"),
            Err(DiceError::Unexpected { found: '*', .. })
        ));
        assert_eq!(
            DiceExpr::parse("500d6"),
            Err(DiceError::TooManyDice { count: 500 })
        );
    }
}

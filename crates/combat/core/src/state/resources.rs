//! Resource pools (HP, MP, BP).
//!
//! HP and MP are bounded meters: healing and restoration clamp at the maximum,
//! loss floors at zero. Barrier points (BP) are additive and may exceed their
//! nominal maximum.

use thiserror::Error;

use crate::error::{CombatError, ErrorSeverity};

/// Individual resource pools.
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
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ResourceKind {
    /// Health points.
    Hp,
    /// Magic points, spent on ability costs.
    Mp,
    /// Barrier points, absorbed before HP.
    Bp,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("not enough {kind}: need {required}, have {available}")]
    Insufficient {
        kind: ResourceKind,
        required: u32,
        available: u32,
    },
}

impl CombatError for ResourceError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Insufficient { .. } => "RESOURCE_INSUFFICIENT",
        }
    }
}

/// A `{value, max}` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceMeter {
    pub value: u32,
    pub max: u32,
}

impl ResourceMeter {
    pub fn new(value: u32, max: u32) -> Self {
        Self { value, max }
    }

    pub fn full(max: u32) -> Self {
        Self { value: max, max }
    }

    /// Adds `amount`, clamped to `max`. Returns the amount actually gained.
    pub fn restore(&mut self, amount: u32) -> u32 {
        let before = self.value;
        self.value = self.value.saturating_add(amount).min(self.max);
        self.value.saturating_sub(before)
    }

    /// Adds `amount` without clamping.
    pub fn add_unclamped(&mut self, amount: u32) {
        self.value = self.value.saturating_add(amount);
    }

    /// Removes `amount`, floored at zero. Returns the amount actually lost.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.value);
        self.value -= lost;
        lost
    }

    /// Applies a signed delta where positive values are loss.
    ///
    /// The result is clamped to `[0, max]`.
    pub fn apply_loss(&mut self, delta: i64) {
        let next = i64::from(self.value)
            .saturating_sub(delta)
            .clamp(0, i64::from(self.max));
        self.value = next as u32;
    }

    /// Spends exactly `amount` or fails without mutating.
    pub fn spend(&mut self, kind: ResourceKind, amount: u32) -> Result<(), ResourceError> {
        if self.value < amount {
            return Err(ResourceError::Insufficient {
                kind,
                required: amount,
                available: self.value,
            });
        }
        self.value -= amount;
        Ok(())
    }

    pub fn is_depleted(&self) -> bool {
        self.value == 0
    }
}

/// The three pools every actor carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePools {
    pub hp: ResourceMeter,
    pub mp: ResourceMeter,
    pub bp: ResourceMeter,
}

impl ResourcePools {
    pub fn new(hp: u32, mp: u32) -> Self {
        Self {
            hp: ResourceMeter::full(hp),
            mp: ResourceMeter::full(mp),
            bp: ResourceMeter::new(0, hp),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> &ResourceMeter {
        match kind {
            ResourceKind::Hp => &self.hp,
            ResourceKind::Mp => &self.mp,
            ResourceKind::Bp => &self.bp,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ResourceMeter {
        match kind {
            ResourceKind::Hp => &mut self.hp,
            ResourceKind::Mp => &mut self.mp,
            ResourceKind::Bp => &mut self.bp,
        }
    }

    /// Applies incoming damage: barrier absorbs first, the rest hits HP.
    ///
    /// Returns `(absorbed_by_barrier, hp_lost)`.
    pub fn take_damage(&mut self, amount: u32) -> (u32, u32) {
        let absorbed = self.bp.drain(amount);
        let hp_lost = self.hp.drain(amount - absorbed);
        (absorbed, hp_lost)
    }
}

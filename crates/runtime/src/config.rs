//! Engine configuration.

use std::env;
use std::str::FromStr;

use combat_core::RulesConfig;
use serde::{Deserialize, Serialize};

use crate::api::{EngineError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each observer broadcast channel.
    pub event_buffer_size: usize,
    pub rules: RulesConfig,
    /// Target grants only land when the check did not fail.
    pub grants_require_success: bool,
    /// Stepping a turn backward heals damage-over-time ticks.
    pub reverse_dot_on_undo: bool,
    /// Seed for the default dice roller.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            rules: RulesConfig::default(),
            grants_require_success: true,
            reverse_dot_on_undo: true,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub const EVENT_BUFFER_ENV: &'static str = "COMBAT_EVENT_BUFFER";
    pub const RNG_SEED_ENV: &'static str = "COMBAT_RNG_SEED";
    pub const GRANTS_REQUIRE_SUCCESS_ENV: &'static str = "COMBAT_GRANTS_REQUIRE_SUCCESS";

    /// Defaults overridden by any `COMBAT_*` variables that parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = read_env::<usize>(Self::EVENT_BUFFER_ENV) {
            config.event_buffer_size = size.max(1);
        }
        if let Some(seed) = read_env::<u64>(Self::RNG_SEED_ENV) {
            config.rng_seed = Some(seed);
        }
        if let Some(flag) = read_env::<bool>(Self::GRANTS_REQUIRE_SUCCESS_ENV) {
            config.grants_require_success = flag;
        }
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}

//! Simulation configuration loaded from the environment.
use std::env;
use std::str::FromStr;

use combat_runtime::EngineConfig;

#[derive(Clone, Debug)]
pub struct SimConfig {
    pub engine: EngineConfig,
    /// Rounds to play before the encounter is called.
    pub rounds: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            rounds: 3,
        }
    }
}

impl SimConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SIM_SEED` - Dice seed, overrides `COMBAT_RNG_SEED` (default: entropy)
    /// - `SIM_ROUNDS` - Rounds to play (default: 3)
    /// - `COMBAT_*` - Engine settings, see [`EngineConfig::from_env`]
    pub fn from_env() -> Self {
        let mut config = Self {
            engine: EngineConfig::from_env(),
            ..Self::default()
        };

        if let Some(seed) = read_env::<u64>("SIM_SEED") {
            config.engine.rng_seed = Some(seed);
        }
        if let Some(rounds) = read_env::<u32>("SIM_ROUNDS") {
            config.rounds = rounds.max(1);
        }

        config
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}

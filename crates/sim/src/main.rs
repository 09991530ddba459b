//! Runs a scripted encounter through the combat engine and logs the result.
mod config;
mod scenario;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::SimConfig;
use crate::scenario::Skirmish;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    setup_logging();

    let config = SimConfig::from_env();
    info!(rounds = config.rounds, seed = ?config.engine.rng_seed, "starting skirmish");

    let outcome = Skirmish::new(config)?
        .run()
        .await
        .context("skirmish aborted")?;

    info!(rounds = outcome.rounds, "skirmish finished");
    for standing in &outcome.standings {
        info!(
            name = %standing.name,
            hp = standing.hp,
            max_hp = standing.max_hp,
            effects = ?standing.effects,
            "final standing"
        );
    }
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();
}

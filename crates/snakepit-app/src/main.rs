//! Headless Snakepit runner: builds a world from a TOML config (or the
//! defaults), steps it to completion, and logs summaries along the way.

use std::path::PathBuf;

use anyhow::Result;
use snakepit_app::{load_config, run};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(path.as_deref())?;
    let stats = run(&config)?;
    info!(
        ticks = stats.ticks,
        food_eaten = stats.food_eaten,
        self_cuts = stats.self_cuts,
        cross_cuts = stats.cross_cuts,
        "run complete"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

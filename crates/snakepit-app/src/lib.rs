//! Shared plumbing for the Snakepit runner binary: configuration loading and
//! the headless drive loop.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snakepit_core::{SimConfig, TickReport, World};
use tracing::info;

/// Runner settings wrapping the simulation config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ticks to simulate before exiting.
    pub ticks: u64,
    /// Emit a summary every this many ticks; 0 silences periodic logging.
    pub log_interval: u64,
    /// The simulation itself.
    pub world: SimConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            log_interval: 60,
            world: SimConfig::default(),
        }
    }
}

/// Loads the runner configuration.
///
/// An explicit path must exist and parse. Without one, `snakepit.toml` in
/// the working directory is used when present, the defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => read_config(path),
        None => {
            let fallback = Path::new("snakepit.toml");
            if fallback.exists() {
                read_config(fallback)
            } else {
                info!("no snakepit.toml found, running the default arena");
                Ok(AppConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Totals accumulated over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub food_eaten: u64,
    pub self_cuts: u64,
    pub cross_cuts: u64,
}

impl RunStats {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.food_eaten += u64::from(report.food_eaten);
        self.self_cuts += u64::from(report.self_cuts);
        self.cross_cuts += u64::from(report.cross_cuts);
    }
}

/// Builds the world and drives it for the configured number of ticks,
/// logging a summary at the configured interval.
pub fn run(config: &AppConfig) -> Result<RunStats> {
    let mut world = World::new(config.world.clone())?;
    info!(
        world_size = config.world.world_size,
        snakes = world.snakes().len(),
        food = world.food().len(),
        seed = config.world.seed,
        "arena ready"
    );

    let mut stats = RunStats::default();
    for _ in 0..config.ticks {
        let report = world.step();
        stats.absorb(&report);
        if config.log_interval > 0 && report.tick.0 % config.log_interval == 0 {
            log_summary(&world, &report);
        }
    }
    Ok(stats)
}

fn log_summary(world: &World, report: &TickReport) {
    let mut longest = 0usize;
    let mut total_cells = 0usize;
    for (_, snake) in world.snakes().iter() {
        longest = longest.max(snake.body.len());
        total_cells += snake.body.len();
    }
    info!(
        tick = report.tick.0,
        longest,
        total_cells,
        food = world.food().len(),
        eaten = report.food_eaten,
        self_cuts = report.self_cuts,
        cross_cuts = report.cross_cuts,
        frozen = report.frozen_snakes,
        "tick summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_covers_the_requested_ticks() {
        let config = AppConfig {
            ticks: 25,
            log_interval: 0,
            world: SimConfig {
                world_size: 12,
                snake_count: 3,
                food_count: 10,
                seed: 4,
                ..SimConfig::default()
            },
        };
        let stats = run(&config).expect("run should succeed");
        assert_eq!(stats.ticks, 25);
    }

    #[test]
    fn partial_configs_fill_in_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            ticks = 10

            [world]
            world_size = 16
            seed = 9
            "#,
        )
        .expect("valid toml");
        assert_eq!(parsed.ticks, 10);
        assert_eq!(parsed.log_interval, 60);
        assert_eq!(parsed.world.world_size, 16);
        assert_eq!(parsed.world.seed, 9);
        assert_eq!(parsed.world.snake_count, 25);
    }

    #[test]
    fn invalid_world_sizes_fail_the_run() {
        let config = AppConfig {
            world: SimConfig {
                world_size: 0,
                ..SimConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(run(&config).is_err());
    }
}

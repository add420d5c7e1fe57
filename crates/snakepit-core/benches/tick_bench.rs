//! Tick throughput benchmarks.
//!
//! Knobs for quick local experiments:
//! `SNAKEPIT_BENCH_TICKS` (ticks per iteration, default 32),
//! `SNAKEPIT_BENCH_SIZE`, `SNAKEPIT_BENCH_SNAKES`, `SNAKEPIT_BENCH_FOOD`
//! (dense arena shape, defaults 60/40/400).

use std::env;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use snakepit_core::{SimConfig, World};

fn env_num<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn bench_world_step(c: &mut Criterion) {
    let ticks: u64 = env_num("SNAKEPIT_BENCH_TICKS", 32);
    let mut group = c.benchmark_group("world_step");

    let classic = SimConfig::default();
    group.bench_function("classic_150", |b| {
        b.iter_batched(
            || World::new(classic.clone()).expect("valid config"),
            |mut world| {
                for _ in 0..ticks {
                    world.step();
                }
                world
            },
            BatchSize::SmallInput,
        );
    });

    let dense = SimConfig {
        world_size: env_num("SNAKEPIT_BENCH_SIZE", 60),
        snake_count: env_num("SNAKEPIT_BENCH_SNAKES", 40),
        food_count: env_num("SNAKEPIT_BENCH_FOOD", 400),
        ..SimConfig::default()
    };
    group.bench_function("dense_60", |b| {
        b.iter_batched(
            || World::new(dense.clone()).expect("valid config"),
            |mut world| {
                for _ in 0..ticks {
                    world.step();
                }
                world
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_world_step);
criterion_main!(benches);

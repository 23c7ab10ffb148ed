//! Criterion benchmarks for power network ticks.
//!
//! Two benchmark groups:
//! - `small_grid`: one network of 200 machines
//! - `many_networks`: 250 networks of 20 machines each

use criterion::{Criterion, criterion_group, criterion_main};
use fabrica_core::id::BlockPos;
use fabrica_core::registry::{
    BATTERY_BLOCK, ELECTRIC_FURNACE_BLOCK, GENERATOR_BLOCK, MACERATOR_BLOCK,
};
use fabrica_core::test_utils::*;
use fabrica_power::{PowerConfig, PowerGrid};

// ===========================================================================
// Grid builders
// ===========================================================================

/// Place one chain of `len` machines at row `row`: every fourth machine is
/// a generator, every tenth a battery, the rest alternate furnace and
/// macerator. Each machine connects to the previous one.
fn place_chain(grid: &mut PowerGrid, row: i32, len: i32) {
    for x in 0..len {
        let pos = BlockPos::new(x, row, 0);
        let block = if x % 4 == 0 {
            GENERATOR_BLOCK
        } else if x % 10 == 5 {
            BATTERY_BLOCK
        } else if x % 2 == 0 {
            ELECTRIC_FURNACE_BLOCK
        } else {
            MACERATOR_BLOCK
        };
        let connections: Vec<BlockPos> = (x > 0)
            .then(|| BlockPos::new(x - 1, row, 0))
            .into_iter()
            .collect();
        grid.machine_placed(pos, block, &connections)
            .expect("bench placement");

        if block == GENERATOR_BLOCK {
            let _ = grid.insert_fuel(pos, coal(), 64);
        } else if block != BATTERY_BLOCK {
            let _ = grid.insert_input(pos, iron_ore(), 64);
        }
    }
}

/// Build a grid of `chains` independent networks of `len` machines.
fn build_grid(chains: i32, len: i32) -> PowerGrid {
    let mut grid = PowerGrid::new(test_content(), PowerConfig::default());
    for row in 0..chains {
        place_chain(&mut grid, row, len);
    }

    // Warm up so burns and batteries are populated.
    for _ in 0..5 {
        grid.tick();
    }
    grid
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_small_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_grid");
    group.sample_size(50);

    let mut grid = build_grid(1, 200);

    group.bench_function("200_machines_one_network", |b| {
        b.iter(|| {
            grid.tick();
        });
    });

    group.finish();
}

fn bench_many_networks(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_networks");
    group.sample_size(20);

    let mut grid = build_grid(250, 20);

    group.bench_function("250_networks_20_machines", |b| {
        b.iter(|| {
            grid.tick();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_small_grid, bench_many_networks);
criterion_main!(benches);

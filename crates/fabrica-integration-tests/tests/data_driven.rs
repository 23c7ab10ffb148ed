//! Integration test: a grid built entirely from data files.
//!
//! Loads items, fuels, recipes, machine overrides and power settings from
//! a directory of mixed-format files, then runs a generator and a furnace
//! on the loaded content.

use std::fs;
use std::path::{Path, PathBuf};

use fabrica_core::id::BlockPos;
use fabrica_core::registry::{ELECTRIC_FURNACE_BLOCK, GENERATOR_BLOCK};
use fabrica_data::load_game_data;
use fabrica_power::{MachineStatus, PartialPower, PowerGrid};

fn data_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fabrica_it_{suffix}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_pack(dir: &Path) {
    fs::write(
        dir.join("items.ron"),
        r#"[(name: "coal"), (name: "iron_ore"), (name: "iron_ingot")]"#,
    )
    .unwrap();
    fs::write(
        dir.join("fuels.toml"),
        r#"
[[fuels]]
item = "coal"
energy_per_tick = 30
burn_duration = 100
"#,
    )
    .unwrap();
    fs::write(
        dir.join("recipes.json"),
        r#"[{
            "name": "smelt_iron",
            "kind": "electric_furnace",
            "input": "iron_ore",
            "output": "iron_ingot",
            "energy_cost": 600,
            "duration": 20
        }]"#,
    )
    .unwrap();
    fs::write(
        dir.join("machines.json"),
        r#"[{"name": "Machine_Generator", "class": {"generator": {"buffer": 0}}}]"#,
    )
    .unwrap();
    fs::write(dir.join("power.ron"), r#"(partial_power: stall)"#).unwrap();
}

#[test]
fn loaded_content_drives_a_grid() {
    let dir = data_dir("drives_grid");
    write_pack(&dir);
    let data = load_game_data(&dir).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert_eq!(data.power.partial_power, PartialPower::Stall);
    let coal = data.registry.item_id("coal").unwrap();
    let ore = data.registry.item_id("iron_ore").unwrap();
    let ingot = data.registry.item_id("iron_ingot").unwrap();

    let mut grid = PowerGrid::new(data.registry, data.power);
    let generator = BlockPos::new(0, 0, 0);
    let furnace = BlockPos::new(1, 0, 0);
    grid.machine_placed(generator, GENERATOR_BLOCK, &[]).unwrap();
    grid.machine_placed(furnace, ELECTRIC_FURNACE_BLOCK, &[generator])
        .unwrap();
    assert_eq!(grid.network_of(generator), grid.network_of(furnace));

    grid.insert_fuel(generator, coal, 1).unwrap();
    grid.insert_input(furnace, ore, 1).unwrap();

    // 30/t supply meets the 30/t furnace exactly, so a stalling furnace
    // still runs every tick.
    for _ in 0..20 {
        let out = grid.tick();
        assert_eq!(out.reports[0].1.wasted.units(), 0);
    }
    let stack = grid.take_output(furnace, 64).unwrap().unwrap();
    assert_eq!((stack.item, stack.count), (ingot, 1));
    assert_eq!(
        grid.processor(furnace).unwrap().status(),
        MachineStatus::Idle(fabrica_power::IdleReason::NoInput)
    );
}

#[test]
fn unknown_block_id_is_rejected() {
    let dir = data_dir("unknown_block");
    write_pack(&dir);
    let data = load_game_data(&dir).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    let mut grid = PowerGrid::new(data.registry, data.power);
    assert!(
        grid.machine_placed(BlockPos::new(0, 0, 0), "Machine_Teleporter", &[])
            .is_err()
    );
    assert_eq!(grid.registry().network_count(), 0);
}

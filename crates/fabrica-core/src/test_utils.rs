//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::fixed::Fixed64;
use crate::id::*;
use crate::ledger::{EnergyAmount, PowerRate};
use crate::registry::{ContentRegistry, ProcessingKind, RegistryBuilder};

// ===========================================================================
// Value helpers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn joules(v: u32) -> EnergyAmount {
    EnergyAmount::from_joules(v)
}

pub fn rate(v: u32) -> PowerRate {
    PowerRate::per_tick(v)
}

pub fn pos(x: i32) -> BlockPos {
    BlockPos::new(x, 0, 0)
}

// ===========================================================================
// Test content
// ===========================================================================
//
// Item ids are assigned in registration order by `test_content`.

pub fn coal() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn wood() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn iron_ingot() -> ItemTypeId {
    ItemTypeId(3)
}
pub fn iron_dust() -> ItemTypeId {
    ItemTypeId(4)
}
pub fn stone() -> ItemTypeId {
    ItemTypeId(5)
}

/// Coal burns at 10/tick for 80 ticks.
pub const COAL_RATE: u32 = 10;
pub const COAL_BURN: u64 = 80;
/// Wood burns at 5/tick for 4 ticks.
pub const WOOD_RATE: u32 = 5;
pub const WOOD_BURN: u64 = 4;
/// Smelting iron costs 600 J over 20 ticks (30/tick).
pub const SMELT_COST: u32 = 600;
pub const SMELT_TICKS: u64 = 20;
/// Grinding iron costs 100 J over 5 ticks (20/tick), yields 2 dust.
pub const GRIND_COST: u32 = 100;
pub const GRIND_TICKS: u64 = 5;

/// Builder pre-populated with the test items, fuels, recipes and the
/// standard machine blocks.
pub fn test_content_builder() -> RegistryBuilder {
    let mut b = RegistryBuilder::new();
    let coal = b.register_item("coal");
    let wood = b.register_item("wood");
    let ore = b.register_item("iron_ore");
    let ingot = b.register_item("iron_ingot");
    let dust = b.register_item("iron_dust");
    b.register_item("stone");

    b.register_fuel(coal, rate(COAL_RATE), COAL_BURN);
    b.register_fuel(wood, rate(WOOD_RATE), WOOD_BURN);

    b.register_recipe(
        "smelt_iron",
        ProcessingKind::ElectricFurnace,
        ore,
        ingot,
        1,
        joules(SMELT_COST),
        SMELT_TICKS,
    );
    b.register_recipe(
        "smelt_dust",
        ProcessingKind::ElectricFurnace,
        dust,
        ingot,
        1,
        joules(SMELT_COST),
        SMELT_TICKS,
    );
    b.register_recipe(
        "grind_iron",
        ProcessingKind::Macerator,
        ore,
        dust,
        2,
        joules(GRIND_COST),
        GRIND_TICKS,
    );
    b.register_standard_machines();
    b
}

/// Frozen test content.
pub fn test_content() -> ContentRegistry {
    match test_content_builder().build() {
        Ok(reg) => reg,
        Err(e) => panic!("test content must be valid: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_ids_match_helpers() {
        let reg = test_content();
        assert_eq!(reg.item_id("coal"), Some(coal()));
        assert_eq!(reg.item_id("wood"), Some(wood()));
        assert_eq!(reg.item_id("iron_ore"), Some(iron_ore()));
        assert_eq!(reg.item_id("iron_ingot"), Some(iron_ingot()));
        assert_eq!(reg.item_id("iron_dust"), Some(iron_dust()));
        assert_eq!(reg.item_id("stone"), Some(stone()));
    }
}

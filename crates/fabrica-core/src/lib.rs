//! Fabrica Core -- shared types for the Fabrica power simulation.
//!
//! This crate holds everything the power simulation needs that is not
//! specific to networks: deterministic fixed-point arithmetic, the energy
//! ledger, machine/item identifiers, item slots and the immutable content
//! registry of fuels, recipes and machine types.
//!
//! # Key Types
//!
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`ledger::EnergyAmount`] / [`ledger::PowerRate`] -- non-negative energy
//!   and energy-per-tick, plus the fair-share allocation primitives.
//! - [`id::BlockPos`] -- machine identity and tie-break ordering.
//! - [`item::ItemSlot`] -- single-item-type machine slot.
//! - [`registry::ContentRegistry`] -- fuels, recipes and machine types,
//!   frozen at startup and passed into every tick.

#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod fixed;
pub mod id;
pub mod item;
pub mod ledger;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

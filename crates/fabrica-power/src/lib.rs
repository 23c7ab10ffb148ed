//! Power networks for the Fabrica simulation.
//!
//! Generators burn fuel, batteries store energy and processing machines
//! spend it on recipes. Machines connected to each other form a
//! [`PowerNetwork`]; every tick each network balances what its generators
//! offer against what its consumers request, routing surplus into
//! batteries and drawing deficits back out of them.
//!
//! # Design
//!
//! - Machines are a closed enum ([`Machine`]) keyed by [`BlockPos`], so
//!   every pass runs in position order and ties always break the same way.
//! - A network tick is staged then committed: generators and consumers are
//!   read, [`distribution::allocate`] decides every transfer, and only then
//!   does any machine change.
//! - Energy is conserved exactly on raw fixed-point units; each tick's
//!   [`TickReport`] accounts for every unit.
//! - Content (fuels, recipes, machine types) is an immutable
//!   [`ContentRegistry`] passed into every tick.
//! - Events fire only on transitions, not every tick.
//!
//! [`BlockPos`]: fabrica_core::id::BlockPos
//! [`ContentRegistry`]: fabrica_core::registry::ContentRegistry

pub mod config;
pub mod distribution;
pub mod error;
pub mod event;
pub mod grid;
pub mod machine;
pub mod network;
pub mod registry;

pub use config::{PartialPower, PowerConfig};
pub use error::{PowerError, PowerResult};
pub use event::PowerEvent;
pub use grid::PowerGrid;
pub use machine::{
    Battery, Generator, IdleReason, Machine, MachineKind, MachineSnapshot, MachineStatus,
    ProcessingMachine,
};
pub use network::{NetworkTick, PowerNetwork, TickReport};
pub use registry::{NetworkRegistry, RegistryTick};

//! Machine variants: generators, batteries and processing units.
//!
//! Machines are a closed enum dispatched by `match` (no trait objects) so
//! the network's distribution pass can treat each kind exhaustively.

mod battery;
mod generator;
mod processing;

pub use battery::Battery;
pub use generator::{Burn, Generator, GeneratorStage};
pub use processing::ProcessingMachine;

use fabrica_core::fixed::Fixed64;
use fabrica_core::id::BlockPos;
use fabrica_core::item::ItemSlot;
use fabrica_core::ledger::{EnergyAmount, PowerRate};
use fabrica_core::registry::MachineClass;
use serde::{Deserialize, Serialize};

use crate::config::PowerConfig;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Why a machine is doing nothing this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdleReason {
    /// Generator fuel slot is empty.
    NoFuel,
    /// Generator fuel slot holds an item that is not a fuel.
    UnusableFuel,
    /// Processing input slot is empty.
    NoInput,
    /// Processing input has no recipe for this machine.
    UnusableInput,
    /// Processing output slot cannot take the recipe's output.
    OutputBlocked,
    /// Battery moved no energy last tick.
    Standby,
    /// The machine's content data is unusable (e.g. a zero-length burn).
    Faulted,
}

/// Display-facing machine state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineStatus {
    Active,
    /// A consumer with valid input and output room but no energy granted.
    Underpowered,
    Idle(IdleReason),
    /// Freshly placed, not yet ticked.
    #[default]
    Placed,
}

/// Capability class of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineKind {
    Generator,
    Battery,
    Processor,
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Any machine that can join a power network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Machine {
    Generator(Generator),
    Battery(Battery),
    Processor(ProcessingMachine),
}

impl Machine {
    /// Build a fresh machine of `class` at `position`.
    pub fn from_class(position: BlockPos, class: MachineClass, config: &PowerConfig) -> Self {
        match class {
            MachineClass::Generator { buffer } => {
                Machine::Generator(Generator::new(position, buffer, config.stack_limit))
            }
            MachineClass::Battery {
                capacity,
                transfer_limit,
            } => Machine::Battery(Battery::new(position, capacity).with_transfer_limit(transfer_limit)),
            MachineClass::Processor { kind } => {
                Machine::Processor(ProcessingMachine::new(position, kind, config.stack_limit))
            }
        }
    }

    pub fn position(&self) -> BlockPos {
        match self {
            Machine::Generator(g) => g.position(),
            Machine::Battery(b) => b.position(),
            Machine::Processor(p) => p.position(),
        }
    }

    pub fn kind(&self) -> MachineKind {
        match self {
            Machine::Generator(_) => MachineKind::Generator,
            Machine::Battery(_) => MachineKind::Battery,
            Machine::Processor(_) => MachineKind::Processor,
        }
    }

    pub fn stored_energy(&self) -> EnergyAmount {
        match self {
            Machine::Generator(g) => g.stored_energy(),
            Machine::Battery(b) => b.stored_energy(),
            Machine::Processor(_) => EnergyAmount::ZERO,
        }
    }

    pub fn capacity(&self) -> EnergyAmount {
        match self {
            Machine::Generator(g) => g.buffer_capacity(),
            Machine::Battery(b) => b.capacity(),
            Machine::Processor(_) => EnergyAmount::ZERO,
        }
    }

    pub fn status(&self) -> MachineStatus {
        match self {
            Machine::Generator(g) => g.status(),
            Machine::Battery(b) => b.status(),
            Machine::Processor(p) => p.status(),
        }
    }

    pub fn as_generator(&self) -> Option<&Generator> {
        match self {
            Machine::Generator(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_battery(&self) -> Option<&Battery> {
        match self {
            Machine::Battery(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_processor(&self) -> Option<&ProcessingMachine> {
        match self {
            Machine::Processor(p) => Some(p),
            _ => None,
        }
    }

    /// Read-only view for display layers.
    pub fn snapshot(&self) -> MachineSnapshot {
        let mut snap = MachineSnapshot {
            position: self.position(),
            kind: self.kind(),
            name: "",
            status: self.status(),
            stored_energy: self.stored_energy(),
            capacity: self.capacity(),
            charge: self.stored_energy().fraction_of(self.capacity()),
            progress: Fixed64::ZERO,
            rate: PowerRate::ZERO,
            fuel_slot: ItemSlot::empty(),
            input_slot: ItemSlot::empty(),
            output_slot: ItemSlot::empty(),
        };
        match self {
            Machine::Generator(g) => {
                snap.name = "Generator";
                snap.progress = g.burn_progress();
                snap.rate = g.production_rate();
                snap.fuel_slot = *g.fuel_slot();
            }
            Machine::Battery(b) => {
                snap.name = "Battery";
                snap.charge = b.charge_percentage();
                snap.rate = b.transfer_rate();
            }
            Machine::Processor(p) => {
                snap.name = p.machine_type_name();
                snap.progress = p.progress();
                snap.rate = p.consumption_rate();
                snap.input_slot = *p.input_slot();
                snap.output_slot = *p.output_slot();
            }
        }
        snap
    }
}

/// Everything a display page needs about one machine, copied out so the
/// caller cannot mutate simulation state through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub position: BlockPos,
    pub kind: MachineKind,
    pub name: &'static str,
    pub status: MachineStatus,
    pub stored_energy: EnergyAmount,
    pub capacity: EnergyAmount,
    /// `stored_energy / capacity`, 0 when capacity is zero.
    pub charge: Fixed64,
    /// Burn progress (generators) or recipe progress (processors).
    pub progress: Fixed64,
    /// Production rate (generators), consumption rate (processors) or
    /// last tick's net charge rate (batteries).
    pub rate: PowerRate,
    pub fuel_slot: ItemSlot,
    pub input_slot: ItemSlot,
    pub output_slot: ItemSlot,
}

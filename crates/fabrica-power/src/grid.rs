//! Placement facade for the host engine.
//!
//! The host discovers topology itself; it tells the grid which block was
//! placed and which already-placed positions it connects to. The grid
//! builds the machine from its content definition and keeps network
//! membership in step.

use std::collections::BTreeSet;

use fabrica_core::fixed::Ticks;
use fabrica_core::id::{BlockPos, ItemTypeId, NetworkId};
use fabrica_core::item::ItemStack;
use fabrica_core::registry::ContentRegistry;
use tracing::info;

use crate::config::PowerConfig;
use crate::error::{PowerError, PowerResult};
use crate::machine::{Battery, Generator, Machine, MachineKind, MachineSnapshot, ProcessingMachine};
use crate::registry::{NetworkRegistry, RegistryTick};

/// Networks, content and config in one place, with a running tick counter.
#[derive(Debug)]
pub struct PowerGrid {
    registry: NetworkRegistry,
    content: ContentRegistry,
    config: PowerConfig,
    tick: Ticks,
}

impl PowerGrid {
    pub fn new(content: ContentRegistry, config: PowerConfig) -> Self {
        Self {
            registry: NetworkRegistry::new(),
            content,
            config,
            tick: 0,
        }
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    pub fn network_of(&self, pos: BlockPos) -> Option<NetworkId> {
        self.registry.network_of(pos)
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    /// Place a machine of type `block_id` at `pos`, connected to the
    /// machines at `connections`. Joins the neighbours' network, merging
    /// several into the lowest id, or starts a new network when none of the
    /// neighbours is placed.
    pub fn machine_placed(
        &mut self,
        pos: BlockPos,
        block_id: &str,
        connections: &[BlockPos],
    ) -> PowerResult<NetworkId> {
        if let Some(network) = self.registry.network_of(pos) {
            return Err(PowerError::AlreadyRegistered { pos, network });
        }
        let def = self
            .content
            .machine_by_name(block_id)
            .ok_or_else(|| PowerError::UnknownMachineType(block_id.to_string()))?;
        let machine = Machine::from_class(pos, def.class, &self.config);

        let neighbours: BTreeSet<NetworkId> = connections
            .iter()
            .filter(|&&c| c != pos)
            .filter_map(|&c| self.registry.network_of(c))
            .collect();
        let mut neighbours = neighbours.into_iter();
        let target = match neighbours.next() {
            Some(id) => id,
            None => self.registry.create_network(),
        };
        for other in neighbours {
            self.registry.merge(target, other)?;
        }
        self.registry.join(machine, target)?;

        info!(position = %pos, block = block_id, network = ?target, "machine placed");
        Ok(target)
    }

    /// Remove the machine at `pos`. Its network is deleted once empty.
    ///
    /// Removing a bridging machine may disconnect the rest of the network;
    /// the host reports that with [`split`](Self::split).
    pub fn machine_removed(&mut self, pos: BlockPos) -> PowerResult<Machine> {
        let network = self
            .registry
            .network_of(pos)
            .ok_or(PowerError::UnregisteredMachine(pos))?;
        let machine = self.registry.leave(pos)?;
        if self.registry.network(network).is_some_and(|n| n.is_empty()) {
            self.registry.remove_network(network)?;
        }
        info!(position = %pos, network = ?network, "machine removed");
        Ok(machine)
    }

    /// Split a network whose members are no longer all connected.
    pub fn split(&mut self, network: NetworkId, groups: &[Vec<BlockPos>]) -> PowerResult<Vec<NetworkId>> {
        self.registry.split(network, groups)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn machine(&self, pos: BlockPos) -> PowerResult<&Machine> {
        self.registry
            .machine(pos)
            .ok_or(PowerError::UnregisteredMachine(pos))
    }

    pub fn generator(&self, pos: BlockPos) -> PowerResult<&Generator> {
        self.machine(pos)?
            .as_generator()
            .ok_or(PowerError::WrongMachineKind {
                pos,
                expected: MachineKind::Generator,
            })
    }

    pub fn battery(&self, pos: BlockPos) -> PowerResult<&Battery> {
        self.machine(pos)?
            .as_battery()
            .ok_or(PowerError::WrongMachineKind {
                pos,
                expected: MachineKind::Battery,
            })
    }

    pub fn processor(&self, pos: BlockPos) -> PowerResult<&ProcessingMachine> {
        self.machine(pos)?
            .as_processor()
            .ok_or(PowerError::WrongMachineKind {
                pos,
                expected: MachineKind::Processor,
            })
    }

    pub fn snapshot(&self, pos: BlockPos) -> PowerResult<MachineSnapshot> {
        self.machine(pos).map(Machine::snapshot)
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    fn machine_mut(&mut self, pos: BlockPos) -> PowerResult<&mut Machine> {
        self.registry
            .machine_mut(pos)
            .ok_or(PowerError::UnregisteredMachine(pos))
    }

    /// Put fuel into a generator. Returns the count that did not fit.
    pub fn insert_fuel(&mut self, pos: BlockPos, item: ItemTypeId, count: u32) -> PowerResult<u32> {
        match self.machine_mut(pos)? {
            Machine::Generator(g) => Ok(g.insert_fuel(item, count)),
            _ => Err(PowerError::WrongMachineKind {
                pos,
                expected: MachineKind::Generator,
            }),
        }
    }

    /// Put items into a processor's input slot. Returns the count that did
    /// not fit.
    pub fn insert_input(&mut self, pos: BlockPos, item: ItemTypeId, count: u32) -> PowerResult<u32> {
        match self.machine_mut(pos)? {
            Machine::Processor(p) => Ok(p.insert_input(item, count)),
            _ => Err(PowerError::WrongMachineKind {
                pos,
                expected: MachineKind::Processor,
            }),
        }
    }

    /// Take up to `count` items from a processor's output slot.
    pub fn take_output(&mut self, pos: BlockPos, count: u32) -> PowerResult<Option<ItemStack>> {
        match self.machine_mut(pos)? {
            Machine::Processor(p) => Ok(p.take_output(count)),
            _ => Err(PowerError::WrongMachineKind {
                pos,
                expected: MachineKind::Processor,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Advance every network by one tick.
    pub fn tick(&mut self) -> RegistryTick {
        self.advance(1)
    }

    /// Advance every network by `delta` ticks in one step.
    pub fn advance(&mut self, delta: Ticks) -> RegistryTick {
        self.tick += delta;
        self.registry
            .tick(delta, self.tick, &self.content, &self.config)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

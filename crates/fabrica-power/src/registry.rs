use std::collections::{BTreeSet, HashMap};

use fabrica_core::fixed::Ticks;
use fabrica_core::id::{BlockPos, NetworkId};
use fabrica_core::registry::ContentRegistry;
use slotmap::SlotMap;
use tracing::info;

use crate::config::PowerConfig;
use crate::error::{PowerError, PowerResult};
use crate::event::PowerEvent;
use crate::machine::Machine;
use crate::network::{NetworkTick, PowerNetwork, TickReport};

/// Output of [`NetworkRegistry::tick`], in network-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryTick {
    pub reports: Vec<(NetworkId, TickReport)>,
    pub events: Vec<PowerEvent>,
}

/// Owns every power network and records which network each machine
/// position belongs to. A position is a member of at most one network.
#[derive(Debug, Default)]
pub struct NetworkRegistry {
    networks: SlotMap<NetworkId, PowerNetwork>,
    membership: HashMap<BlockPos, NetworkId>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_network(&mut self) -> NetworkId {
        let id = self.networks.insert_with_key(PowerNetwork::new);
        info!(network = ?id, "power network created");
        id
    }

    /// Delete a network, handing its machines back to the caller.
    pub fn remove_network(&mut self, id: NetworkId) -> PowerResult<Vec<Machine>> {
        let mut network = self
            .networks
            .remove(id)
            .ok_or(PowerError::UnknownNetwork(id))?;
        let machines: Vec<Machine> = network.take_machines().into_values().collect();
        for m in &machines {
            self.membership.remove(&m.position());
        }
        info!(network = ?id, machines = machines.len(), "power network removed");
        Ok(machines)
    }

    /// Add `machine` to `network`.
    pub fn join(&mut self, machine: Machine, network: NetworkId) -> PowerResult<()> {
        let pos = machine.position();
        if let Some(&existing) = self.membership.get(&pos) {
            return Err(PowerError::AlreadyRegistered {
                pos,
                network: existing,
            });
        }
        let net = self
            .networks
            .get_mut(network)
            .ok_or(PowerError::UnknownNetwork(network))?;
        net.insert(machine);
        self.membership.insert(pos, network);
        Ok(())
    }

    /// Remove the machine at `pos` from its network.
    pub fn leave(&mut self, pos: BlockPos) -> PowerResult<Machine> {
        let id = self
            .membership
            .remove(&pos)
            .ok_or(PowerError::UnregisteredMachine(pos))?;
        self.networks
            .get_mut(id)
            .and_then(|net| net.remove(pos))
            .ok_or(PowerError::UnregisteredMachine(pos))
    }

    pub fn network_of(&self, pos: BlockPos) -> Option<NetworkId> {
        self.membership.get(&pos).copied()
    }

    pub fn network(&self, id: NetworkId) -> Option<&PowerNetwork> {
        self.networks.get(id)
    }

    /// All networks in id order.
    pub fn networks(&self) -> impl Iterator<Item = (NetworkId, &PowerNetwork)> {
        self.networks.iter()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn machine_count(&self) -> usize {
        self.membership.len()
    }

    pub fn machine(&self, pos: BlockPos) -> Option<&Machine> {
        let id = self.network_of(pos)?;
        self.networks.get(id)?.machine(pos)
    }

    pub fn machine_mut(&mut self, pos: BlockPos) -> Option<&mut Machine> {
        let id = self.network_of(pos)?;
        self.networks.get_mut(id)?.machine_mut(pos)
    }

    /// Move every machine of `from` into `into` and delete `from`.
    pub fn merge(&mut self, into: NetworkId, from: NetworkId) -> PowerResult<()> {
        if into == from {
            return Ok(());
        }
        if !self.networks.contains_key(into) {
            return Err(PowerError::UnknownNetwork(into));
        }
        let mut source = self
            .networks
            .remove(from)
            .ok_or(PowerError::UnknownNetwork(from))?;
        let moved = source.take_machines();
        let count = moved.len();
        if let Some(target) = self.networks.get_mut(into) {
            for (pos, machine) in moved {
                target.insert(machine);
                self.membership.insert(pos, into);
            }
        }
        info!(into = ?into, from = ?from, machines = count, "power networks merged");
        Ok(())
    }

    /// Split `id` into one network per group. The first group stays in
    /// `id`; each further group gets a fresh network. Groups must be
    /// non-empty and cover every member exactly once.
    ///
    /// Returns the network id of each group, in order.
    pub fn split(&mut self, id: NetworkId, groups: &[Vec<BlockPos>]) -> PowerResult<Vec<NetworkId>> {
        let network = self.networks.get(id).ok_or(PowerError::UnknownNetwork(id))?;

        let mut seen = BTreeSet::new();
        for pos in groups.iter().flatten() {
            if !network.contains(*pos) || !seen.insert(*pos) {
                return Err(PowerError::SplitMismatch(id));
            }
        }
        if seen.len() != network.len() || groups.iter().any(Vec::is_empty) {
            return Err(PowerError::SplitMismatch(id));
        }

        let mut ids = vec![id];
        for group in groups.iter().skip(1) {
            let new_id = self.networks.insert_with_key(PowerNetwork::new);
            for pos in group {
                let machine = self.networks.get_mut(id).and_then(|net| net.remove(*pos));
                if let (Some(machine), Some(target)) = (machine, self.networks.get_mut(new_id)) {
                    target.insert(machine);
                    self.membership.insert(*pos, new_id);
                }
            }
            ids.push(new_id);
        }
        info!(network = ?id, parts = ids.len(), "power network split");
        Ok(ids)
    }

    /// Tick every network once. Networks share nothing, so with the
    /// `parallel` feature they run on the rayon pool; results are gathered
    /// in id order either way.
    pub fn tick(
        &mut self,
        delta: Ticks,
        tick: Ticks,
        content: &ContentRegistry,
        config: &PowerConfig,
    ) -> RegistryTick {
        let results = self.tick_networks(delta, tick, content, config);

        let mut out = RegistryTick::default();
        for (id, result) in results {
            out.reports.push((id, result.report));
            out.events.extend(result.events);
        }
        out
    }

    #[cfg(not(feature = "parallel"))]
    fn tick_networks(
        &mut self,
        delta: Ticks,
        tick: Ticks,
        content: &ContentRegistry,
        config: &PowerConfig,
    ) -> Vec<(NetworkId, NetworkTick)> {
        self.networks
            .iter_mut()
            .map(|(id, net)| (id, net.tick(delta, tick, content, config)))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn tick_networks(
        &mut self,
        delta: Ticks,
        tick: Ticks,
        content: &ContentRegistry,
        config: &PowerConfig,
    ) -> Vec<(NetworkId, NetworkTick)> {
        use rayon::prelude::*;

        let networks: Vec<(NetworkId, &mut PowerNetwork)> = self.networks.iter_mut().collect();
        networks
            .into_par_iter()
            .map(|(id, net)| (id, net.tick(delta, tick, content, config)))
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

use std::collections::BTreeMap;

use fabrica_core::fixed::{Fixed64, Ticks, ratio_clamped};
use fabrica_core::id::{BlockPos, NetworkId};
use fabrica_core::ledger::EnergyAmount;
use fabrica_core::registry::ContentRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PowerConfig;
use crate::distribution::{BatteryLimits, allocate};
use crate::event::PowerEvent;
use crate::machine::{Machine, MachineStatus};

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Energy flows of one network over one tick.
///
/// Always balances exactly:
/// `offered + discharged == delivered + charged + retained + wasted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Generator production plus generator buffer contents.
    pub offered: EnergyAmount,
    /// Total consumer demand.
    pub requested: EnergyAmount,
    /// Energy consumers actually drew.
    pub delivered: EnergyAmount,
    /// Energy pulled out of batteries.
    pub discharged: EnergyAmount,
    /// Energy pushed into batteries.
    pub charged: EnergyAmount,
    /// Unused energy kept in generator buffers.
    pub retained: EnergyAmount,
    /// Energy nothing could take.
    pub wasted: EnergyAmount,
    /// `delivered / requested`, 1 when nothing was requested.
    pub satisfaction: Fixed64,
}

impl TickReport {
    /// Whether consumers went short this tick.
    pub fn is_brownout(&self) -> bool {
        self.delivered < self.requested
    }

    pub fn deficit(&self) -> EnergyAmount {
        self.requested.saturating_sub(self.delivered)
    }
}

/// Output of [`PowerNetwork::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkTick {
    pub report: TickReport,
    pub events: Vec<PowerEvent>,
}

// ---------------------------------------------------------------------------
// Power network
// ---------------------------------------------------------------------------

/// A set of connected machines that share energy.
///
/// Machines are keyed by position, so every pass over them runs in
/// ascending `BlockPos` order regardless of when they joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerNetwork {
    id: NetworkId,
    machines: BTreeMap<BlockPos, Machine>,
    /// Satisfaction ratio of the last tick.
    satisfaction: Fixed64,
    /// Whether the last tick was a brownout. Used for transition events.
    was_brownout: bool,
    last_report: TickReport,
}

impl PowerNetwork {
    pub fn new(id: NetworkId) -> Self {
        Self {
            id,
            machines: BTreeMap::new(),
            satisfaction: Fixed64::from_num(1),
            was_brownout: false,
            last_report: TickReport::default(),
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.machines.contains_key(&pos)
    }

    pub fn machine(&self, pos: BlockPos) -> Option<&Machine> {
        self.machines.get(&pos)
    }

    pub fn machine_mut(&mut self, pos: BlockPos) -> Option<&mut Machine> {
        self.machines.get_mut(&pos)
    }

    /// Members in ascending position order.
    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.values()
    }

    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.machines.keys().copied()
    }

    pub fn satisfaction(&self) -> Fixed64 {
        self.satisfaction
    }

    pub fn is_brownout(&self) -> bool {
        self.was_brownout
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    /// Energy held in batteries and generator buffers.
    pub fn stored_energy(&self) -> EnergyAmount {
        self.machines.values().map(Machine::stored_energy).sum()
    }

    /// Membership changes go through the registry so positions stay unique
    /// across networks.
    pub(crate) fn insert(&mut self, machine: Machine) -> Option<Machine> {
        self.machines.insert(machine.position(), machine)
    }

    pub(crate) fn remove(&mut self, pos: BlockPos) -> Option<Machine> {
        self.machines.remove(&pos)
    }

    pub(crate) fn take_machines(&mut self) -> BTreeMap<BlockPos, Machine> {
        std::mem::take(&mut self.machines)
    }

    /// Run one tick over `delta` simulation ticks.
    ///
    /// Every generator is staged and every request collected before any
    /// machine changes, then the allocation is committed in one pass.
    pub fn tick(
        &mut self,
        delta: Ticks,
        tick: Ticks,
        content: &ContentRegistry,
        config: &PowerConfig,
    ) -> NetworkTick {
        let before: Vec<MachineStatus> = if config.status_events {
            self.machines.values().map(Machine::status).collect()
        } else {
            Vec::new()
        };

        // Steps 1-2: stage generators, collect requests and battery limits.
        let mut stages = Vec::new();
        let mut offers = Vec::new();
        let mut requests = Vec::new();
        let mut limits = Vec::new();
        for machine in self.machines.values() {
            match machine {
                Machine::Generator(g) => {
                    let stage = g.stage(delta, content);
                    offers.push(stage.offered);
                    stages.push(stage);
                }
                Machine::Battery(b) => limits.push(BatteryLimits {
                    accept: b.acceptance_limit(delta),
                    release: b.release_limit(delta),
                }),
                Machine::Processor(p) => requests.push(p.requested(delta, content)),
            }
        }

        // Steps 3-5: decide every transfer.
        let allocation = allocate(&offers, &requests, &limits, config.partial_power);

        // Step 6: commit.
        let mut report = TickReport {
            offered: offers.iter().copied().sum(),
            requested: requests.iter().copied().sum(),
            ..TickReport::default()
        };
        let (mut gi, mut bi, mut pi) = (0, 0, 0);
        for machine in self.machines.values_mut() {
            match machine {
                Machine::Generator(g) => {
                    g.commit(stages[gi]);
                    let back = allocation.returned[gi];
                    let lost = g.reclaim(back);
                    report.retained = report.retained + back.saturating_sub(lost);
                    report.wasted = report.wasted + lost;
                    gi += 1;
                }
                Machine::Battery(b) => {
                    b.begin_tick(delta);
                    let charge = allocation.charged[bi];
                    let accepted = b.receive(charge);
                    report.wasted = report.wasted + charge.saturating_sub(accepted);
                    report.discharged = report.discharged + b.withdraw(allocation.discharged[bi]);
                    bi += 1;
                }
                Machine::Processor(p) => {
                    let grant = allocation.grants[pi];
                    let drawn = p.advance(delta, grant, content, config.partial_power);
                    // Grants never exceed the request staged above, so a
                    // processor draws all of it.
                    debug_assert_eq!(drawn, grant, "processor left part of its grant");
                    report.delivered = report.delivered + drawn;
                    report.wasted = report.wasted + grant.saturating_sub(drawn);
                    pi += 1;
                }
            }
        }

        report.charged = self
            .machines
            .values()
            .filter_map(Machine::as_battery)
            .map(|b| b.received())
            .sum();

        // Step 7: satisfaction, events.
        report.satisfaction = if report.requested.is_zero() {
            Fixed64::from_num(1)
        } else {
            ratio_clamped(report.delivered.value(), report.requested.value())
        };

        let mut events = Vec::new();
        if config.status_events {
            for (machine, from) in self.machines.values().zip(before) {
                let to = machine.status();
                if to != from {
                    events.push(PowerEvent::MachineStatusChanged {
                        network: self.id,
                        position: machine.position(),
                        from,
                        to,
                        tick,
                    });
                }
            }
        }

        let brownout = report.is_brownout();
        if brownout && !self.was_brownout {
            info!(network = ?self.id, deficit = %report.deficit(), tick, "power network brownout");
            events.push(PowerEvent::Brownout {
                network: self.id,
                deficit: report.deficit(),
                tick,
            });
        } else if !brownout && self.was_brownout {
            info!(network = ?self.id, tick, "power network restored");
            events.push(PowerEvent::Restored {
                network: self.id,
                tick,
            });
        }

        debug!(
            network = ?self.id,
            tick,
            offered = %report.offered,
            requested = %report.requested,
            delivered = %report.delivered,
            charged = %report.charged,
            discharged = %report.discharged,
            wasted = %report.wasted,
            "power network tick"
        );

        self.satisfaction = report.satisfaction;
        self.was_brownout = brownout;
        self.last_report = report;
        NetworkTick { report, events }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartialPower;
    use crate::machine::{Battery, Generator, IdleReason, ProcessingMachine};
    use fabrica_core::id::ItemTypeId;
    use fabrica_core::registry::ProcessingKind;
    use fabrica_core::test_utils::*;
    use slotmap::SlotMap;

    fn network_id() -> NetworkId {
        let mut ids: SlotMap<NetworkId, ()> = SlotMap::with_key();
        ids.insert(())
    }

    fn generator(x: i32, fuel: ItemTypeId, count: u32) -> Machine {
        let mut g = Generator::new(pos(x), EnergyAmount::ZERO, 64);
        assert_eq!(g.insert_fuel(fuel, count), 0);
        Machine::Generator(g)
    }

    fn furnace(x: i32, ore: u32) -> Machine {
        let mut p = ProcessingMachine::new(pos(x), ProcessingKind::ElectricFurnace, 64);
        assert_eq!(p.insert_input(iron_ore(), ore), 0);
        Machine::Processor(p)
    }

    fn battery(x: i32, stored: u32, capacity: u32) -> Machine {
        let mut b = Battery::new(pos(x), joules(capacity));
        let _ = b.receive(joules(stored));
        Machine::Battery(b)
    }

    fn network(machines: Vec<Machine>) -> PowerNetwork {
        let mut net = PowerNetwork::new(network_id());
        for m in machines {
            assert!(net.insert(m).is_none());
        }
        net
    }

    fn assert_balanced(r: &TickReport) {
        let inflow = r.offered.units() as i128 + r.discharged.units() as i128;
        let outflow = r.delivered.units() as i128
            + r.charged.units() as i128
            + r.retained.units() as i128
            + r.wasted.units() as i128;
        assert_eq!(inflow, outflow, "unbalanced report: {r:?}");
    }

    // -----------------------------------------------------------------------
    // 1. Generator to consumer
    // -----------------------------------------------------------------------

    #[test]
    fn generator_feeds_throttled_furnace() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![generator(0, coal(), 1), furnace(1, 1)]);

        let out = net.tick(1, 1, &content, &config);
        assert_eq!(out.report.offered, joules(10));
        assert_eq!(out.report.requested, joules(30));
        assert_eq!(out.report.delivered, joules(10));
        assert_eq!(out.report.wasted, EnergyAmount::ZERO);
        assert_balanced(&out.report);

        let p = net.machine(pos(1)).and_then(Machine::as_processor).unwrap();
        assert_eq!(p.progress(), joules(10).fraction_of(joules(SMELT_COST)));
        assert_eq!(p.status(), MachineStatus::Active);
    }

    #[test]
    fn surplus_without_storage_is_wasted() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![generator(0, coal(), 1)]);
        let out = net.tick(5, 5, &content, &config);
        assert_eq!(out.report.offered, joules(50));
        assert_eq!(out.report.wasted, joules(50));
        assert_balanced(&out.report);
    }

    // -----------------------------------------------------------------------
    // 2. Batteries
    // -----------------------------------------------------------------------

    #[test]
    fn surplus_charges_battery_up_to_capacity() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![generator(0, coal(), 1), battery(1, 95, 100)]);
        let out = net.tick(1, 1, &content, &config);
        assert_eq!(out.report.charged, joules(5));
        assert_eq!(out.report.wasted, joules(5));
        assert_eq!(net.machine(pos(1)).unwrap().stored_energy(), joules(100));
        assert_balanced(&out.report);
    }

    #[test]
    fn battery_covers_deficit() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![
            generator(0, coal(), 1),
            battery(1, 1000, 1000),
            furnace(2, 1),
        ]);
        let out = net.tick(1, 1, &content, &config);
        assert_eq!(out.report.delivered, joules(30));
        assert_eq!(out.report.discharged, joules(20));
        assert_eq!(out.report.satisfaction, Fixed64::from_num(1));
        assert!(out.events.iter().all(|e| !matches!(e, PowerEvent::Brownout { .. })));
        assert_balanced(&out.report);
    }

    // -----------------------------------------------------------------------
    // 3. Events
    // -----------------------------------------------------------------------

    #[test]
    fn brownout_fires_once_then_restores() {
        let content = test_content();
        let config = PowerConfig::default().with_status_events(false);
        let mut net = network(vec![furnace(1, 1)]);

        let first = net.tick(1, 1, &content, &config);
        assert!(matches!(
            first.events.as_slice(),
            [PowerEvent::Brownout { deficit, tick: 1, .. }] if *deficit == joules(30)
        ));
        assert!(net.is_brownout());

        let second = net.tick(1, 2, &content, &config);
        assert!(second.events.is_empty());

        assert!(net.insert(generator(0, coal(), 10)).is_none());
        assert!(net.insert(battery(2, 1000, 1000)).is_none());
        let third = net.tick(1, 3, &content, &config);
        assert!(matches!(
            third.events.as_slice(),
            [PowerEvent::Restored { tick: 3, .. }]
        ));
        assert_eq!(net.satisfaction(), Fixed64::from_num(1));
    }

    #[test]
    fn status_changes_are_reported_once() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![generator(0, coal(), 1)]);

        let first = net.tick(1, 1, &content, &config);
        assert!(first.events.iter().any(|e| matches!(
            e,
            PowerEvent::MachineStatusChanged { to: MachineStatus::Active, .. }
        )));
        let second = net.tick(1, 2, &content, &config);
        assert!(second.events.is_empty());
    }

    // -----------------------------------------------------------------------
    // 4. Fairness and starvation
    // -----------------------------------------------------------------------

    #[test]
    fn equal_consumers_get_equal_shares() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![generator(0, coal(), 1), furnace(1, 1), furnace(2, 1)]);
        net.tick(1, 1, &content, &config);

        let a = net.machine(pos(1)).and_then(Machine::as_processor).unwrap();
        let b = net.machine(pos(2)).and_then(Machine::as_processor).unwrap();
        assert_eq!(a.progress(), b.progress());
    }

    #[test]
    fn unpowered_consumer_is_underpowered() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![furnace(1, 1)]);
        net.tick(1, 1, &content, &config);
        assert_eq!(
            net.machine(pos(1)).unwrap().status(),
            MachineStatus::Underpowered
        );
    }

    #[test]
    fn idle_consumer_requests_nothing() {
        let content = test_content();
        let config = PowerConfig::default();
        let mut net = network(vec![generator(0, coal(), 1), furnace(1, 0)]);
        let out = net.tick(1, 1, &content, &config);
        assert_eq!(out.report.requested, EnergyAmount::ZERO);
        assert_eq!(
            net.machine(pos(1)).unwrap().status(),
            MachineStatus::Idle(IdleReason::NoInput)
        );
    }

    #[test]
    fn stall_policy_keeps_progress_at_zero() {
        let content = test_content();
        let config = PowerConfig::default().with_partial_power(PartialPower::Stall);
        let mut net = network(vec![generator(0, coal(), 1), furnace(1, 1)]);
        let out = net.tick(1, 1, &content, &config);
        assert_eq!(out.report.delivered, EnergyAmount::ZERO);
        assert_eq!(out.report.wasted, joules(10));
        assert_balanced(&out.report);
        let p = net.machine(pos(1)).and_then(Machine::as_processor).unwrap();
        assert_eq!(p.progress(), Fixed64::ZERO);
        assert_eq!(p.status(), MachineStatus::Underpowered);
    }

    #[test]
    fn stalled_grant_respects_battery_transfer_limit() {
        let content = test_content();
        let config = PowerConfig::default().with_partial_power(PartialPower::Stall);
        let mut limited = Battery::new(pos(1), joules(100)).with_transfer_limit(Some(rate(4)));
        let _ = limited.receive(joules(5));
        let mut net = network(vec![
            generator(0, coal(), 1),
            Machine::Battery(limited),
            furnace(2, 1),
        ]);

        let out = net.tick(1, 1, &content, &config);
        assert_eq!(out.report.delivered, EnergyAmount::ZERO);
        assert_eq!(out.report.discharged, EnergyAmount::ZERO);
        assert_eq!(out.report.charged, joules(4));
        assert_eq!(out.report.wasted, joules(6));
        assert_balanced(&out.report);

        let b = net.machine(pos(1)).and_then(Machine::as_battery).unwrap();
        assert_eq!(b.stored_energy(), joules(9));
        assert_eq!(b.received(), joules(4));
    }

    // -----------------------------------------------------------------------
    // 5. Determinism
    // -----------------------------------------------------------------------

    #[test]
    fn insertion_order_does_not_matter() {
        let content = test_content();
        let config = PowerConfig::default();
        let build = |order: &[i32]| {
            let machines = order
                .iter()
                .map(|&x| match x {
                    0 => generator(0, wood(), 5),
                    1 => battery(1, 7, 50),
                    _ => furnace(x, 3),
                })
                .collect();
            network(machines)
        };
        let mut a = build(&[0, 1, 2, 3]);
        let mut b = build(&[3, 1, 2, 0]);
        for t in 1..=12 {
            let ra = a.tick(1, t, &content, &config);
            let rb = b.tick(1, t, &content, &config);
            assert_eq!(ra.report, rb.report);
        }
        for (ma, mb) in a.machines().zip(b.machines()) {
            assert_eq!(ma.snapshot(), mb.snapshot());
        }
    }
}

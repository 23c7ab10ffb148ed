use fabrica_core::fixed::{Fixed64, Ticks};
use fabrica_core::id::BlockPos;
use fabrica_core::ledger::{EnergyAmount, PowerRate};
use serde::{Deserialize, Serialize};

use super::{IdleReason, MachineStatus};

/// An energy reservoir. Has no behaviour of its own; the network charges
/// and discharges it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    position: BlockPos,
    stored: EnergyAmount,
    capacity: EnergyAmount,
    /// Per-tick cap on both charging and discharging. `None` is unlimited.
    transfer_limit: Option<PowerRate>,
    /// Flow since the last [`begin_tick`](Self::begin_tick).
    received: EnergyAmount,
    released: EnergyAmount,
    last_delta: Ticks,
    /// Set by the first network tick.
    ticked: bool,
}

impl Battery {
    pub fn new(position: BlockPos, capacity: EnergyAmount) -> Self {
        Self {
            position,
            stored: EnergyAmount::ZERO,
            capacity,
            transfer_limit: None,
            received: EnergyAmount::ZERO,
            released: EnergyAmount::ZERO,
            last_delta: 1,
            ticked: false,
        }
    }

    pub fn with_transfer_limit(mut self, limit: Option<PowerRate>) -> Self {
        self.transfer_limit = limit;
        self
    }

    pub fn position(&self) -> BlockPos {
        self.position
    }

    pub fn stored_energy(&self) -> EnergyAmount {
        self.stored
    }

    pub fn capacity(&self) -> EnergyAmount {
        self.capacity
    }

    pub fn transfer_limit(&self) -> Option<PowerRate> {
        self.transfer_limit
    }

    /// `stored / capacity`, 0 for a zero-capacity battery.
    pub fn charge_percentage(&self) -> Fixed64 {
        self.stored.fraction_of(self.capacity)
    }

    pub fn headroom(&self) -> EnergyAmount {
        self.capacity.saturating_sub(self.stored)
    }

    /// How much the battery can take over `delta` ticks.
    pub fn acceptance_limit(&self, delta: Ticks) -> EnergyAmount {
        let headroom = self.headroom();
        match self.transfer_limit {
            Some(limit) => headroom.min(limit.over(delta)),
            None => headroom,
        }
    }

    /// How much the battery can give over `delta` ticks.
    pub fn release_limit(&self, delta: Ticks) -> EnergyAmount {
        match self.transfer_limit {
            Some(limit) => self.stored.min(limit.over(delta)),
            None => self.stored,
        }
    }

    /// Store as much of `amount` as fits. Returns the accepted amount.
    pub fn receive(&mut self, amount: EnergyAmount) -> EnergyAmount {
        let accepted = amount.min(self.headroom());
        self.stored = self.stored + accepted;
        self.received = self.received + accepted;
        accepted
    }

    /// Release up to `amount`. Returns the released amount.
    pub fn withdraw(&mut self, amount: EnergyAmount) -> EnergyAmount {
        let released = amount.min(self.stored);
        self.stored = self.stored.saturating_sub(released);
        self.released = self.released + released;
        released
    }

    /// Reset the flow counters at the start of a network tick.
    pub fn begin_tick(&mut self, delta: Ticks) {
        self.received = EnergyAmount::ZERO;
        self.released = EnergyAmount::ZERO;
        self.last_delta = delta;
        self.ticked = true;
    }

    /// Energy received since the tick began.
    pub fn received(&self) -> EnergyAmount {
        self.received
    }

    /// Energy released since the tick began.
    pub fn released(&self) -> EnergyAmount {
        self.released
    }

    /// Magnitude of the net flow over the last tick, per tick.
    pub fn transfer_rate(&self) -> PowerRate {
        let net = if self.received >= self.released {
            self.received.saturating_sub(self.released)
        } else {
            self.released.saturating_sub(self.received)
        };
        PowerRate::observed(net, self.last_delta)
    }

    /// Whether the last tick charged (true) or discharged the battery.
    pub fn is_charging(&self) -> bool {
        self.received > self.released
    }

    pub fn status(&self) -> MachineStatus {
        if !self.ticked {
            MachineStatus::Placed
        } else if self.received.is_zero() && self.released.is_zero() {
            MachineStatus::Idle(IdleReason::Standby)
        } else {
            MachineStatus::Active
        }
    }
}

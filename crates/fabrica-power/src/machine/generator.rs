use fabrica_core::fixed::{Fixed64, Ticks, ratio_clamped, ticks_to_fixed64};
use fabrica_core::id::{BlockPos, ItemTypeId};
use fabrica_core::item::{ItemSlot, ItemStack};
use fabrica_core::ledger::{EnergyAmount, PowerRate};
use fabrica_core::registry::ContentRegistry;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{IdleReason, MachineStatus};

/// One fuel unit being burned. Tracked in whole ticks so burn length is
/// exact regardless of fixed-point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burn {
    pub fuel: ItemTypeId,
    pub rate: PowerRate,
    pub elapsed: Ticks,
    pub duration: Ticks,
}

impl Burn {
    fn remaining(&self) -> Ticks {
        self.duration.saturating_sub(self.elapsed)
    }
}

/// The result of integrating a generator over one tick, computed without
/// touching the generator. Applied with [`Generator::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorStage {
    pub burn: Option<Burn>,
    pub fuel_slot: ItemSlot,
    /// Energy produced by burning during the tick.
    pub produced: EnergyAmount,
    /// `produced` plus the internal buffer contents.
    pub offered: EnergyAmount,
    pub status: MachineStatus,
}

/// A fuel-burning generator with a small internal buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    position: BlockPos,
    fuel_slot: ItemSlot,
    burn: Option<Burn>,
    buffer: EnergyAmount,
    buffer_capacity: EnergyAmount,
    stack_limit: u32,
    status: MachineStatus,
}

impl Generator {
    pub fn new(position: BlockPos, buffer_capacity: EnergyAmount, stack_limit: u32) -> Self {
        Self {
            position,
            fuel_slot: ItemSlot::empty(),
            burn: None,
            buffer: EnergyAmount::ZERO,
            buffer_capacity,
            stack_limit,
            status: MachineStatus::default(),
        }
    }

    pub fn position(&self) -> BlockPos {
        self.position
    }

    pub fn fuel_slot(&self) -> &ItemSlot {
        &self.fuel_slot
    }

    pub fn burn(&self) -> Option<&Burn> {
        self.burn.as_ref()
    }

    pub fn is_burning(&self) -> bool {
        self.burn.is_some()
    }

    /// Fraction of the current fuel unit consumed, 0 when not burning.
    pub fn burn_progress(&self) -> Fixed64 {
        self.burn.map_or(Fixed64::ZERO, |b| {
            ratio_clamped(ticks_to_fixed64(b.elapsed), ticks_to_fixed64(b.duration))
        })
    }

    /// The burning fuel's declared rate, 0 when not burning.
    pub fn production_rate(&self) -> PowerRate {
        self.burn.map_or(PowerRate::ZERO, |b| b.rate)
    }

    pub fn stored_energy(&self) -> EnergyAmount {
        self.buffer
    }

    pub fn buffer_capacity(&self) -> EnergyAmount {
        self.buffer_capacity
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// Add fuel to the slot. Returns the count that did not fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn insert_fuel(&mut self, item: ItemTypeId, count: u32) -> u32 {
        self.fuel_slot.insert(item, count, self.stack_limit)
    }

    /// Remove up to `count` fuel items. A burn already in progress keeps
    /// going.
    #[must_use = "returns the stack actually removed"]
    pub fn take_fuel(&mut self, count: u32) -> Option<ItemStack> {
        self.fuel_slot.take(count)
    }

    /// Integrate `delta` ticks of burning without mutating `self`.
    ///
    /// Burns are walked segment by segment: a burn that ends inside the
    /// delta produces only for its remaining ticks and the next fuel unit
    /// (if any) is lit for the rest.
    pub fn stage(&self, delta: Ticks, content: &ContentRegistry) -> GeneratorStage {
        let mut burn = self.burn;
        let mut fuel_slot = self.fuel_slot;
        let mut produced = EnergyAmount::ZERO;
        let mut remaining = delta;
        let mut idle = None;

        while remaining > 0 {
            let current = match burn {
                Some(b) => b,
                None => match ignite(&mut fuel_slot, content) {
                    Ok(b) => b,
                    Err(reason) => {
                        idle = Some(reason);
                        break;
                    }
                },
            };
            let step = current.remaining().min(remaining);
            produced = produced + current.rate.over(step);
            remaining -= step;

            let next = Burn {
                elapsed: current.elapsed + step,
                ..current
            };
            burn = (next.remaining() > 0).then_some(next);
        }

        // A burn that ends exactly with the delta lights the next unit now,
        // so the rate does not drop to zero between two fuel units.
        if burn.is_none() && idle.is_none() && delta > 0 {
            burn = ignite(&mut fuel_slot, content).ok();
        }

        let status = match idle {
            Some(reason) if produced.is_zero() && burn.is_none() => MachineStatus::Idle(reason),
            _ if delta == 0 => self.status,
            _ => MachineStatus::Active,
        };

        GeneratorStage {
            burn,
            fuel_slot,
            produced,
            offered: produced + self.buffer,
            status,
        }
    }

    /// Apply a stage produced by [`stage`](Self::stage). The buffer is
    /// drained into the offer; hand back what the network did not take
    /// with [`reclaim`](Self::reclaim).
    pub fn commit(&mut self, stage: GeneratorStage) -> EnergyAmount {
        let unusable = MachineStatus::Idle(IdleReason::UnusableFuel);
        if stage.status == unusable && self.status != unusable {
            warn!(
                position = %self.position,
                item = ?stage.fuel_slot.item(),
                "generator fuel slot holds an item that is not a fuel"
            );
        }
        if stage.status == MachineStatus::Idle(IdleReason::Faulted)
            && self.status != stage.status
        {
            warn!(position = %self.position, "generator fuel has a zero burn duration");
        }
        self.burn = stage.burn;
        self.fuel_slot = stage.fuel_slot;
        self.status = stage.status;
        self.buffer = EnergyAmount::ZERO;
        stage.offered
    }

    /// Stage and commit in one step. Returns the offered energy.
    pub fn advance(&mut self, delta: Ticks, content: &ContentRegistry) -> EnergyAmount {
        let stage = self.stage(delta, content);
        self.commit(stage)
    }

    /// Take back energy the network could not use. Keeps what fits in the
    /// buffer and returns the wasted remainder.
    pub fn reclaim(&mut self, amount: EnergyAmount) -> EnergyAmount {
        let room = self.buffer_capacity.saturating_sub(self.buffer);
        let kept = amount.min(room);
        self.buffer = self.buffer + kept;
        amount.saturating_sub(kept)
    }
}

/// Take one fuel unit from `slot` and start burning it.
fn ignite(slot: &mut ItemSlot, content: &ContentRegistry) -> Result<Burn, IdleReason> {
    let item = slot.item().ok_or(IdleReason::NoFuel)?;
    let fuel = content.fuel(item).ok_or(IdleReason::UnusableFuel)?;
    if fuel.burn_duration == 0 {
        return Err(IdleReason::Faulted);
    }
    if slot.take(1).is_none() {
        return Err(IdleReason::NoFuel);
    }
    Ok(Burn {
        fuel: item,
        rate: fuel.energy_per_tick,
        elapsed: 0,
        duration: fuel.burn_duration,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

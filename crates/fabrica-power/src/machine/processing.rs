use fabrica_core::fixed::{Fixed64, Ticks};
use fabrica_core::id::{BlockPos, ItemTypeId};
use fabrica_core::item::{ItemSlot, ItemStack};
use fabrica_core::ledger::{EnergyAmount, PowerRate};
use fabrica_core::registry::{ContentRegistry, ProcessingKind, RecipeDef};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{IdleReason, MachineStatus};
use crate::config::PartialPower;

/// An electric machine that turns one input item into output items by
/// spending a recipe's energy cost.
///
/// Progress is tracked as energy spent on the current cycle, so a machine
/// that is throttled for a while finishes exactly when the full cost has
/// been drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMachine {
    position: BlockPos,
    kind: ProcessingKind,
    input_slot: ItemSlot,
    output_slot: ItemSlot,
    /// Input item the current cycle was started for.
    bound_input: Option<ItemTypeId>,
    cycle_energy: EnergyAmount,
    cycle_cost: EnergyAmount,
    rate: PowerRate,
    stack_limit: u32,
    status: MachineStatus,
}

impl ProcessingMachine {
    pub fn new(position: BlockPos, kind: ProcessingKind, stack_limit: u32) -> Self {
        Self {
            position,
            kind,
            input_slot: ItemSlot::empty(),
            output_slot: ItemSlot::empty(),
            bound_input: None,
            cycle_energy: EnergyAmount::ZERO,
            cycle_cost: EnergyAmount::ZERO,
            rate: PowerRate::ZERO,
            stack_limit,
            status: MachineStatus::default(),
        }
    }

    pub fn position(&self) -> BlockPos {
        self.position
    }

    pub fn kind(&self) -> ProcessingKind {
        self.kind
    }

    pub fn machine_type_name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn input_slot(&self) -> &ItemSlot {
        &self.input_slot
    }

    pub fn output_slot(&self) -> &ItemSlot {
        &self.output_slot
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// Fraction of the current cycle's energy cost already spent.
    pub fn progress(&self) -> Fixed64 {
        self.cycle_energy.fraction_of(self.cycle_cost)
    }

    /// Full-power draw of the bound recipe; 0 while idle.
    pub fn consumption_rate(&self) -> PowerRate {
        self.rate
    }

    #[must_use = "overflow count indicates items that did not fit"]
    pub fn insert_input(&mut self, item: ItemTypeId, count: u32) -> u32 {
        self.input_slot.insert(item, count, self.stack_limit)
    }

    #[must_use = "returns the stack actually removed"]
    pub fn take_input(&mut self, count: u32) -> Option<ItemStack> {
        self.input_slot.take(count)
    }

    #[must_use = "returns the stack actually removed"]
    pub fn take_output(&mut self, count: u32) -> Option<ItemStack> {
        self.output_slot.take(count)
    }

    /// The recipe this machine would run right now, or why it cannot run.
    pub fn runnable_recipe<'a>(
        &self,
        content: &'a ContentRegistry,
    ) -> Result<&'a RecipeDef, IdleReason> {
        let item = self.input_slot.item().ok_or(IdleReason::NoInput)?;
        let recipe = content
            .recipe_for(self.kind, item)
            .ok_or(IdleReason::UnusableInput)?;
        if recipe.duration == 0 || recipe.energy_cost.is_zero() {
            return Err(IdleReason::Faulted);
        }
        if !self
            .output_slot
            .has_room_for(recipe.output, recipe.output_count, self.stack_limit)
        {
            return Err(IdleReason::OutputBlocked);
        }
        Ok(recipe)
    }

    /// Energy this machine wants over `delta` ticks. Never more than what
    /// is left of the current cycle, so one tick completes at most one
    /// cycle.
    pub fn requested(&self, delta: Ticks, content: &ContentRegistry) -> EnergyAmount {
        match self.runnable_recipe(content) {
            Ok(recipe) => self.request_for(recipe, delta),
            Err(_) => EnergyAmount::ZERO,
        }
    }

    fn request_for(&self, recipe: &RecipeDef, delta: Ticks) -> EnergyAmount {
        let spent = if self.bound_input == Some(recipe.input) {
            self.cycle_energy
        } else {
            EnergyAmount::ZERO
        };
        let left = recipe.energy_cost.saturating_sub(spent);
        recipe.consumption_rate().over(delta).min(left)
    }

    /// Run for `delta` ticks with `available` energy. Returns the energy
    /// actually drawn, which never exceeds `available`.
    pub fn advance(
        &mut self,
        delta: Ticks,
        available: EnergyAmount,
        content: &ContentRegistry,
        policy: PartialPower,
    ) -> EnergyAmount {
        let recipe = match self.runnable_recipe(content) {
            Ok(recipe) => recipe,
            Err(reason) => {
                self.go_idle(reason);
                return EnergyAmount::ZERO;
            }
        };

        if self.bound_input != Some(recipe.input) {
            self.bound_input = Some(recipe.input);
            self.cycle_energy = EnergyAmount::ZERO;
            self.cycle_cost = recipe.energy_cost;
        }
        self.rate = recipe.consumption_rate();

        let request = self.request_for(recipe, delta);
        if request.is_zero() {
            return EnergyAmount::ZERO;
        }
        let drawn = match policy {
            PartialPower::Throttle => available.min(request),
            PartialPower::Stall if available >= request => request,
            PartialPower::Stall => EnergyAmount::ZERO,
        };
        if drawn.is_zero() {
            self.status = MachineStatus::Underpowered;
            return EnergyAmount::ZERO;
        }

        self.status = MachineStatus::Active;
        self.cycle_energy = self.cycle_energy + drawn;
        if self.cycle_energy >= self.cycle_cost {
            self.finish_cycle(recipe, content);
        }
        drawn
    }

    fn finish_cycle(&mut self, recipe: &RecipeDef, content: &ContentRegistry) {
        let _consumed = self.input_slot.take(1);
        let overflow = self
            .output_slot
            .insert(recipe.output, recipe.output_count, self.stack_limit);
        debug_assert_eq!(overflow, 0, "runnable check guarantees output room");
        debug!(
            position = %self.position,
            recipe = %recipe.name,
            "processing cycle complete"
        );

        self.bound_input = None;
        self.cycle_energy = EnergyAmount::ZERO;
        self.cycle_cost = EnergyAmount::ZERO;
        if let Err(reason) = self.runnable_recipe(content) {
            self.go_idle(reason);
        }
    }

    fn go_idle(&mut self, reason: IdleReason) {
        let next = MachineStatus::Idle(reason);
        if reason == IdleReason::Faulted && self.status != next {
            warn!(position = %self.position, "recipe has zero duration or cost");
        }
        self.status = next;
        self.rate = PowerRate::ZERO;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

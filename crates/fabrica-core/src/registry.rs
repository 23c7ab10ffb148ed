//! Immutable content registry: item types, fuels, processing recipes and
//! machine types.
//!
//! Built once through [`RegistryBuilder`] and then passed by reference into
//! every simulation tick. Lookups for unknown ids return `None`, which the
//! simulation treats as "not usable" rather than as an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;
use crate::id::*;
use crate::ledger::{EnergyAmount, PowerRate};

/// Block id of the standard fuel-burning generator.
pub const GENERATOR_BLOCK: &str = "Machine_Generator";
/// Block id of the standard battery.
pub const BATTERY_BLOCK: &str = "Machine_Battery";
/// Block id of the standard electric furnace.
pub const ELECTRIC_FURNACE_BLOCK: &str = "Machine_Electric_Furnace";
/// Block id of the standard macerator.
pub const MACERATOR_BLOCK: &str = "Machine_Macerator";

/// Energy a standard generator can hold in its internal buffer.
pub const DEFAULT_GENERATOR_BUFFER: u32 = 1_000;
/// Capacity of a standard battery.
pub const DEFAULT_BATTERY_CAPACITY: u32 = 100_000;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// An item type definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemTypeDef {
    pub name: String,
}

/// Burn characteristics of a fuel item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuelDef {
    pub item: ItemTypeId,
    /// Production rate while one unit of this fuel burns.
    pub energy_per_tick: PowerRate,
    /// Ticks one unit burns for.
    pub burn_duration: Ticks,
}

/// Which recipe set a processing machine draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingKind {
    ElectricFurnace,
    Macerator,
}

impl ProcessingKind {
    /// Human-readable machine name for display layers.
    pub fn display_name(self) -> &'static str {
        match self {
            ProcessingKind::ElectricFurnace => "Electric Furnace",
            ProcessingKind::Macerator => "Macerator",
        }
    }
}

/// A processing recipe: one input unit becomes `output_count` output units
/// after `energy_cost` has been spent over (at full power) `duration` ticks.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    pub kind: ProcessingKind,
    pub input: ItemTypeId,
    pub output: ItemTypeId,
    pub output_count: u32,
    pub energy_cost: EnergyAmount,
    pub duration: Ticks,
}

impl RecipeDef {
    /// Per-tick draw at full power.
    pub fn consumption_rate(&self) -> PowerRate {
        PowerRate::spread(self.energy_cost, self.duration)
    }
}

/// What a machine type is, with its per-type constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineClass {
    Generator {
        buffer: EnergyAmount,
    },
    Battery {
        capacity: EnergyAmount,
        transfer_limit: Option<PowerRate>,
    },
    Processor {
        kind: ProcessingKind,
    },
}

/// A machine type (block id) definition.
#[derive(Debug, Clone)]
pub struct MachineTypeDef {
    pub name: String,
    pub display_name: String,
    pub class: MachineClass,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`ContentRegistry`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    fuels: Vec<FuelDef>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    machines: Vec<MachineTypeDef>,
    machine_name_to_id: HashMap<String, MachineTypeId>,
    duplicate_names: Vec<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemTypeDef {
            name: name.to_string(),
        });
        if self.item_name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicate_names.push(name.to_string());
        }
        id
    }

    /// Phase 1: Declare `item` burnable.
    pub fn register_fuel(&mut self, item: ItemTypeId, energy_per_tick: PowerRate, burn_duration: Ticks) {
        self.fuels.push(FuelDef {
            item,
            energy_per_tick,
            burn_duration,
        });
    }

    /// Phase 1: Register a processing recipe. Returns its ID.
    #[allow(clippy::too_many_arguments)]
    pub fn register_recipe(
        &mut self,
        name: &str,
        kind: ProcessingKind,
        input: ItemTypeId,
        output: ItemTypeId,
        output_count: u32,
        energy_cost: EnergyAmount,
        duration: Ticks,
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            kind,
            input,
            output,
            output_count,
            energy_cost,
            duration,
        });
        if self.recipe_name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicate_names.push(name.to_string());
        }
        id
    }

    /// Phase 1: Register a machine type under its block id. Returns its ID.
    pub fn register_machine(&mut self, name: &str, display_name: &str, class: MachineClass) -> MachineTypeId {
        let id = MachineTypeId(self.machines.len() as u32);
        self.machines.push(MachineTypeDef {
            name: name.to_string(),
            display_name: display_name.to_string(),
            class,
        });
        if self.machine_name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicate_names.push(name.to_string());
        }
        id
    }

    /// Phase 1: Register the four standard machine blocks.
    pub fn register_standard_machines(&mut self) {
        self.register_machine(
            GENERATOR_BLOCK,
            "Generator",
            MachineClass::Generator {
                buffer: EnergyAmount::from_joules(DEFAULT_GENERATOR_BUFFER),
            },
        );
        self.register_machine(
            BATTERY_BLOCK,
            "Battery",
            MachineClass::Battery {
                capacity: EnergyAmount::from_joules(DEFAULT_BATTERY_CAPACITY),
                transfer_limit: None,
            },
        );
        for (block, kind) in [
            (ELECTRIC_FURNACE_BLOCK, ProcessingKind::ElectricFurnace),
            (MACERATOR_BLOCK, ProcessingKind::Macerator),
        ] {
            self.register_machine(block, kind.display_name(), MachineClass::Processor { kind });
        }
    }

    /// Phase 2: Mutate an existing recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut RecipeDef),
    {
        let id = self
            .recipe_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.recipes[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing machine type by block id.
    pub fn mutate_machine<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut MachineTypeDef),
    {
        let id = self
            .machine_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.machines[id.0 as usize]);
        Ok(())
    }

    /// Lookup item type ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Lookup recipe ID by name.
    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Lookup machine type ID by block id.
    pub fn machine_id(&self, name: &str) -> Option<MachineTypeId> {
        self.machine_name_to_id.get(name).copied()
    }

    /// Phase 3: Validate and freeze.
    pub fn build(self) -> Result<ContentRegistry, RegistryError> {
        if let Some(name) = self.duplicate_names.into_iter().next() {
            return Err(RegistryError::DuplicateName(name));
        }

        let item_count = self.items.len();
        let check_item = |item: ItemTypeId| {
            if item.0 as usize >= item_count {
                Err(RegistryError::InvalidItemRef(item))
            } else {
                Ok(())
            }
        };

        let mut fuels = HashMap::with_capacity(self.fuels.len());
        for fuel in self.fuels {
            check_item(fuel.item)?;
            if fuel.burn_duration == 0 {
                return Err(RegistryError::InvalidFuel {
                    item: fuel.item,
                    reason: "burn duration must be positive",
                });
            }
            if fuels.insert(fuel.item, fuel).is_some() {
                return Err(RegistryError::InvalidFuel {
                    item: fuel.item,
                    reason: "fuel registered twice",
                });
            }
        }

        let mut recipe_by_input = HashMap::with_capacity(self.recipes.len());
        for (idx, recipe) in self.recipes.iter().enumerate() {
            check_item(recipe.input)?;
            check_item(recipe.output)?;
            if recipe.duration == 0 {
                return Err(RegistryError::InvalidRecipe {
                    name: recipe.name.clone(),
                    reason: "duration must be positive",
                });
            }
            if recipe.energy_cost.is_zero() {
                return Err(RegistryError::InvalidRecipe {
                    name: recipe.name.clone(),
                    reason: "energy cost must be positive",
                });
            }
            if recipe.output_count == 0 {
                return Err(RegistryError::InvalidRecipe {
                    name: recipe.name.clone(),
                    reason: "output count must be positive",
                });
            }
            if recipe_by_input
                .insert((recipe.kind, recipe.input), RecipeId(idx as u32))
                .is_some()
            {
                return Err(RegistryError::InvalidRecipe {
                    name: recipe.name.clone(),
                    reason: "another recipe of this machine kind uses the same input",
                });
            }
        }

        tracing::debug!(
            items = self.items.len(),
            fuels = fuels.len(),
            recipes = self.recipes.len(),
            machines = self.machines.len(),
            "content registry built"
        );

        Ok(ContentRegistry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            fuels,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            recipe_by_input,
            machines: self.machines,
            machine_name_to_id: self.machine_name_to_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct ContentRegistry {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    fuels: HashMap<ItemTypeId, FuelDef>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    recipe_by_input: HashMap<(ProcessingKind, ItemTypeId), RecipeId>,
    machines: Vec<MachineTypeDef>,
    machine_name_to_id: HashMap<String, MachineTypeId>,
}

impl ContentRegistry {
    pub fn get_item(&self, id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.items.get(id.0 as usize)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get_machine(&self, id: MachineTypeId) -> Option<&MachineTypeDef> {
        self.machines.get(id.0 as usize)
    }

    /// Burn data for `item`, or `None` if it is not a fuel.
    pub fn fuel(&self, item: ItemTypeId) -> Option<&FuelDef> {
        self.fuels.get(&item)
    }

    /// The recipe a machine of `kind` runs on `input`, if any.
    pub fn recipe_for(&self, kind: ProcessingKind, input: ItemTypeId) -> Option<&RecipeDef> {
        self.recipe_by_input
            .get(&(kind, input))
            .and_then(|id| self.get_recipe(*id))
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineTypeId> {
        self.machine_name_to_id.get(name).copied()
    }

    /// Machine type definition by block id.
    pub fn machine_by_name(&self, name: &str) -> Option<&MachineTypeDef> {
        self.machine_id(name).and_then(|id| self.get_machine(id))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn fuel_count(&self) -> usize {
        self.fuels.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("invalid fuel {item:?}: {reason}")]
    InvalidFuel { item: ItemTypeId, reason: &'static str },
    #[error("invalid recipe '{name}': {reason}")]
    InvalidRecipe { name: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> RegistryBuilder {
        let mut b = RegistryBuilder::new();
        let coal = b.register_item("coal");
        let iron_ore = b.register_item("iron_ore");
        let iron_ingot = b.register_item("iron_ingot");
        let iron_dust = b.register_item("iron_dust");
        b.register_fuel(coal, PowerRate::per_tick(10), 80);
        b.register_recipe(
            "smelt_iron",
            ProcessingKind::ElectricFurnace,
            iron_ore,
            iron_ingot,
            1,
            EnergyAmount::from_joules(600),
            20,
        );
        b.register_recipe(
            "grind_iron",
            ProcessingKind::Macerator,
            iron_ore,
            iron_dust,
            2,
            EnergyAmount::from_joules(400),
            40,
        );
        b.register_standard_machines();
        b
    }

    #[test]
    fn register_and_build() {
        let reg = setup_builder().build().unwrap();
        assert_eq!(reg.item_count(), 4);
        assert_eq!(reg.fuel_count(), 1);
        assert_eq!(reg.recipe_count(), 2);
        assert_eq!(reg.machine_count(), 4);
    }

    #[test]
    fn fuel_lookup() {
        let reg = setup_builder().build().unwrap();
        let coal = reg.item_id("coal").unwrap();
        let fuel = reg.fuel(coal).unwrap();
        assert_eq!(fuel.energy_per_tick, PowerRate::per_tick(10));
        assert_eq!(fuel.burn_duration, 80);

        let ore = reg.item_id("iron_ore").unwrap();
        assert!(reg.fuel(ore).is_none(), "non-fuel items are not usable");
    }

    #[test]
    fn recipe_lookup_is_per_kind() {
        let reg = setup_builder().build().unwrap();
        let ore = reg.item_id("iron_ore").unwrap();
        let furnace = reg.recipe_for(ProcessingKind::ElectricFurnace, ore).unwrap();
        assert_eq!(furnace.name, "smelt_iron");
        assert_eq!(furnace.consumption_rate(), PowerRate::per_tick(30));

        let macerator = reg.recipe_for(ProcessingKind::Macerator, ore).unwrap();
        assert_eq!(macerator.output_count, 2);

        let coal = reg.item_id("coal").unwrap();
        assert!(reg.recipe_for(ProcessingKind::Macerator, coal).is_none());
    }

    #[test]
    fn standard_machines_resolve_by_block_id() {
        let reg = setup_builder().build().unwrap();
        let furnace = reg.machine_by_name(ELECTRIC_FURNACE_BLOCK).unwrap();
        assert_eq!(furnace.display_name, "Electric Furnace");
        assert_eq!(
            furnace.class,
            MachineClass::Processor {
                kind: ProcessingKind::ElectricFurnace
            }
        );
        assert!(matches!(
            reg.machine_by_name(BATTERY_BLOCK).unwrap().class,
            MachineClass::Battery { .. }
        ));
        assert!(reg.machine_by_name("Machine_Unknown").is_none());
    }

    #[test]
    fn mutate_recipe() {
        let mut builder = setup_builder();
        builder
            .mutate_recipe("smelt_iron", |r| r.duration = 10)
            .unwrap();
        let reg = builder.build().unwrap();
        let recipe = reg.get_recipe(reg.recipe_id("smelt_iron").unwrap()).unwrap();
        assert_eq!(recipe.duration, 10);
        assert_eq!(recipe.consumption_rate(), PowerRate::per_tick(60));
    }

    #[test]
    fn mutate_nonexistent_fails() {
        let mut builder = setup_builder();
        assert!(matches!(
            builder.mutate_recipe("nonexistent", |_| {}),
            Err(RegistryError::NotFound(_))
        ));
        assert!(builder.mutate_machine("nonexistent", |_| {}).is_err());
    }

    #[test]
    fn mutate_machine_changes_capacity() {
        let mut builder = setup_builder();
        builder
            .mutate_machine(BATTERY_BLOCK, |m| {
                m.class = MachineClass::Battery {
                    capacity: EnergyAmount::from_joules(100),
                    transfer_limit: Some(PowerRate::per_tick(5)),
                };
            })
            .unwrap();
        let reg = builder.build().unwrap();
        assert_eq!(
            reg.machine_by_name(BATTERY_BLOCK).unwrap().class,
            MachineClass::Battery {
                capacity: EnergyAmount::from_joules(100),
                transfer_limit: Some(PowerRate::per_tick(5)),
            }
        );
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_item_ref_in_fuel_fails() {
        let mut b = RegistryBuilder::new();
        b.register_fuel(ItemTypeId(999), PowerRate::per_tick(1), 10);
        match b.build() {
            Err(RegistryError::InvalidItemRef(id)) => assert_eq!(id, ItemTypeId(999)),
            other => panic!("expected InvalidItemRef, got: {other:?}"),
        }
    }

    #[test]
    fn zero_burn_duration_fails() {
        let mut b = RegistryBuilder::new();
        let wood = b.register_item("wood");
        b.register_fuel(wood, PowerRate::per_tick(1), 0);
        assert!(matches!(b.build(), Err(RegistryError::InvalidFuel { .. })));
    }

    #[test]
    fn zero_recipe_duration_fails() {
        let mut builder = setup_builder();
        builder.mutate_recipe("smelt_iron", |r| r.duration = 0).unwrap();
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("smelt_iron"), "got: {err}");
    }

    #[test]
    fn conflicting_recipe_inputs_fail() {
        let mut b = setup_builder();
        let ore = b.item_id("iron_ore").unwrap();
        let coal = b.item_id("coal").unwrap();
        b.register_recipe(
            "smelt_again",
            ProcessingKind::ElectricFurnace,
            ore,
            coal,
            1,
            EnergyAmount::from_joules(1),
            1,
        );
        assert!(matches!(b.build(), Err(RegistryError::InvalidRecipe { .. })));
    }

    #[test]
    fn duplicate_names_fail() {
        let mut b = RegistryBuilder::new();
        b.register_item("coal");
        b.register_item("coal");
        match b.build() {
            Err(RegistryError::DuplicateName(name)) => assert_eq!(name, "coal"),
            other => panic!("expected DuplicateName, got: {other:?}"),
        }
    }

    #[test]
    fn registry_get_nonexistent_returns_none() {
        let reg = setup_builder().build().unwrap();
        assert!(reg.get_item(ItemTypeId(999)).is_none());
        assert!(reg.get_recipe(RecipeId(999)).is_none());
        assert!(reg.get_machine(MachineTypeId(999)).is_none());
        assert!(reg.fuel(ItemTypeId(999)).is_none());
    }

    #[test]
    fn empty_registry_builds_successfully() {
        let reg = RegistryBuilder::new().build().unwrap();
        assert_eq!(reg.item_count(), 0);
        assert_eq!(reg.machine_count(), 0);
    }
}

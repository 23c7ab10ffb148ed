//! Data-driven content loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`RegistryBuilder`] for content (items, fuels, recipes, machine types)
//! defined in data files. The serde structs are public so that file-based
//! loaders in other crates can reuse [`build_content`].

use crate::ledger::{EnergyAmount, PowerRate};
use crate::registry::{
    BATTERY_BLOCK, ELECTRIC_FURNACE_BLOCK, GENERATOR_BLOCK, MACERATOR_BLOCK, MachineClass,
    ProcessingKind, RegistryBuilder, RegistryError,
};

const STANDARD_BLOCKS: [&str; 4] = [
    GENERATOR_BLOCK,
    BATTERY_BLOCK,
    ELECTRIC_FURNACE_BLOCK,
    MACERATOR_BLOCK,
];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("unknown item reference: {0}")]
    UnknownItemRef(String),
    #[error("invalid value for {field}: {value}")]
    InvalidNumber { field: &'static str, value: f64 },
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Top-level content document.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ContentData {
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub fuels: Vec<FuelData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
    #[serde(default)]
    pub machines: Vec<MachineData>,
    /// Also register the four standard machine blocks. Entries in
    /// `machines` that name a standard block then retune it.
    #[serde(default)]
    pub standard_machines: bool,
}

/// An item type.
#[derive(Debug, serde::Deserialize)]
pub struct ItemData {
    pub name: String,
}

/// A fuel entry; `item` references an item by name.
#[derive(Debug, serde::Deserialize)]
pub struct FuelData {
    pub item: String,
    pub energy_per_tick: f64,
    pub burn_duration: u64,
}

/// A processing recipe; `input` and `output` reference items by name.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub kind: ProcessingKind,
    pub input: String,
    pub output: String,
    #[serde(default = "default_output_count")]
    pub output_count: u32,
    pub energy_cost: f64,
    pub duration: u64,
}

fn default_output_count() -> u32 {
    1
}

/// A machine type keyed by its block id.
#[derive(Debug, serde::Deserialize)]
pub struct MachineData {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub class: MachineClassData,
}

/// Machine class with plain-number constants.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineClassData {
    Generator {
        buffer: f64,
    },
    Battery {
        capacity: f64,
        #[serde(default)]
        transfer_limit: Option<f64>,
    },
    Processor {
        kind: ProcessingKind,
    },
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load content from a JSON string.
pub fn load_content_json(json: &str) -> Result<RegistryBuilder, DataLoadError> {
    let data: ContentData = serde_json::from_str(json)?;
    build_content(data)
}

/// Load content from JSON bytes.
pub fn load_content_json_bytes(bytes: &[u8]) -> Result<RegistryBuilder, DataLoadError> {
    let data: ContentData = serde_json::from_slice(bytes)?;
    build_content(data)
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, DataLoadError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DataLoadError::InvalidNumber { field, value })
    }
}

fn parse_class(class: &MachineClassData) -> Result<MachineClass, DataLoadError> {
    Ok(match class {
        MachineClassData::Generator { buffer } => MachineClass::Generator {
            buffer: EnergyAmount::from_f64(non_negative("buffer", *buffer)?),
        },
        MachineClassData::Battery {
            capacity,
            transfer_limit,
        } => MachineClass::Battery {
            capacity: EnergyAmount::from_f64(non_negative("capacity", *capacity)?),
            transfer_limit: transfer_limit
                .map(|l| non_negative("transfer_limit", l).map(PowerRate::from_f64))
                .transpose()?,
        },
        MachineClassData::Processor { kind } => MachineClass::Processor { kind: *kind },
    })
}

/// Resolve names and register everything in `data`, in dependency order.
pub fn build_content(data: ContentData) -> Result<RegistryBuilder, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    // Phase 1: Register all items
    for item in &data.items {
        builder.register_item(&item.name);
    }

    let resolve = |builder: &RegistryBuilder, name: &str| {
        builder
            .item_id(name)
            .ok_or_else(|| DataLoadError::UnknownItemRef(name.to_string()))
    };

    // Phase 2: Fuels and recipes (resolve item refs by name)
    for fuel in &data.fuels {
        let item = resolve(&builder, &fuel.item)?;
        let rate = PowerRate::from_f64(non_negative("energy_per_tick", fuel.energy_per_tick)?);
        builder.register_fuel(item, rate, fuel.burn_duration);
    }

    for recipe in &data.recipes {
        let input = resolve(&builder, &recipe.input)?;
        let output = resolve(&builder, &recipe.output)?;
        let cost = EnergyAmount::from_f64(non_negative("energy_cost", recipe.energy_cost)?);
        builder.register_recipe(
            &recipe.name,
            recipe.kind,
            input,
            output,
            recipe.output_count,
            cost,
            recipe.duration,
        );
    }

    // Phase 3: Machine types
    if data.standard_machines {
        builder.register_standard_machines();
    }
    for machine in &data.machines {
        let class = parse_class(&machine.class)?;
        let display = machine.display_name.as_deref();
        if data.standard_machines && STANDARD_BLOCKS.contains(&machine.name.as_str()) {
            // Retune a standard block in place.
            builder.mutate_machine(&machine.name, |def| {
                def.class = class;
                if let Some(display) = display {
                    def.display_name = display.to_string();
                }
            })?;
        } else {
            builder.register_machine(&machine.name, display.unwrap_or(&machine.name), class);
        }
    }

    Ok(builder)
}

// ===========================================================================
// Tests
// ===========================================================================

//! Resolution pipeline: reads data files, checks cross-references, builds
//! the content registry and power config.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_game_data`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fabrica_core::data_loader::{self, ContentData, FuelData, ItemData, MachineData, RecipeData, build_content};
use fabrica_core::registry::{ContentRegistry, RegistryError};
use fabrica_power::PowerConfig;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// Content values were rejected while building.
    #[error(transparent)]
    Content(#[from] data_loader::DataLoadError),

    /// The registry rejected the assembled content.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// several formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML has no top-level arrays, so for
/// TOML files the array is read from `toml_key` of the top-level table.
/// RON and JSON files hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Return a `DuplicateName` error if `name` is already in the map.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug)]
pub struct GameData {
    pub registry: ContentRegistry,
    pub power: PowerConfig,
}

fn load_optional_list<T: DeserializeOwned>(
    dir: &Path,
    base_name: &str,
) -> Result<(Vec<T>, Option<PathBuf>), DataLoadError> {
    match find_data_file(dir, base_name)? {
        Some(path) => {
            debug!(file = %path.display(), "loading data file");
            Ok((deserialize_list(&path, base_name)?, Some(path)))
        }
        None => Ok((Vec::new(), None)),
    }
}

/// Load content and power config from `dir`.
///
/// Item names are checked for duplicates and every item reference in the
/// fuel and recipe files is resolved before anything is registered, so
/// errors name the file they come from.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let items_path = require_data_file(dir, "items")?;
    debug!(file = %items_path.display(), "loading data file");
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;

    let mut item_names: HashMap<String, usize> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        check_duplicate(&item_names, &item.name, &items_path)?;
        item_names.insert(item.name.clone(), index);
    }

    let (fuels, fuels_path): (Vec<FuelData>, _) = load_optional_list(dir, "fuels")?;
    if let Some(path) = &fuels_path {
        for fuel in &fuels {
            resolve_name(&item_names, &fuel.item, path, "item")?;
        }
    }

    let (recipes, recipes_path): (Vec<RecipeData>, _) = load_optional_list(dir, "recipes")?;
    if let Some(path) = &recipes_path {
        let mut recipe_names: HashMap<String, ()> = HashMap::new();
        for recipe in &recipes {
            check_duplicate(&recipe_names, &recipe.name, path)?;
            recipe_names.insert(recipe.name.clone(), ());
            resolve_name(&item_names, &recipe.input, path, "item")?;
            resolve_name(&item_names, &recipe.output, path, "item")?;
        }
    }

    let (machines, _): (Vec<MachineData>, _) = load_optional_list(dir, "machines")?;

    let power = match find_data_file(dir, "power")? {
        Some(path) => {
            debug!(file = %path.display(), "loading power config");
            deserialize_file(&path)?
        }
        None => PowerConfig::default(),
    };

    let content = ContentData {
        items,
        fuels,
        recipes,
        machines,
        standard_machines: true,
    };
    let registry = build_content(content)?.build()?;

    info!(
        dir = %dir.display(),
        items = registry.item_count(),
        fuels = registry.fuel_count(),
        recipes = registry.recipe_count(),
        machines = registry.machine_count(),
        "game data loaded"
    );
    Ok(GameData { registry, power })
}

// ===========================================================================
// Tests
// ===========================================================================

//! File-based content and power configuration loading.
//!
//! A data directory holds one file per section, in RON, TOML or JSON:
//!
//! | base name  | contents                          | required |
//! |------------|-----------------------------------|----------|
//! | `items`    | item types                        | yes      |
//! | `fuels`    | fuel items with rate and duration | no       |
//! | `recipes`  | processing recipes                | no       |
//! | `machines` | custom or retuned machine types   | no       |
//! | `power`    | [`PowerConfig`] overrides         | no       |
//!
//! The four standard machine blocks are always registered.
//!
//! [`PowerConfig`]: fabrica_power::PowerConfig

pub mod loader;

pub use loader::{DataLoadError, GameData, load_game_data};

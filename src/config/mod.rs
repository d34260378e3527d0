// src/config/mod.rs

//! Optional `Stepwatch.toml` settings: watch timing, exclusions and fuzzy
//! matching thresholds.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DEFAULT_SETTINGS_FILE, load_and_validate, load_from_path, load_or_default, load_settings,
};
pub use model::{RawSettingsFile, Settings, WatchSection};
pub use validate::validate_settings;

// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{RawSettingsFile, Settings};
use crate::errors::Result;

pub const DEFAULT_SETTINGS_FILE: &str = "Stepwatch.toml";

/// Read and deserialize a settings file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettingsFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawSettingsFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Read, deserialize and validate a settings file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    Settings::try_from(raw)
}

/// Settings for a run: an explicitly named file must exist, while the
/// default [`DEFAULT_SETTINGS_FILE`] may be absent.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => load_or_default(DEFAULT_SETTINGS_FILE),
    }
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(Settings::default());
    }
    load_and_validate(path)
}

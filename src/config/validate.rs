// src/config/validate.rs

use crate::config::model::{RawSettingsFile, Settings};
use crate::errors::{Result, StepwatchError};
use crate::watch::patterns::compile_glob;

impl TryFrom<RawSettingsFile> for Settings {
    type Error = StepwatchError;

    fn try_from(raw: RawSettingsFile) -> std::result::Result<Self, Self::Error> {
        validate_settings(&raw)?;
        Ok(Settings::new_unchecked(raw.watch, raw.filter))
    }
}

/// Check the invariants `Settings` relies on.
pub fn validate_settings(raw: &RawSettingsFile) -> Result<()> {
    validate_watch(raw)?;
    validate_filter(raw)?;
    Ok(())
}

fn validate_watch(raw: &RawSettingsFile) -> Result<()> {
    let watch = &raw.watch;
    if watch.debounce_ms == 0 {
        return Err(config_error("[watch].debounce_ms must be >= 1 (got 0)"));
    }
    if watch.shutdown_timeout_secs == 0 {
        return Err(config_error(
            "[watch].shutdown_timeout_secs must be >= 1 (got 0)",
        ));
    }
    for pattern in &watch.exclude {
        compile_glob(pattern).map_err(|e| {
            StepwatchError::ConfigError(format!("[watch].exclude: {e:#}"))
        })?;
    }
    Ok(())
}

fn validate_filter(raw: &RawSettingsFile) -> Result<()> {
    let filter = &raw.filter;
    if filter.max_suggestions == 0 {
        return Err(config_error("[filter].max_suggestions must be >= 1 (got 0)"));
    }
    if filter.suggestion_threshold < filter.match_threshold {
        return Err(StepwatchError::ConfigError(format!(
            "[filter].suggestion_threshold ({}) must be >= match_threshold ({})",
            filter.suggestion_threshold, filter.match_threshold
        )));
    }
    Ok(())
}

fn config_error(msg: &str) -> StepwatchError {
    StepwatchError::ConfigError(msg.to_string())
}

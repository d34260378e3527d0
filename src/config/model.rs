// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::filter::FuzzyMatchConfig;

/// Settings file as read from TOML, before validation.
///
/// ```toml
/// [watch]
/// debounce_ms = 500
/// shutdown_timeout_secs = 30
/// exclude = ["docs/**"]
/// use_default_excludes = true
///
/// [filter]
/// match_threshold = 2
/// suggestion_threshold = 5
/// max_suggestions = 3
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettingsFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub filter: FuzzyMatchConfig,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Quiet period before a burst of changes triggers a run.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long shutdown waits for a running execution before cancelling it.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Extra exclusion globs, relative to the workspace.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether VCS, build-output and dependency directories are ignored.
    #[serde(default = "default_true")]
    pub use_default_excludes: bool,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            exclude: Vec::new(),
            use_default_excludes: true,
        }
    }
}

impl WatchSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Validated settings. Only obtainable through `TryFrom<RawSettingsFile>`
/// or [`Settings::default`].
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub watch: WatchSection,
    pub filter: FuzzyMatchConfig,
}

impl Settings {
    pub(crate) fn new_unchecked(watch: WatchSection, filter: FuzzyMatchConfig) -> Self {
        Self { watch, filter }
    }
}

// src/watch/mod.rs

//! File watching and change coalescing.
//!
//! Turns raw OS notifications into root-relative [`FileChangeEvent`]s,
//! drops excluded paths, and debounces bursts into batches. It knows nothing
//! about pipelines or execution; the engine decides what a batch triggers.
//!
//! [`FileChangeEvent`]: crate::types::FileChangeEvent

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::{DebounceEngine, DEFAULT_DEBOUNCE};
pub use patterns::{DEFAULT_EXCLUDED_DIRS, ExclusionSet, default_exclude_patterns};
pub use watcher::{ChangeSource, FileWatcher, WatcherHandle, WatcherMessage, change_type_of};

// src/engine/mod.rs

//! Watch-triggered execution scheduling.
//!
//! - [`queue`]: single-flight execution with one replaceable pending slot.
//! - [`state`]: the pure watch-mode state machine.
//! - [`service`]: the async shell wiring watcher, debouncer and queue
//!   together and publishing [`WatchEvent`]s.
//! - [`stats`]: per-session run statistics.

pub mod queue;
pub mod service;
pub mod state;
pub mod stats;

pub use queue::{
    EnqueueOutcome, ExecutionCallback, ExecutionFuture, ExecutionOutcome, ExecutionQueue,
    QueueEvent, execution_callback,
};
pub use service::{DEFAULT_SHUTDOWN_TIMEOUT, WatchEvent, WatchModeService, WatchOptions};
pub use state::{StateSignal, Transition, WatchModeState, WatchStateMachine};
pub use stats::WatchModeStatistics;

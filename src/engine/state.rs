// src/engine/state.rs

//! Pure watch-mode state machine.
//!
//! Consumes [`StateSignal`]s produced by the service loop and reports the
//! resulting transition, if any. No channels, no Tokio, no IO, so every
//! transition can be unit tested directly.

use std::fmt;

/// Externally visible state of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchModeState {
    /// Idle after a successful run, waiting for changes.
    Watching,
    /// Changes are accumulating in the debounce window.
    Debouncing,
    /// A run is in flight.
    Executing,
    /// A run is in flight and another one is waiting behind it.
    Queued,
    /// Idle after a failed run; still watching.
    Failed,
    /// Terminal.
    ShuttingDown,
}

impl fmt::Display for WatchModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchModeState::Watching => "watching",
            WatchModeState::Debouncing => "debouncing",
            WatchModeState::Executing => "executing",
            WatchModeState::Queued => "queued",
            WatchModeState::Failed => "failed",
            WatchModeState::ShuttingDown => "shutting down",
        };
        f.write_str(s)
    }
}

/// Lower-layer occurrences that may move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSignal {
    /// The watcher delivered a change.
    ChangeDetected,
    /// A debounced batch was parked behind the running execution.
    BatchQueued,
    /// The queue started a run.
    ExecutionStarted,
    /// The queue finished a run. `promoted` is true when a pending run is
    /// about to start in its place.
    ExecutionFinished { success: bool, promoted: bool },
    /// Cancellation was requested.
    ShutdownRequested,
}

/// A state change, reported as `(from, to)`.
pub type Transition = (WatchModeState, WatchModeState);

#[derive(Debug, Clone)]
pub struct WatchStateMachine {
    current: WatchModeState,
}

impl Default for WatchStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchStateMachine {
    /// Starts in `Executing`: every session begins with the initial run, and
    /// `Watching` is first entered when that run completes successfully.
    pub fn new() -> Self {
        Self {
            current: WatchModeState::Executing,
        }
    }

    pub fn current(&self) -> WatchModeState {
        self.current
    }

    /// Apply a signal and return the transition it caused, if any.
    pub fn apply(&mut self, signal: StateSignal) -> Option<Transition> {
        use WatchModeState::*;

        let from = self.current;
        let to = match (from, signal) {
            (ShuttingDown, _) => return None,
            (_, StateSignal::ShutdownRequested) => ShuttingDown,

            (Watching | Failed, StateSignal::ChangeDetected) => Debouncing,
            (_, StateSignal::ChangeDetected) => from,

            (Executing | Queued, StateSignal::BatchQueued) => Queued,
            (_, StateSignal::BatchQueued) => from,

            (_, StateSignal::ExecutionStarted) => Executing,

            (_, StateSignal::ExecutionFinished { promoted: true, .. }) => from,
            // Changes that arrived mid-run already started a new debounce
            // window; stay there instead of reporting idle.
            (Debouncing, StateSignal::ExecutionFinished { .. }) => Debouncing,
            (_, StateSignal::ExecutionFinished { success: true, .. }) => Watching,
            (_, StateSignal::ExecutionFinished { success: false, .. }) => Failed,
        };

        if to == from {
            None
        } else {
            self.current = to;
            Some((from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WatchModeState::*;

    fn finished(success: bool, promoted: bool) -> StateSignal {
        StateSignal::ExecutionFinished { success, promoted }
    }

    #[test]
    fn initial_run_settles_into_watching_or_failed() {
        let mut sm = WatchStateMachine::new();
        assert_eq!(sm.current(), Executing);
        assert_eq!(sm.apply(finished(true, false)), Some((Executing, Watching)));

        let mut sm = WatchStateMachine::new();
        assert_eq!(sm.apply(finished(false, false)), Some((Executing, Failed)));
    }

    #[test]
    fn change_cycle_from_watching() {
        let mut sm = WatchStateMachine::new();
        sm.apply(finished(true, false));

        assert_eq!(sm.apply(StateSignal::ChangeDetected), Some((Watching, Debouncing)));
        assert_eq!(sm.apply(StateSignal::ChangeDetected), None);
        assert_eq!(sm.apply(StateSignal::ExecutionStarted), Some((Debouncing, Executing)));
        assert_eq!(sm.apply(StateSignal::ChangeDetected), None);
        assert_eq!(sm.apply(StateSignal::BatchQueued), Some((Executing, Queued)));
        assert_eq!(sm.apply(finished(false, true)), None);
        assert_eq!(sm.apply(StateSignal::ExecutionStarted), Some((Queued, Executing)));
        assert_eq!(sm.apply(finished(false, false)), Some((Executing, Failed)));
        assert_eq!(sm.apply(StateSignal::ChangeDetected), Some((Failed, Debouncing)));
    }

    #[test]
    fn shutting_down_is_terminal() {
        let mut sm = WatchStateMachine::new();
        assert_eq!(
            sm.apply(StateSignal::ShutdownRequested),
            Some((Executing, ShuttingDown))
        );
        assert_eq!(sm.apply(finished(true, false)), None);
        assert_eq!(sm.apply(StateSignal::ChangeDetected), None);
        assert_eq!(sm.current(), ShuttingDown);
    }
}

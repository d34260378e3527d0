// src/watch/debounce.rs

//! Trailing-edge debouncing of file change events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::FileChangeEvent;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Coalesces bursts of change events into batches.
///
/// Every queued change restarts a single timer; a batch is emitted only after
/// `delay` passes with no new arrivals. Within a batch, changes are
/// deduplicated by full path and the most recent change for a path wins.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug)]
pub struct DebounceEngine {
    delay: Duration,
    state: Arc<Mutex<DebounceState>>,
    tx: mpsc::UnboundedSender<Vec<FileChangeEvent>>,
}

#[derive(Debug, Default)]
struct DebounceState {
    pending: Vec<FileChangeEvent>,
    /// Bumped on every arrival; a timer only flushes if its generation is
    /// still current when it fires.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<DebounceState>) -> MutexGuard<'_, DebounceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DebounceEngine {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Vec<FileChangeEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            delay,
            state: Arc::new(Mutex::new(DebounceState::default())),
            tx,
        };
        (engine, rx)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Add a change to the current window and restart the quiet-period timer.
    pub fn queue_change(&self, change: FileChangeEvent) {
        let mut st = lock(&self.state);

        match st
            .pending
            .iter_mut()
            .find(|p| p.full_path == change.full_path)
        {
            Some(existing) => *existing = change,
            None => st.pending.push(change),
        }

        st.generation += 1;
        let generation = st.generation;
        if let Some(previous) = st.timer.take() {
            previous.abort();
        }

        let state = Arc::clone(&self.state);
        let tx = self.tx.clone();
        let delay = self.delay;
        st.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let batch = {
                let mut st = lock(&state);
                if st.generation != generation {
                    return;
                }
                st.timer = None;
                std::mem::take(&mut st.pending)
            };

            if !batch.is_empty() {
                debug!(count = batch.len(), "debounce window closed");
                let _ = tx.send(batch);
            }
        }));
    }

    /// Number of distinct paths waiting in the current window.
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Drop the current window without emitting it.
    pub fn cancel(&self) {
        let mut st = lock(&self.state);
        st.generation += 1;
        st.pending.clear();
        if let Some(timer) = st.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for DebounceEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

// src/engine/service.rs

//! Watch-mode orchestration: watcher → debouncer → queue, with the state
//! machine and statistics layered on top.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, StepwatchError};
use crate::types::FileChangeEvent;
use crate::watch::{
    ChangeSource, DEFAULT_DEBOUNCE, DebounceEngine, ExclusionSet, FileWatcher, WatcherMessage,
};

use super::queue::{EnqueueOutcome, ExecutionCallback, ExecutionOutcome, ExecutionQueue, QueueEvent};
use super::state::{StateSignal, WatchModeState, WatchStateMachine};
use super::stats::WatchModeStatistics;

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

const EVENT_CAPACITY: usize = 256;

/// Settings for one watch session.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    pub debounce: Duration,
    /// Extra exclusion globs, relative to `root`.
    pub exclude: Vec<String>,
    pub use_default_excludes: bool,
    pub shutdown_timeout: Duration,
}

impl WatchOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
            exclude: Vec::new(),
            use_default_excludes: true,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Notifications for a host UI.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    StateChanged {
        from: WatchModeState,
        to: WatchModeState,
    },
    ChangesDetected {
        changes: Vec<FileChangeEvent>,
    },
    ExecutionStarting {
        run_number: u64,
        changes: Vec<FileChangeEvent>,
    },
    ExecutionCompleted {
        outcome: ExecutionOutcome,
    },
    WatcherError {
        message: String,
        restarting: bool,
    },
}

/// Long-running watch session.
///
/// Runs the execution once up front, then re-runs it whenever debounced
/// changes arrive, until cancelled.
#[derive(Debug)]
pub struct WatchModeService {
    options: WatchOptions,
    machine: Mutex<WatchStateMachine>,
    stats: Mutex<WatchModeStatistics>,
    events: broadcast::Sender<WatchEvent>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WatchModeService {
    pub fn new(options: WatchOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            options,
            machine: Mutex::new(WatchStateMachine::new()),
            stats: Mutex::new(WatchModeStatistics::default()),
            events,
        }
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> WatchModeState {
        lock(&self.machine).current()
    }

    pub fn statistics(&self) -> WatchModeStatistics {
        lock(&self.stats).clone()
    }

    /// Watch `options.root` on the real filesystem.
    pub async fn run(&self, execution: ExecutionCallback, cancel: CancellationToken) -> Result<()> {
        let exclusions = ExclusionSet::new(&self.options.exclude, self.options.use_default_excludes)?;
        let watcher = FileWatcher::new(&self.options.root, exclusions);
        self.run_with_source(execution, watcher, cancel).await
    }

    /// Run the session against an arbitrary change source.
    ///
    /// Returns `Ok(())` once `cancel` fires and the queue has drained, or an
    /// error if the source fails twice in a row.
    pub async fn run_with_source<S: ChangeSource>(
        &self,
        execution: ExecutionCallback,
        mut source: S,
        cancel: CancellationToken,
    ) -> Result<()> {
        let (queue, mut queue_rx) = ExecutionQueue::new();
        let (debouncer, mut batch_rx) = DebounceEngine::new(self.options.debounce);

        info!(root = %self.options.root.display(), "starting initial execution");
        queue.enqueue(Vec::new(), Arc::clone(&execution));

        let mut initial_done = false;
        while !initial_done {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.shutdown(&queue, &debouncer, &mut queue_rx).await;
                    return Ok(());
                }
                Some(event) = queue_rx.recv() => {
                    initial_done = matches!(event, QueueEvent::Completed { .. });
                    self.on_queue_event(event, &debouncer);
                }
            }
        }

        let mut consecutive_failures = 0u32;
        let (mut guard, mut watch_rx) =
            match self.start_source(&mut source, &mut consecutive_failures, None) {
                Ok((guard, rx)) => (Some(guard), rx),
                Err(err) => {
                    self.stop_queue(&queue, &debouncer, &mut queue_rx).await;
                    return Err(err);
                }
            };

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                Some(msg) = watch_rx.recv() => match msg {
                    WatcherMessage::Change(change) => {
                        consecutive_failures = 0;
                        self.apply(StateSignal::ChangeDetected);
                        debouncer.queue_change(change);
                    }
                    WatcherMessage::Error(message) => {
                        drop(guard.take());
                        // Replacing the receiver discards whatever the failed
                        // instance queued after this error.
                        match self.start_source(&mut source, &mut consecutive_failures, Some(message)) {
                            Ok((g, rx)) => {
                                guard = Some(g);
                                watch_rx = rx;
                            }
                            Err(err) => break Err(err),
                        }
                    }
                },
                Some(batch) = batch_rx.recv() => self.on_batch(&queue, batch, &execution),
                Some(event) = queue_rx.recv() => self.on_queue_event(event, &debouncer),
            }
        };

        drop(guard);
        match result {
            Ok(()) => self.shutdown(&queue, &debouncer, &mut queue_rx).await,
            Err(_) => self.stop_queue(&queue, &debouncer, &mut queue_rx).await,
        }
        result
    }

    /// (Re)start the change source on a fresh channel. The first failure in
    /// a row is retried once; the second is returned.
    fn start_source<S: ChangeSource>(
        &self,
        source: &mut S,
        consecutive_failures: &mut u32,
        mut failure: Option<String>,
    ) -> Result<(S::Guard, mpsc::UnboundedReceiver<WatcherMessage>)> {
        loop {
            if let Some(message) = failure.take() {
                *consecutive_failures += 1;
                let restarting = *consecutive_failures < 2;
                if restarting {
                    warn!(%message, "file watcher failed; restarting");
                } else {
                    error!(%message, "file watcher failed again; giving up");
                }
                self.emit(WatchEvent::WatcherError {
                    message: message.clone(),
                    restarting,
                });
                if !restarting {
                    return Err(StepwatchError::Other(anyhow::anyhow!(
                        "file watcher failed: {message}"
                    )));
                }
            }

            let (tx, rx) = mpsc::unbounded_channel();
            match source.start(tx) {
                Ok(guard) => return Ok((guard, rx)),
                Err(err) => failure = Some(err.to_string()),
            }
        }
    }

    fn on_batch(&self, queue: &ExecutionQueue, batch: Vec<FileChangeEvent>, execution: &ExecutionCallback) {
        info!(count = batch.len(), "changes detected");
        lock(&self.stats).record_changes(batch.len());
        self.emit(WatchEvent::ChangesDetected {
            changes: batch.clone(),
        });

        match queue.enqueue(batch, Arc::clone(execution)) {
            EnqueueOutcome::Started(run_number) => debug!(run_number, "execution scheduled"),
            EnqueueOutcome::Queued | EnqueueOutcome::Replaced => {
                self.apply(StateSignal::BatchQueued);
            }
            EnqueueOutcome::Rejected => debug!("queue closed; batch dropped"),
        }
    }

    fn on_queue_event(&self, event: QueueEvent, debouncer: &DebounceEngine) {
        match event {
            QueueEvent::Starting { run_number, changes } => {
                self.apply(StateSignal::ExecutionStarted);
                self.emit(WatchEvent::ExecutionStarting {
                    run_number,
                    changes,
                });
            }
            QueueEvent::Completed { outcome, promoted } => {
                lock(&self.stats).record_run(&outcome);
                self.apply(StateSignal::ExecutionFinished {
                    success: outcome.success,
                    promoted,
                });
                self.emit(WatchEvent::ExecutionCompleted { outcome });
                // Changes observed mid-run are still sitting in the window.
                if !promoted && debouncer.pending_count() > 0 {
                    self.apply(StateSignal::ChangeDetected);
                }
            }
        }
    }

    /// Cancellation path: enter `ShuttingDown` and drain gracefully.
    async fn shutdown(
        &self,
        queue: &ExecutionQueue,
        debouncer: &DebounceEngine,
        queue_rx: &mut mpsc::UnboundedReceiver<QueueEvent>,
    ) {
        info!("watch mode shutting down");
        self.apply(StateSignal::ShutdownRequested);
        self.stop_queue(queue, debouncer, queue_rx).await;
    }

    async fn stop_queue(
        &self,
        queue: &ExecutionQueue,
        debouncer: &DebounceEngine,
        queue_rx: &mut mpsc::UnboundedReceiver<QueueEvent>,
    ) {
        debouncer.cancel();
        if !queue.shutdown(self.options.shutdown_timeout).await {
            warn!("running execution was cancelled during shutdown");
        }
        while let Ok(event) = queue_rx.try_recv() {
            self.on_queue_event(event, debouncer);
        }
    }

    fn apply(&self, signal: StateSignal) {
        let transition = lock(&self.machine).apply(signal);
        if let Some((from, to)) = transition {
            info!(%from, %to, "watch state changed");
            self.emit(WatchEvent::StateChanged { from, to });
        }
    }

    fn emit(&self, event: WatchEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// src/engine/queue.rs

//! Single-flight execution queue.
//!
//! At most one execution runs at a time and at most one waits behind it.
//! A request that arrives while another is already waiting replaces it; the
//! older request and its triggering changes are dropped, not merged.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::types::FileChangeEvent;

/// Future returned by an execution callback. `Ok(false)` and `Err(_)` both
/// mark the run as failed.
pub type ExecutionFuture = Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send>>;

/// Host-supplied execution. The token is cancelled when the run should stop.
pub type ExecutionCallback = Arc<dyn Fn(CancellationToken) -> ExecutionFuture + Send + Sync>;

/// Wrap an async closure as an [`ExecutionCallback`].
pub fn execution_callback<F, Fut>(f: F) -> ExecutionCallback
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(move |token| Box::pin(f(token)) as ExecutionFuture)
}

/// What happened to an enqueued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The queue was idle; the request started with this run number.
    Started(u64),
    /// The request now waits behind the running execution.
    Queued,
    /// The request replaced an older pending one.
    Replaced,
    /// The queue is shutting down.
    Rejected,
}

/// Result of one run as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub run_number: u64,
    pub success: bool,
    pub cancelled: bool,
    /// Failure description; `None` on success.
    pub message: Option<String>,
    pub duration: Duration,
    /// Number of changes that triggered the run (0 for the initial run).
    pub trigger_count: usize,
}

/// Lifecycle notifications emitted by the queue, in order.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Starting {
        run_number: u64,
        changes: Vec<FileChangeEvent>,
    },
    Completed {
        outcome: ExecutionOutcome,
        /// A pending request was promoted and is about to start.
        promoted: bool,
    },
}

struct PendingExecution {
    changes: Vec<FileChangeEvent>,
    callback: ExecutionCallback,
}

struct ScheduledRun {
    run_number: u64,
    token: CancellationToken,
    changes: Vec<FileChangeEvent>,
    callback: ExecutionCallback,
}

struct QueueState {
    running: Option<(u64, CancellationToken)>,
    pending: Option<PendingExecution>,
    last_run_number: u64,
    accepting: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    events: mpsc::UnboundedSender<QueueEvent>,
    idle: watch::Sender<bool>,
    root: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the next run number. Caller holds the lock.
    fn schedule(
        &self,
        st: &mut QueueState,
        changes: Vec<FileChangeEvent>,
        callback: ExecutionCallback,
    ) -> ScheduledRun {
        st.last_run_number += 1;
        let run_number = st.last_run_number;
        let token = self.root.child_token();
        st.running = Some((run_number, token.clone()));
        self.idle.send_replace(false);
        ScheduledRun {
            run_number,
            token,
            changes,
            callback,
        }
    }
}

/// Serialises executions: one in flight, one pending, monotonic run numbers
/// starting at 1.
#[derive(Clone)]
pub struct ExecutionQueue {
    shared: Arc<Shared>,
}

impl fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.lock();
        f.debug_struct("ExecutionQueue")
            .field("running", &st.running.as_ref().map(|(n, _)| *n))
            .field("pending", &st.pending.is_some())
            .field("last_run_number", &st.last_run_number)
            .finish()
    }
}

impl ExecutionQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (idle, _) = watch::channel(true);
        let shared = Shared {
            state: Mutex::new(QueueState {
                running: None,
                pending: None,
                last_run_number: 0,
                accepting: true,
            }),
            events,
            idle,
            root: CancellationToken::new(),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    /// Start `callback` now if idle, otherwise park it in the pending slot.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(
        &self,
        changes: Vec<FileChangeEvent>,
        callback: ExecutionCallback,
    ) -> EnqueueOutcome {
        let run = {
            let mut st = self.shared.lock();
            if !st.accepting {
                return EnqueueOutcome::Rejected;
            }
            if st.running.is_some() {
                let replaced = st
                    .pending
                    .replace(PendingExecution { changes, callback })
                    .is_some();
                drop(st);
                return if replaced {
                    debug!("pending execution replaced");
                    EnqueueOutcome::Replaced
                } else {
                    debug!("execution queued behind running run");
                    EnqueueOutcome::Queued
                };
            }
            self.shared.schedule(&mut st, changes, callback)
        };

        let run_number = run.run_number;
        tokio::spawn(drive(Arc::clone(&self.shared), run));
        EnqueueOutcome::Started(run_number)
    }

    /// Cancel the running execution and discard the pending one.
    pub fn cancel_current(&self) {
        let token = {
            let mut st = self.shared.lock();
            if st.pending.take().is_some() {
                debug!("discarded pending execution");
            }
            st.running.as_ref().map(|(_, token)| token.clone())
        };
        if let Some(token) = token {
            info!("cancelling running execution");
            token.cancel();
        }
    }

    pub fn is_executing(&self) -> bool {
        self.shared.lock().running.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    pub fn last_run_number(&self) -> u64 {
        self.shared.lock().last_run_number
    }

    /// Wait until nothing is running or pending.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.idle.subscribe();
        // The sender lives in `shared`, so this only errors if it is gone,
        // in which case nothing can be running either.
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Stop accepting work, drop the pending request and give the running
    /// execution up to `timeout` to finish. After that it is cancelled and
    /// given another `timeout` to observe the cancellation.
    ///
    /// Returns `true` if the queue drained without forced cancellation.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        {
            let mut st = self.shared.lock();
            st.accepting = false;
            if st.pending.take().is_some() {
                debug!("discarded pending execution on shutdown");
            }
        }

        if tokio::time::timeout(timeout, self.wait_idle()).await.is_ok() {
            return true;
        }

        warn!(?timeout, "execution did not finish in time; cancelling");
        self.shared.root.cancel();
        if tokio::time::timeout(timeout, self.wait_idle()).await.is_err() {
            warn!("execution ignored cancellation; abandoning it");
        }
        false
    }
}

/// Runs one execution and then any promoted successors until the queue is
/// idle again.
async fn drive(shared: Arc<Shared>, first: ScheduledRun) {
    let mut next = Some(first);

    while let Some(run) = next.take() {
        let ScheduledRun {
            run_number,
            token,
            changes,
            callback,
        } = run;
        let trigger_count = changes.len();

        info!(run_number, trigger_count, "execution starting");
        let _ = shared.events.send(QueueEvent::Starting {
            run_number,
            changes,
        });

        let started = Instant::now();
        // Spawned so a panicking callback surfaces as a JoinError instead of
        // tearing down the driver.
        let joined = tokio::spawn(callback(token.clone())).await;
        let duration = started.elapsed();

        let cancelled = token.is_cancelled();
        let (success, message) = match joined {
            _ if cancelled => (false, Some("execution cancelled".to_string())),
            Ok(Ok(true)) => (true, None),
            Ok(Ok(false)) => (false, Some("execution reported failure".to_string())),
            Ok(Err(err)) => (false, Some(format!("execution failed: {err:#}"))),
            Err(err) if err.is_panic() => (false, Some("execution panicked".to_string())),
            Err(err) => (false, Some(format!("execution aborted: {err}"))),
        };

        match &message {
            None => info!(run_number, ?duration, "execution succeeded"),
            Some(msg) => warn!(run_number, ?duration, %msg, "execution failed"),
        }

        let outcome = ExecutionOutcome {
            run_number,
            success,
            cancelled,
            message,
            duration,
            trigger_count,
        };

        // Completion is published under the lock so that anyone woken by
        // the idle flag already finds it in the channel.
        let mut st = shared.lock();
        match st.pending.take() {
            Some(p) if st.accepting => {
                next = Some(shared.schedule(&mut st, p.changes, p.callback));
            }
            _ => st.running = None,
        }
        let _ = shared.events.send(QueueEvent::Completed {
            outcome,
            promoted: next.is_some(),
        });
        if next.is_none() {
            shared.idle.send_replace(true);
        }
        drop(st);
    }
}

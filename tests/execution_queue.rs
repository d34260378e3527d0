// tests/execution_queue.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};

use stepwatch::engine::{
    EnqueueOutcome, ExecutionCallback, ExecutionQueue, QueueEvent, execution_callback,
};
use stepwatch::types::{ChangeType, FileChangeEvent};
use stepwatch_test_utils::{init_tracing, with_timeout};

fn changes(paths: &[&str]) -> Vec<FileChangeEvent> {
    paths
        .iter()
        .map(|p| FileChangeEvent::new(format!("/repo/{p}"), *p, ChangeType::Modified))
        .collect()
}

/// Callback that counts invocations and blocks until released.
fn gated(count: Arc<AtomicUsize>, gate: Arc<Notify>) -> ExecutionCallback {
    execution_callback(move |_token| {
        let count = Arc::clone(&count);
        let gate = Arc::clone(&gate);
        async move {
            count.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            Ok(true)
        }
    })
}

async fn next_completed(rx: &mut mpsc::UnboundedReceiver<QueueEvent>) -> stepwatch::engine::ExecutionOutcome {
    loop {
        match with_timeout(rx.recv()).await.expect("queue event") {
            QueueEvent::Completed { outcome, .. } => return outcome,
            QueueEvent::Starting { .. } => continue,
        }
    }
}

#[tokio::test]
async fn idle_queue_starts_immediately_with_increasing_numbers() {
    init_tracing();
    let (queue, mut rx) = ExecutionQueue::new();
    let ok = execution_callback(|_| async { Ok(true) });

    assert_eq!(queue.enqueue(Vec::new(), ok.clone()), EnqueueOutcome::Started(1));
    assert_eq!(next_completed(&mut rx).await.run_number, 1);
    with_timeout(queue.wait_idle()).await;

    assert_eq!(queue.enqueue(Vec::new(), ok), EnqueueOutcome::Started(2));
    let outcome = next_completed(&mut rx).await;
    assert_eq!(outcome.run_number, 2);
    assert!(outcome.success);
    assert_eq!(queue.last_run_number(), 2);
}

#[tokio::test]
async fn two_requests_during_a_run_yield_exactly_two_runs() {
    let (queue, mut rx) = ExecutionQueue::new();
    let count = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let cb = gated(Arc::clone(&count), Arc::clone(&gate));

    assert_eq!(queue.enqueue(changes(&["a"]), cb.clone()), EnqueueOutcome::Started(1));
    assert_eq!(queue.enqueue(changes(&["b"]), cb.clone()), EnqueueOutcome::Queued);
    assert_eq!(queue.enqueue(changes(&["c", "d"]), cb.clone()), EnqueueOutcome::Replaced);
    assert!(queue.has_pending());

    gate.notify_one();
    let first = next_completed(&mut rx).await;
    assert_eq!(first.run_number, 1);

    // The promoted run carries the replacing request's changes.
    let starting = with_timeout(rx.recv()).await.unwrap();
    match starting {
        QueueEvent::Starting { run_number, changes } => {
            assert_eq!(run_number, 2);
            assert_eq!(changes.len(), 2);
        }
        other => panic!("expected Starting, got {other:?}"),
    }

    gate.notify_one();
    let second = next_completed(&mut rx).await;
    assert_eq!(second.run_number, 2);
    assert_eq!(second.trigger_count, 2);

    with_timeout(queue.wait_idle()).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(!queue.is_executing());
}

#[tokio::test]
async fn errors_panics_and_false_become_failed_outcomes() {
    let (queue, mut rx) = ExecutionQueue::new();

    queue.enqueue(Vec::new(), execution_callback(|_| async { Ok(false) }));
    let outcome = next_completed(&mut rx).await;
    assert!(!outcome.success && !outcome.cancelled);
    with_timeout(queue.wait_idle()).await;

    queue.enqueue(
        Vec::new(),
        execution_callback(|_| async { Err(anyhow::anyhow!("compiler exploded")) }),
    );
    let outcome = next_completed(&mut rx).await;
    assert!(!outcome.success);
    assert!(outcome.message.unwrap().contains("compiler exploded"));
    with_timeout(queue.wait_idle()).await;

    queue.enqueue(
        Vec::new(),
        execution_callback(|_| async {
            if true {
                panic!("callback bug");
            }
            Ok(true)
        }),
    );
    let outcome = next_completed(&mut rx).await;
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("execution panicked"));

    // The queue keeps working afterwards.
    with_timeout(queue.wait_idle()).await;
    assert_eq!(
        queue.enqueue(Vec::new(), execution_callback(|_| async { Ok(true) })),
        EnqueueOutcome::Started(4)
    );
}

#[tokio::test]
async fn cancel_current_stops_run_and_drops_pending() {
    let (queue, mut rx) = ExecutionQueue::new();
    let count = Arc::new(AtomicUsize::new(0));

    let cb = {
        let count = Arc::clone(&count);
        execution_callback(move |token| {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                token.cancelled().await;
                Ok(true)
            }
        })
    };

    queue.enqueue(Vec::new(), cb.clone());
    queue.enqueue(changes(&["x"]), cb);
    queue.cancel_current();

    let outcome = next_completed(&mut rx).await;
    assert!(outcome.cancelled);
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("execution cancelled"));

    with_timeout(queue.wait_idle()).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!queue.has_pending());
}

#[tokio::test(start_paused = true)]
async fn shutdown_forces_cancellation_after_timeout() {
    let (queue, mut rx) = ExecutionQueue::new();
    queue.enqueue(
        Vec::new(),
        execution_callback(|token| async move {
            token.cancelled().await;
            Ok(true)
        }),
    );

    let graceful = with_timeout(queue.shutdown(Duration::from_secs(1))).await;
    assert!(!graceful);
    assert!(next_completed(&mut rx).await.cancelled);

    assert_eq!(
        queue.enqueue(Vec::new(), execution_callback(|_| async { Ok(true) })),
        EnqueueOutcome::Rejected
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_a_cooperative_run_finish() {
    let (queue, mut rx) = ExecutionQueue::new();
    queue.enqueue(
        Vec::new(),
        execution_callback(|_| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(true)
        }),
    );

    assert!(with_timeout(queue.shutdown(Duration::from_secs(30))).await);
    let outcome = next_completed(&mut rx).await;
    assert!(outcome.success);
}

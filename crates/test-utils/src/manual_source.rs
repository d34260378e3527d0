use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use stepwatch::errors::{Result, StepwatchError};
use stepwatch::types::{ChangeType, FileChangeEvent};
use stepwatch::watch::{ChangeSource, WatcherMessage};
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    tx: Option<mpsc::UnboundedSender<WatcherMessage>>,
    starts: usize,
    failing_starts: usize,
}

/// A change source driven by the test instead of the filesystem.
pub struct ManualChangeSource {
    inner: Arc<Mutex<Inner>>,
}

/// Test-side handle for a [`ManualChangeSource`].
#[derive(Clone)]
pub struct SourceController {
    inner: Arc<Mutex<Inner>>,
}

impl ManualChangeSource {
    pub fn new() -> (Self, SourceController) {
        let inner = Arc::new(Mutex::new(Inner::default()));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            SourceController { inner },
        )
    }
}

impl ChangeSource for ManualChangeSource {
    type Guard = ();

    fn start(&mut self, tx: mpsc::UnboundedSender<WatcherMessage>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.starts += 1;
        if inner.failing_starts > 0 {
            inner.failing_starts -= 1;
            return Err(StepwatchError::Other(anyhow::anyhow!("simulated start failure")));
        }
        inner.tx = Some(tx);
        Ok(())
    }
}

impl SourceController {
    /// Deliver a modification of `rel` (a root-relative path).
    pub fn touch(&self, rel: &str) {
        self.send(WatcherMessage::Change(FileChangeEvent::new(
            PathBuf::from("/workspace").join(rel),
            rel,
            ChangeType::Modified,
        )));
    }

    pub fn fail(&self, message: &str) {
        self.send(WatcherMessage::Error(message.to_string()));
    }

    /// Make the next `n` calls to `start` fail.
    pub fn fail_next_starts(&self, n: usize) {
        self.inner.lock().unwrap().failing_starts = n;
    }

    pub fn start_count(&self) -> usize {
        self.inner.lock().unwrap().starts
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().unwrap().tx.is_some()
    }

    fn send(&self, msg: WatcherMessage) {
        let tx = self.inner.lock().unwrap().tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(msg);
        }
    }
}

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stepwatch::exec::{JobExecutionResult, JobFuture, JobRunner, StepExecutionResult};
use stepwatch::pipeline::Job;
use tokio_util::sync::CancellationToken;

/// A fake job runner that:
/// - records every (reduced) job it is handed
/// - reports each step as successful, unless the step name was marked to fail
/// - optionally waits before returning, honouring cancellation.
#[derive(Clone, Default)]
pub struct RecordingJobRunner {
    received: Arc<Mutex<Vec<Job>>>,
    failing_steps: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
}

impl RecordingJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step named `name` reports failure.
    pub fn fail_step(self, name: &str) -> Self {
        self.failing_steps.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn received(&self) -> Vec<Job> {
        self.received.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl JobRunner for RecordingJobRunner {
    fn run_job<'a>(
        &'a self,
        job: &'a Job,
        _workspace: &'a Path,
        cancel: CancellationToken,
    ) -> JobFuture<'a> {
        Box::pin(async move {
            self.received.lock().unwrap().push(job.clone());

            if let Some(delay) = self.delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        return Ok(JobExecutionResult::failed("cancelled", Vec::new()));
                    }
                }
            }

            let failing = self.failing_steps.lock().unwrap().clone();
            let mut results = Vec::new();
            for step in &job.steps {
                let success = !failing.contains(&step.name);
                results.push(StepExecutionResult {
                    step_name: step.name.clone(),
                    success,
                    exit_code: Some(if success { 0 } else { 1 }),
                    output: format!("ran {}", step.name),
                    duration: Duration::from_millis(1),
                    skipped: false,
                });
                if !success {
                    return Ok(JobExecutionResult::failed(
                        format!("step '{}' failed", step.name),
                        results,
                    ));
                }
            }
            Ok(JobExecutionResult::succeeded(results))
        })
    }
}

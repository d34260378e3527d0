// src/exec/filtering.rs

//! Applies step filter decisions in front of a [`JobRunner`].

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::backend::{JobExecutionResult, JobRunner, StepExecutionResult};
use crate::filter::{FilterResult, StepFilter};
use crate::pipeline::{Job, Pipeline};

/// Result of running every job of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineExecutionResult {
    pub success: bool,
    /// `(job id, result)` in declaration order.
    pub jobs: Vec<(String, JobExecutionResult)>,
}

impl PipelineExecutionResult {
    pub fn executed_steps(&self) -> usize {
        self.step_results().filter(|s| !s.skipped).count()
    }

    pub fn skipped_steps(&self) -> usize {
        self.step_results().filter(|s| s.skipped).count()
    }

    pub fn failed_steps(&self) -> usize {
        self.step_results().filter(|s| !s.success).count()
    }

    fn step_results(&self) -> impl Iterator<Item = &StepExecutionResult> {
        self.jobs.iter().flat_map(|(_, r)| r.step_results.iter())
    }
}

/// Wraps a [`JobRunner`], handing it only the steps the filter selects.
pub struct FilteringJobRunner<R: JobRunner> {
    inner: R,
    filter: Arc<dyn StepFilter>,
}

impl<R: JobRunner> std::fmt::Debug for FilteringJobRunner<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteringJobRunner")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<R: JobRunner> FilteringJobRunner<R> {
    pub fn new(inner: R, filter: Arc<dyn StepFilter>) -> Self {
        Self { inner, filter }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Per-step decisions for `job`, in step order.
    pub fn plan(&self, job: &Job) -> Vec<FilterResult> {
        job.steps
            .iter()
            .enumerate()
            .map(|(i, step)| self.filter.should_execute(step, i + 1, job))
            .collect()
    }

    /// Run the selected steps of `job` and report results for every step in
    /// original order.
    ///
    /// Skipped steps are reported as successful `[SKIPPED]` results. If no
    /// step is selected the runner is not invoked and the job succeeds.
    pub async fn run_job(
        &self,
        job: &Job,
        workspace: &Path,
        cancel: CancellationToken,
    ) -> Result<JobExecutionResult> {
        let decisions = self.plan(job);

        let selected: Vec<usize> = decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.should_execute)
            .map(|(i, _)| i)
            .collect();

        for (i, d) in decisions.iter().enumerate() {
            if !d.should_execute {
                debug!(
                    job = %job.id,
                    step = %job.steps[i].name,
                    skip_reason = %d.skip_reason,
                    "{}",
                    d.reason
                );
            }
        }

        let delegated = if selected.is_empty() {
            info!(job = %job.id, "no steps selected; not invoking job runner");
            None
        } else {
            let reduced = job.with_steps(selected.iter().map(|&i| job.steps[i].clone()).collect());
            info!(
                job = %job.id,
                selected = selected.len(),
                total = job.steps.len(),
                "running filtered job"
            );
            Some(self.inner.run_job(&reduced, workspace, cancel).await?)
        };

        let mut executed = delegated
            .as_ref()
            .map(|r| r.step_results.iter())
            .into_iter()
            .flatten();

        let mut step_results = Vec::with_capacity(job.steps.len());
        for (i, decision) in decisions.iter().enumerate() {
            if decision.should_execute {
                // The runner may stop early; steps it never reached have no result.
                if let Some(result) = executed.next() {
                    step_results.push(result.clone());
                }
            } else {
                step_results.push(StepExecutionResult::skipped(
                    job.steps[i].name.clone(),
                    &decision.reason,
                ));
            }
        }

        Ok(match delegated {
            Some(result) => JobExecutionResult {
                success: result.success,
                error_message: result.error_message,
                step_results,
            },
            None => JobExecutionResult::succeeded(step_results),
        })
    }

    /// Run every job of `pipeline` in declaration order.
    ///
    /// Jobs are independent; a failing job does not stop the next one unless
    /// `cancel` fires.
    pub async fn run_pipeline(
        &self,
        pipeline: &Pipeline,
        workspace: &Path,
        cancel: CancellationToken,
    ) -> Result<PipelineExecutionResult> {
        let mut jobs = Vec::with_capacity(pipeline.jobs.len());
        let mut success = true;

        for job in &pipeline.jobs {
            if cancel.is_cancelled() {
                warn!(job = %job.id, "cancelled before job started");
                jobs.push((job.id.clone(), JobExecutionResult::failed("cancelled", Vec::new())));
                success = false;
                break;
            }

            let result = self.run_job(job, workspace, cancel.clone()).await?;
            if !result.success {
                warn!(
                    job = %job.id,
                    error = result.error_message.as_deref().unwrap_or("unknown error"),
                    "job failed"
                );
                success = false;
            }
            jobs.push((job.id.clone(), result));
        }

        Ok(PipelineExecutionResult { success, jobs })
    }
}

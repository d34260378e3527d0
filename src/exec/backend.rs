// src/exec/backend.rs

//! Pluggable job runner abstraction.
//!
//! The scheduling core never runs commands itself; it hands a (possibly
//! reduced) [`Job`] to a [`JobRunner`].
//!
//! - [`ShellJobRunner`](crate::exec::ShellJobRunner) is the implementation
//!   used by the `stepwatch` binary.
//! - Tests provide their own runner that records the jobs it receives.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::pipeline::Job;

/// Boxed future returned by [`JobRunner::run_job`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<JobExecutionResult>> + Send + 'a>>;

/// Trait abstracting how a job's steps are executed.
///
/// Implementations must observe `cancel` and return promptly once it fires.
pub trait JobRunner: Send + Sync {
    fn run_job<'a>(&'a self, job: &'a Job, workspace: &'a Path, cancel: CancellationToken) -> JobFuture<'a>;
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepExecutionResult {
    pub step_name: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub duration: Duration,
    /// Set only for steps a filter kept from running.
    pub skipped: bool,
}

impl StepExecutionResult {
    /// A step that was not run because a filter skipped it. Counts as success.
    pub fn skipped(step_name: impl Into<String>, reason: &str) -> Self {
        Self {
            step_name: step_name.into(),
            success: true,
            exit_code: None,
            output: format!("[SKIPPED] {reason}"),
            duration: Duration::ZERO,
            skipped: true,
        }
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobExecutionResult {
    pub success: bool,
    pub error_message: Option<String>,
    pub step_results: Vec<StepExecutionResult>,
}

impl JobExecutionResult {
    pub fn succeeded(step_results: Vec<StepExecutionResult>) -> Self {
        Self {
            success: true,
            error_message: None,
            step_results,
        }
    }

    pub fn failed(message: impl Into<String>, step_results: Vec<StepExecutionResult>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            step_results,
        }
    }
}

// src/exec/shell.rs

//! Runs job steps as local shell processes.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use anyhow::Context;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::backend::{JobExecutionResult, JobFuture, JobRunner, StepExecutionResult};
use crate::pipeline::{Job, Step};

/// Executes each step's `run` command with the platform shell, one step at a
/// time, stopping at the first failure unless the step has
/// `continue_on_error`.
#[derive(Debug, Clone, Default)]
pub struct ShellJobRunner {
    /// Echo step output to stdout as it completes.
    echo_output: bool,
}

impl ShellJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo_output(mut self, yes: bool) -> Self {
        self.echo_output = yes;
        self
    }

    async fn run_job_inner(
        &self,
        job: &Job,
        workspace: &Path,
        cancel: CancellationToken,
    ) -> Result<JobExecutionResult> {
        let mut results = Vec::with_capacity(job.steps.len());

        for step in &job.steps {
            if cancel.is_cancelled() {
                return Ok(JobExecutionResult::failed("cancelled", results));
            }

            let outcome = run_step(job, step, workspace, &cancel).await?;
            let Some(result) = outcome else {
                info!(job = %job.id, step = %step.name, "step cancelled; process killed");
                return Ok(JobExecutionResult::failed("cancelled", results));
            };

            if self.echo_output && !result.output.is_empty() {
                println!("[{} / {}]\n{}", job.display_name(), step.name, result.output.trim_end());
            }

            let failed = !result.success;
            results.push(result);

            if failed {
                if step.continue_on_error {
                    warn!(job = %job.id, step = %step.name, "step failed; continuing (continue_on_error)");
                    continue;
                }
                return Ok(JobExecutionResult::failed(
                    format!("step '{}' failed", step.name),
                    results,
                ));
            }
        }

        Ok(JobExecutionResult::succeeded(results))
    }
}

impl JobRunner for ShellJobRunner {
    fn run_job<'a>(&'a self, job: &'a Job, workspace: &'a Path, cancel: CancellationToken) -> JobFuture<'a> {
        Box::pin(self.run_job_inner(job, workspace, cancel))
    }
}

/// Run one step. Returns `Ok(None)` if it was cancelled.
async fn run_step(
    job: &Job,
    step: &Step,
    workspace: &Path,
    cancel: &CancellationToken,
) -> Result<Option<StepExecutionResult>> {
    let dir = match &step.working_directory {
        Some(sub) => workspace.join(sub),
        None => workspace.to_path_buf(),
    };

    info!(job = %job.id, step = %step.name, cmd = %step.run, "starting step");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&step.run);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&step.run);
        c
    };

    cmd.current_dir(&dir)
        .envs(job.env.iter().chain(step.env.iter()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let child = cmd
        .spawn()
        .with_context(|| format!("spawning process for step '{}'", step.name))?;

    tokio::select! {
        output = child.wait_with_output() => {
            let output = output
                .with_context(|| format!("waiting for process of step '{}'", step.name))?;
            let code = output.status.code();
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.is_empty() {
                text.push_str(&stderr);
            }

            debug!(
                job = %job.id,
                step = %step.name,
                exit_code = ?code,
                success = output.status.success(),
                "step process exited"
            );

            Ok(Some(StepExecutionResult {
                step_name: step.name.clone(),
                success: output.status.success(),
                exit_code: code,
                output: text,
                duration: started.elapsed(),
                skipped: false,
            }))
        }

        // Dropping the `wait_with_output` future drops the child, which is
        // killed thanks to `kill_on_drop(true)`.
        _ = cancel.cancelled() => Ok(None),
    }
}

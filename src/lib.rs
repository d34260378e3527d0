// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod logging;
pub mod pipeline;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{DEFAULT_SETTINGS_FILE, Settings, load_settings};
use crate::engine::{WatchEvent, WatchModeService, WatchOptions, execution_callback};
use crate::errors::StepwatchError;
use crate::exec::{FilteringJobRunner, JobRunner, PipelineExecutionResult, ShellJobRunner};
use crate::filter::{FilterValidationResult, Severity, StepFilterBuilder};
use crate::pipeline::{Pipeline, load_pipeline};

/// High-level entry point used by `main.rs`.
///
/// Loads settings and the pipeline, builds and validates the step filter,
/// then runs the pipeline once or hands it to the watch scheduler.
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref().map(Path::new)).with_context(|| {
        format!(
            "loading settings from {}",
            args.config.as_deref().unwrap_or(DEFAULT_SETTINGS_FILE)
        )
    })?;

    let pipeline_path = PathBuf::from(&args.pipeline);
    let pipeline = load_pipeline(&pipeline_path)?;
    let workspace = match &args.workspace {
        Some(dir) => PathBuf::from(dir),
        None => pipeline_root_dir(&pipeline_path),
    };
    info!(pipeline = %pipeline.name, workspace = %workspace.display(), "pipeline loaded");

    let built = StepFilterBuilder::new()
        .fuzzy_config(settings.filter)
        .step_names(args.steps.iter().cloned())
        .step_indices(args.step_indices.iter().cloned())
        .step_ranges(args.step_ranges.iter().cloned())
        .skip_steps(args.skip_steps.iter().cloned())
        .jobs(args.jobs.iter().cloned())
        .include_dependencies(args.include_deps)
        .preview_only(args.preview)
        .confirm(args.confirm)
        .build(&pipeline);

    print_validation(&built.validation);
    if !built.validation.is_valid() {
        return Err(StepwatchError::ValidationFailed(built.validation.errors.len()).into());
    }

    let runner = FilteringJobRunner::new(ShellJobRunner::new(), built.filter);

    if built.options.preview_only {
        print_plan(&pipeline, &runner);
        return Ok(());
    }
    if built.options.confirm {
        print_plan(&pipeline, &runner);
        if !confirm_prompt().await? {
            println!("aborted");
            return Ok(());
        }
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    if args.watch {
        let options = watch_options(&settings, &args, workspace.clone());
        return run_watch(pipeline, workspace, runner, options, cancel).await;
    }

    let result = runner.run_pipeline(&pipeline, &workspace, cancel).await?;
    print_summary(&result);
    if !result.success {
        anyhow::bail!("pipeline '{}' failed", pipeline.name);
    }
    Ok(())
}

async fn run_watch<R: JobRunner + 'static>(
    pipeline: Pipeline,
    workspace: PathBuf,
    runner: FilteringJobRunner<R>,
    options: WatchOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let pipeline = Arc::new(pipeline);
    let workspace = Arc::new(workspace);
    let runner = Arc::new(runner);

    let execution = execution_callback(move |token| {
        let pipeline = Arc::clone(&pipeline);
        let workspace = Arc::clone(&workspace);
        let runner = Arc::clone(&runner);
        async move {
            let result = runner.run_pipeline(&pipeline, &workspace, token).await?;
            print_summary(&result);
            Ok(result.success)
        }
    });

    let service = WatchModeService::new(options);
    let mut events = service.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            report_watch_event(&event);
        }
    });

    service.run(execution, cancel).await?;
    println!("{}", service.statistics());
    Ok(())
}

fn watch_options(settings: &Settings, args: &CliArgs, root: PathBuf) -> WatchOptions {
    let mut exclude = settings.watch.exclude.clone();
    exclude.extend(args.excludes.iter().cloned());

    WatchOptions {
        root,
        debounce: args
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| settings.watch.debounce()),
        exclude,
        use_default_excludes: settings.watch.use_default_excludes,
        shutdown_timeout: settings.watch.shutdown_timeout(),
    }
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; stopping");
        cancel.cancel();
    });
}

/// Steps run relative to the pipeline file's directory unless told otherwise.
///
/// A bare file name like "ci.toml" has an empty parent, in which case the
/// current working directory is used.
fn pipeline_root_dir(pipeline_path: &Path) -> PathBuf {
    match pipeline_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

async fn confirm_prompt() -> Result<bool> {
    println!("Proceed? [y/N]");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading confirmation from stdin")?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_validation(validation: &FilterValidationResult) {
    for problem in validation.problems() {
        let label = match problem.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{label}[{}]: {}", problem.code, problem.message);
        if !problem.suggestions.is_empty() {
            eprintln!("  did you mean: {}", problem.suggestions.join(", "));
        }
    }
}

fn print_plan<R: JobRunner>(pipeline: &Pipeline, runner: &FilteringJobRunner<R>) {
    println!("execution plan for '{}'", pipeline.name);
    for job in &pipeline.jobs {
        println!("  job {}", job.display_name());
        for (i, (step, decision)) in job.steps.iter().zip(runner.plan(job)).enumerate() {
            if decision.should_execute {
                println!("    {:>3}. [run]  {}", i + 1, step.name);
            } else {
                println!(
                    "    {:>3}. [skip] {} ({}: {})",
                    i + 1,
                    step.name,
                    decision.skip_reason,
                    decision.reason
                );
            }
        }
    }
    debug!("plan printed");
}

fn print_summary(result: &PipelineExecutionResult) {
    println!(
        "{}: {} step(s) executed, {} skipped, {} failed",
        if result.success { "succeeded" } else { "failed" },
        result.executed_steps(),
        result.skipped_steps(),
        result.failed_steps()
    );
    for (job_id, job) in &result.jobs {
        if let Some(err) = &job.error_message {
            println!("  job {job_id}: {err}");
        }
    }
}

fn report_watch_event(event: &WatchEvent) {
    match event {
        WatchEvent::StateChanged { from, to } => debug!(%from, %to, "state"),
        WatchEvent::ChangesDetected { changes } => {
            for change in changes {
                println!("  changed: {change}");
            }
        }
        WatchEvent::ExecutionStarting { run_number, changes } => {
            println!("run #{run_number} starting ({} change(s))", changes.len());
        }
        WatchEvent::ExecutionCompleted { outcome } => match &outcome.message {
            None => println!(
                "run #{} succeeded in {:.2}s",
                outcome.run_number,
                outcome.duration.as_secs_f64()
            ),
            Some(msg) => println!("run #{} failed: {msg}", outcome.run_number),
        },
        WatchEvent::WatcherError { message, restarting } => {
            eprintln!("watcher error: {message}{}", if *restarting { " (restarting)" } else { "" });
        }
    }
}

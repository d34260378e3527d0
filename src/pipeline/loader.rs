// src/pipeline/loader.rs

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::{Result, StepwatchError};
use crate::pipeline::model::Pipeline;

/// Load a pipeline file from disk and check the structural invariants the
/// scheduler relies on.
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<Pipeline> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let mut pipeline = parse_pipeline(&contents)?;

    if pipeline.name.is_empty() {
        pipeline.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string());
    }

    debug!(
        pipeline = %pipeline.name,
        jobs = pipeline.jobs.len(),
        steps = pipeline.step_count(),
        "loaded pipeline"
    );
    Ok(pipeline)
}

/// Parse and validate a pipeline from TOML text.
pub fn parse_pipeline(contents: &str) -> Result<Pipeline> {
    let pipeline: Pipeline = toml::from_str(contents)?;
    validate_pipeline(&pipeline)?;
    Ok(pipeline)
}

fn validate_pipeline(pipeline: &Pipeline) -> Result<()> {
    if pipeline.jobs.is_empty() {
        return Err(StepwatchError::PipelineError(
            "pipeline must contain at least one [[job]]".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for job in &pipeline.jobs {
        if job.id.trim().is_empty() {
            return Err(StepwatchError::PipelineError(
                "every job needs a non-empty `id`".to_string(),
            ));
        }
        if !seen.insert(job.id.as_str()) {
            return Err(StepwatchError::PipelineError(format!(
                "duplicate job id '{}'",
                job.id
            )));
        }
        for (i, step) in job.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(StepwatchError::PipelineError(format!(
                    "step {} of job '{}' has an empty name",
                    i + 1,
                    job.id
                )));
            }
            if step.run.trim().is_empty() {
                return Err(StepwatchError::PipelineError(format!(
                    "step '{}' of job '{}' has an empty `run` command",
                    step.name, job.id
                )));
            }
        }
    }

    Ok(())
}

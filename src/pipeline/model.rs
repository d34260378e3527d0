// src/pipeline/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// A parsed pipeline: an ordered list of independent jobs.
///
/// ```toml
/// name = "ci"
///
/// [[job]]
/// id = "build"
/// name = "Build and test"
///
/// [[job.step]]
/// name = "Checkout"
/// run = "git status"
///
/// [[job.step]]
/// name = "Build"
/// run = "cargo build"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "job")]
    pub jobs: Vec<Job>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, jobs: Vec<Job>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }

    /// Total number of steps across all jobs.
    pub fn step_count(&self) -> usize {
        self.jobs.iter().map(|j| j.steps.len()).sum()
    }

    /// Every step name in declaration order, across all jobs.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.jobs
            .iter()
            .flat_map(|j| j.steps.iter().map(|s| s.name.as_str()))
    }
}

/// A job: an ordered sequence of steps executed as one scheduling unit.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: String,

    /// Display name. Falls back to `id` when absent in the file.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Job {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            env: BTreeMap::new(),
            steps,
        }
    }

    /// The name shown to users: `name`, or `id` if no name was given.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Copy of this job restricted to the given steps (in the given order).
    ///
    /// Used to hand the job runner only the steps that survived filtering.
    pub fn with_steps(&self, steps: Vec<Step>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            env: self.env.clone(),
            steps,
        }
    }
}

/// A single step: a shell command with some execution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub name: String,

    pub run: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub continue_on_error: bool,

    /// Directory relative to the workspace in which `run` is executed.
    #[serde(default)]
    pub working_directory: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: run.into(),
            env: BTreeMap::new(),
            continue_on_error: false,
            working_directory: None,
        }
    }
}

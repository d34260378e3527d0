// src/exec/mod.rs

//! Execution bridge.
//!
//! - [`backend`] defines the [`JobRunner`] collaborator and result types.
//! - [`filtering`] puts step filter decisions in front of a runner.
//! - [`shell`] is the local-process runner used by the binary.

pub mod backend;
pub mod filtering;
pub mod shell;

pub use backend::{JobExecutionResult, JobFuture, JobRunner, StepExecutionResult};
pub use filtering::{FilteringJobRunner, PipelineExecutionResult};
pub use shell::ShellJobRunner;

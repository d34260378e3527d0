// src/dag/mod.rs

//! Step dependency modelling.
//!
//! - [`graph`] holds a directed acyclic graph of (job, step) nodes.
//! - [`analyzer`] builds that graph from a pipeline and expands a step
//!   selection with its dependency closure.

pub mod analyzer;
pub mod graph;

pub use analyzer::{DependencyAnalyzer, DependencyRule, SequentialRule};
pub use graph::{DependencyGraph, StepId, StepNode, step_id};

// src/dag/analyzer.rs

//! Builds the step dependency graph for a pipeline and widens a step
//! selection with everything the selected steps depend on.

use std::collections::BTreeSet;
use std::fmt::Debug;

use tracing::{debug, info};

use crate::dag::graph::{DependencyGraph, StepNode, step_id};
use crate::filter::composite::CompositeFilter;
use crate::filter::filters::StepFilter;
use crate::filter::matcher::StringMatcher;
use crate::filter::options::FilterOptions;
use crate::pipeline::{Job, Pipeline};

/// Decides which steps of a job a given step directly depends on.
///
/// Positions are 1-based. Returned predecessors outside `1..=job.steps.len()`
/// are ignored.
pub trait DependencyRule: Send + Sync + Debug {
    fn predecessors(&self, job: &Job, position: usize) -> Vec<usize>;
}

/// Each step depends on the one before it; jobs are independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialRule;

impl DependencyRule for SequentialRule {
    fn predecessors(&self, _job: &Job, position: usize) -> Vec<usize> {
        if position > 1 {
            vec![position - 1]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug)]
pub struct DependencyAnalyzer {
    rule: Box<dyn DependencyRule>,
    matcher: StringMatcher,
}

impl Default for DependencyAnalyzer {
    fn default() -> Self {
        Self::new(StringMatcher::default())
    }
}

impl DependencyAnalyzer {
    pub fn new(matcher: StringMatcher) -> Self {
        Self {
            rule: Box::new(SequentialRule),
            matcher,
        }
    }

    pub fn with_rule(mut self, rule: impl DependencyRule + 'static) -> Self {
        self.rule = Box::new(rule);
        self
    }

    /// One node per (job, step); edges from the configured rule.
    pub fn build_graph(&self, pipeline: &Pipeline) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        for job in &pipeline.jobs {
            for (i, step) in job.steps.iter().enumerate() {
                graph.add_node(StepNode {
                    id: step_id(&job.id, i + 1),
                    job_id: job.id.clone(),
                    step_name: step.name.clone(),
                    position: i + 1,
                });
            }
        }

        for job in &pipeline.jobs {
            for position in 1..=job.steps.len() {
                let dependent = step_id(&job.id, position);
                for pred in self.rule.predecessors(job, position) {
                    if pred == 0 || pred > job.steps.len() {
                        continue;
                    }
                    // Both ids were inserted above.
                    let added = graph.add_dependency(&dependent, &step_id(&job.id, pred));
                    debug_assert!(added.is_ok(), "{added:?}");
                }
            }
        }

        debug!(nodes = graph.len(), "built step dependency graph");
        graph
    }

    /// Widen `options` so every selected step also selects its transitive
    /// dependencies.
    ///
    /// A no-op unless `include_dependencies` is set and some inclusion filter
    /// is configured. Steps selected by name or range are resolved against the
    /// jobs in scope; the dependency positions are added to `step_indices`.
    pub fn expand_with_dependencies(
        &self,
        options: &FilterOptions,
        pipeline: &Pipeline,
    ) -> FilterOptions {
        if !options.include_dependencies || !options.has_inclusion_filters() {
            return options.clone();
        }

        let graph = self.build_graph(pipeline);
        let selection = FilterOptions {
            skip_steps: Vec::new(),
            ..options.clone()
        };
        let filter = CompositeFilter::from_options(&selection, self.matcher);

        let mut added: BTreeSet<usize> = BTreeSet::new();
        for job in pipeline.jobs.iter().filter(|j| filter.selects_job(j)) {
            for (i, step) in job.steps.iter().enumerate() {
                if !filter.should_execute(step, i + 1, job).should_execute {
                    continue;
                }
                for dep in graph.transitive_dependencies(&step_id(&job.id, i + 1)) {
                    if !options.step_indices.contains(&dep.position) {
                        added.insert(dep.position);
                    }
                }
            }
        }

        if added.is_empty() {
            return options.clone();
        }

        info!(added = ?added, "expanded step selection with dependencies");

        let mut expanded = options.clone();
        expanded.step_indices.extend(added);
        expanded
    }
}

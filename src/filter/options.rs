// src/filter/options.rs

//! Filter data model: what the user asked for, and what a filter decided.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use crate::filter::matcher::StringMatcher;
use crate::pipeline::Job;

/// Step selection requested for one invocation. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Steps to run, matched by name.
    pub step_names: Vec<String>,
    /// Steps to run, by 1-based position within their job.
    pub step_indices: BTreeSet<usize>,
    /// Steps to run, by inclusive position or name range.
    pub step_ranges: Vec<StepRange>,
    /// Steps never to run, matched by name.
    pub skip_steps: Vec<String>,
    /// Jobs in scope, matched by name or id.
    pub job_names: Vec<String>,
    pub include_dependencies: bool,
    pub preview_only: bool,
    pub confirm: bool,
}

impl FilterOptions {
    /// True if any selection collection is non-empty.
    pub fn has_filters(&self) -> bool {
        self.has_inclusion_filters() || !self.skip_steps.is_empty() || !self.job_names.is_empty()
    }

    /// True if steps are selected by name, index or range.
    pub fn has_inclusion_filters(&self) -> bool {
        !self.step_names.is_empty() || !self.step_indices.is_empty() || !self.step_ranges.is_empty()
    }
}

/// An inclusive range of steps within a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRange {
    /// 1-based inclusive positions.
    Numeric { start: usize, end: usize },
    /// Endpoints named by step, resolved against each job's steps.
    Named { start_name: String, end_name: String },
}

impl StepRange {
    /// Resolve this range to 1-based positions within `job`.
    ///
    /// Returns `None` if a named endpoint matches no step, or if the resolved
    /// end lies before the start. Numeric ranges are clamped to the job's
    /// length and resolve to `None` when they fall entirely past its end.
    pub fn resolve(&self, job: &Job, matcher: &StringMatcher) -> Option<RangeInclusive<usize>> {
        let (start, end) = match self {
            StepRange::Numeric { start, end } => {
                let end = (*end).min(job.steps.len());
                (*start, end)
            }
            StepRange::Named {
                start_name,
                end_name,
            } => {
                let names = || job.steps.iter().map(|s| s.name.as_str());
                let start = matcher.best_match(names(), start_name)? + 1;
                let end = matcher.best_match(names(), end_name)? + 1;
                (start, end)
            }
        };

        (start >= 1 && end >= start).then_some(start..=end)
    }
}

impl fmt::Display for StepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRange::Numeric { start, end } => write!(f, "{start}-{end}"),
            StepRange::Named {
                start_name,
                end_name,
            } => write!(f, "{start_name}..{end_name}"),
        }
    }
}

/// Why a step was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    None,
    /// Inclusion filters exist and none of them matched.
    FilteredOut,
    /// A step this one depends on was skipped.
    DependencySkipped,
    /// The step's job is outside the job filter.
    JobNotSelected,
    /// The step matched a skip filter.
    ExplicitlySkipped,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::None => "none",
            SkipReason::FilteredOut => "filtered out",
            SkipReason::DependencySkipped => "dependency skipped",
            SkipReason::JobNotSelected => "job not selected",
            SkipReason::ExplicitlySkipped => "explicitly skipped",
        };
        f.write_str(s)
    }
}

/// Decision for one step. Produced fresh per evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub should_execute: bool,
    pub skip_reason: SkipReason,
    pub reason: String,
}

impl FilterResult {
    pub fn execute(reason: impl Into<String>) -> Self {
        Self {
            should_execute: true,
            skip_reason: SkipReason::None,
            reason: reason.into(),
        }
    }

    pub fn skip(skip_reason: SkipReason, reason: impl Into<String>) -> Self {
        Self {
            should_execute: false,
            skip_reason,
            reason: reason.into(),
        }
    }
}

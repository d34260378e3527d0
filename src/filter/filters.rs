// src/filter/filters.rs

//! Individual step predicates.
//!
//! Every filter answers the same question through [`StepFilter`]: given a
//! step, its 1-based position and its job, should it run? Evaluation is pure
//! and never fails; a filter that cannot decide (e.g. an unresolvable named
//! range) simply does not match.

use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::filter::matcher::StringMatcher;
use crate::filter::options::{FilterResult, SkipReason, StepRange};
use crate::pipeline::{Job, Step};

/// Uniform decision contract shared by all filters.
///
/// `position` is the step's 1-based position within `job`.
pub trait StepFilter: Send + Sync + Debug {
    fn should_execute(&self, step: &Step, position: usize, job: &Job) -> FilterResult;
}

/// Always executes. Used when no filters are configured at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpFilter;

impl StepFilter for NoOpFilter {
    fn should_execute(&self, _step: &Step, _position: usize, _job: &Job) -> FilterResult {
        FilterResult::execute("no filters configured")
    }
}

/// Selects steps whose name matches any of the given names.
#[derive(Debug, Clone)]
pub struct StepNameFilter {
    names: Vec<String>,
    matcher: StringMatcher,
}

impl StepNameFilter {
    pub fn new(names: Vec<String>, matcher: StringMatcher) -> Self {
        Self { names, matcher }
    }

    /// The first configured name that matches `step_name`.
    pub fn matching_name(&self, step_name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| self.matcher.matches(step_name, n))
            .map(String::as_str)
    }
}

impl StepFilter for StepNameFilter {
    fn should_execute(&self, step: &Step, _position: usize, _job: &Job) -> FilterResult {
        match self.matching_name(&step.name) {
            Some(name) => FilterResult::execute(format!("matches step name '{name}'")),
            None => FilterResult::skip(
                SkipReason::FilteredOut,
                format!("'{}' does not match any step name filter", step.name),
            ),
        }
    }
}

/// Selects steps by 1-based position.
#[derive(Debug, Clone)]
pub struct StepIndexFilter {
    indices: BTreeSet<usize>,
}

impl StepIndexFilter {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }
}

impl StepFilter for StepIndexFilter {
    fn should_execute(&self, step: &Step, position: usize, _job: &Job) -> FilterResult {
        if self.indices.contains(&position) {
            FilterResult::execute(format!("position {position} is selected"))
        } else {
            FilterResult::skip(
                SkipReason::FilteredOut,
                format!("'{}' (#{position}) is not a selected position", step.name),
            )
        }
    }
}

/// Selects steps inside any of the given ranges.
#[derive(Debug, Clone)]
pub struct StepRangeFilter {
    ranges: Vec<StepRange>,
    matcher: StringMatcher,
}

impl StepRangeFilter {
    pub fn new(ranges: Vec<StepRange>, matcher: StringMatcher) -> Self {
        Self { ranges, matcher }
    }
}

impl StepFilter for StepRangeFilter {
    fn should_execute(&self, step: &Step, position: usize, job: &Job) -> FilterResult {
        let hit = self.ranges.iter().find(|r| {
            r.resolve(job, &self.matcher)
                .is_some_and(|resolved| resolved.contains(&position))
        });

        match hit {
            Some(range) => FilterResult::execute(format!("inside range {range}")),
            None => FilterResult::skip(
                SkipReason::FilteredOut,
                format!("'{}' (#{position}) is outside every step range", step.name),
            ),
        }
    }
}

/// Rejects steps whose name matches any skip entry.
#[derive(Debug, Clone)]
pub struct StepExclusionFilter {
    names: StepNameFilter,
}

impl StepExclusionFilter {
    pub fn new(names: Vec<String>, matcher: StringMatcher) -> Self {
        Self {
            names: StepNameFilter::new(names, matcher),
        }
    }

    pub fn matching_name(&self, step_name: &str) -> Option<&str> {
        self.names.matching_name(step_name)
    }
}

impl StepFilter for StepExclusionFilter {
    fn should_execute(&self, step: &Step, _position: usize, _job: &Job) -> FilterResult {
        match self.matching_name(&step.name) {
            Some(name) => FilterResult::skip(
                SkipReason::ExplicitlySkipped,
                format!("'{}' matches skip filter '{name}'", step.name),
            ),
            None => FilterResult::execute("not skipped"),
        }
    }
}

/// Selects jobs by display name or id.
#[derive(Debug, Clone)]
pub struct JobFilter {
    names: Vec<String>,
    matcher: StringMatcher,
}

impl JobFilter {
    pub fn new(names: Vec<String>, matcher: StringMatcher) -> Self {
        Self { names, matcher }
    }

    pub fn matches_job(&self, job: &Job) -> bool {
        self.names.iter().any(|n| {
            self.matcher.matches(job.display_name(), n) || self.matcher.matches(&job.id, n)
        })
    }
}

impl StepFilter for JobFilter {
    fn should_execute(&self, _step: &Step, _position: usize, job: &Job) -> FilterResult {
        if self.matches_job(job) {
            FilterResult::execute(format!("job '{}' is selected", job.display_name()))
        } else {
            FilterResult::skip(
                SkipReason::JobNotSelected,
                format!("job '{}' is not selected", job.display_name()),
            )
        }
    }
}

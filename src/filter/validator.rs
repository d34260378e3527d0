// src/filter/validator.rs

//! Pre-flight checks of a [`FilterOptions`] against a concrete pipeline.
//!
//! Problems are collected, never raised, so that every mistake in an
//! invocation can be reported at once.

use std::fmt;

use tracing::debug;

use crate::filter::composite::CompositeFilter;
use crate::filter::filters::StepFilter;
use crate::filter::matcher::StringMatcher;
use crate::filter::options::{FilterOptions, StepRange};
use crate::pipeline::{Job, Pipeline};

/// How many step names to show when nothing matched.
const NO_MATCH_EXAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    StepNotFound,
    JobNotFound,
    IndexOutOfRange,
    InvalidIndexSpec,
    InvalidRange,
    RangeEndpointNotFound,
    PossibleTypo,
    NoStepsMatch,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationCode::StepNotFound => "StepNotFound",
            ValidationCode::JobNotFound => "JobNotFound",
            ValidationCode::IndexOutOfRange => "IndexOutOfRange",
            ValidationCode::InvalidIndexSpec => "InvalidIndexSpec",
            ValidationCode::InvalidRange => "InvalidRange",
            ValidationCode::RangeEndpointNotFound => "RangeEndpointNotFound",
            ValidationCode::PossibleTypo => "PossibleTypo",
            ValidationCode::NoStepsMatch => "NoStepsMatch",
        };
        f.write_str(s)
    }
}

/// A single problem found while validating filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterValidationError {
    pub code: ValidationCode,
    pub message: String,
    pub severity: Severity,
    /// Candidate names, closest first.
    pub suggestions: Vec<String>,
    pub problematic_value: String,
}

impl FilterValidationError {
    pub fn error(code: ValidationCode, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: Severity::Error,
            suggestions: Vec::new(),
            problematic_value: value.into(),
        }
    }

    pub fn warning(code: ValidationCode, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, value, message)
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl fmt::Display for FilterValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, " (did you mean: {}?)", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Success,
    WithWarnings,
    Failure,
}

/// Outcome of validation. Callers must not execute past a `Failure`.
#[derive(Debug, Clone, Default)]
pub struct FilterValidationResult {
    pub errors: Vec<FilterValidationError>,
    pub warnings: Vec<FilterValidationError>,
    /// Steps the filter would execute, across all jobs.
    pub matched_steps: usize,
}

impl FilterValidationResult {
    pub fn push(&mut self, problem: FilterValidationError) {
        match problem.severity {
            Severity::Error => self.errors.push(problem),
            Severity::Warning => self.warnings.push(problem),
        }
    }

    pub fn status(&self) -> ValidationStatus {
        if !self.errors.is_empty() {
            ValidationStatus::Failure
        } else if !self.warnings.is_empty() {
            ValidationStatus::WithWarnings
        } else {
            ValidationStatus::Success
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All problems, errors first.
    pub fn problems(&self) -> impl Iterator<Item = &FilterValidationError> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StepFilterValidator {
    matcher: StringMatcher,
}

impl StepFilterValidator {
    pub fn new(matcher: StringMatcher) -> Self {
        Self { matcher }
    }

    pub fn validate(&self, options: &FilterOptions, pipeline: &Pipeline) -> FilterValidationResult {
        let mut result = FilterValidationResult::default();

        let scope = self.validate_jobs(options, pipeline, &mut result);
        let step_names: Vec<&str> = scope
            .iter()
            .flat_map(|j| j.steps.iter().map(|s| s.name.as_str()))
            .collect();

        self.validate_step_names(options, &step_names, &mut result);
        self.validate_skip_steps(options, &step_names, &mut result);
        self.validate_indices(options, &scope, &mut result);
        self.validate_ranges(options, &scope, &mut result);

        if result.is_valid() {
            self.count_matches(options, pipeline, &mut result);
        }

        debug!(
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            matched = result.matched_steps,
            "validated step filters"
        );
        result
    }

    /// Check job filter entries; returns the jobs whose steps are in scope.
    fn validate_jobs<'p>(
        &self,
        options: &FilterOptions,
        pipeline: &'p Pipeline,
        result: &mut FilterValidationResult,
    ) -> Vec<&'p Job> {
        if options.job_names.is_empty() {
            return pipeline.jobs.iter().collect();
        }

        let mut scope: Vec<&Job> = Vec::new();
        for wanted in &options.job_names {
            let hits: Vec<&Job> = pipeline
                .jobs
                .iter()
                .filter(|j| {
                    self.matcher.matches(j.display_name(), wanted)
                        || self.matcher.matches(&j.id, wanted)
                })
                .collect();

            if hits.is_empty() {
                let candidates = pipeline
                    .jobs
                    .iter()
                    .flat_map(|j| [j.display_name(), j.id.as_str()]);
                let suggestions = self.matcher.closest_matches(wanted, candidates);
                result.push(
                    FilterValidationError::error(
                        ValidationCode::JobNotFound,
                        wanted.as_str(),
                        format!("no job matches '{wanted}'"),
                    )
                    .with_suggestions(suggestions),
                );
            }

            for job in hits {
                if !scope.iter().any(|j| j.id == job.id) {
                    scope.push(job);
                }
            }
        }

        if scope.is_empty() {
            pipeline.jobs.iter().collect()
        } else {
            scope
        }
    }

    fn validate_step_names(
        &self,
        options: &FilterOptions,
        step_names: &[&str],
        result: &mut FilterValidationResult,
    ) {
        for wanted in &options.step_names {
            if step_names.iter().any(|n| self.matcher.matches(n, wanted)) {
                continue;
            }
            let suggestions = self
                .matcher
                .closest_matches(wanted, step_names.iter().copied());
            result.push(
                FilterValidationError::error(
                    ValidationCode::StepNotFound,
                    wanted.as_str(),
                    format!("no step matches '{wanted}'"),
                )
                .with_suggestions(suggestions),
            );
        }
    }

    fn validate_skip_steps(
        &self,
        options: &FilterOptions,
        step_names: &[&str],
        result: &mut FilterValidationResult,
    ) {
        for wanted in &options.skip_steps {
            if step_names.iter().any(|n| self.matcher.matches(n, wanted)) {
                continue;
            }
            let suggestions = self
                .matcher
                .closest_matches(wanted, step_names.iter().copied());
            result.push(
                FilterValidationError::warning(
                    ValidationCode::PossibleTypo,
                    wanted.as_str(),
                    format!("skip entry '{wanted}' matches no step; nothing will be skipped for it"),
                )
                .with_suggestions(suggestions),
            );
        }
    }

    fn validate_indices(
        &self,
        options: &FilterOptions,
        scope: &[&Job],
        result: &mut FilterValidationResult,
    ) {
        let total = max_steps(scope);
        for &index in &options.step_indices {
            if index == 0 || index > total {
                result.push(FilterValidationError::error(
                    ValidationCode::IndexOutOfRange,
                    index.to_string(),
                    format!("step index {index} is outside 1..={total}"),
                ));
            }
        }
    }

    fn validate_ranges(
        &self,
        options: &FilterOptions,
        scope: &[&Job],
        result: &mut FilterValidationResult,
    ) {
        let total = max_steps(scope);

        for range in &options.step_ranges {
            match range {
                StepRange::Numeric { start, end } => {
                    if start > end {
                        result.push(FilterValidationError::error(
                            ValidationCode::InvalidRange,
                            range.to_string(),
                            format!("range {range} is inverted (start {start} > end {end})"),
                        ));
                    } else if *start == 0 || *end > total {
                        result.push(FilterValidationError::error(
                            ValidationCode::IndexOutOfRange,
                            range.to_string(),
                            format!("range {range} is outside 1..={total}"),
                        ));
                    }
                }
                StepRange::Named {
                    start_name,
                    end_name,
                } => self.validate_named_range(range, start_name, end_name, scope, result),
            }
        }
    }

    fn validate_named_range(
        &self,
        range: &StepRange,
        start_name: &str,
        end_name: &str,
        scope: &[&Job],
        result: &mut FilterValidationResult,
    ) {
        let all_names: Vec<&str> = scope
            .iter()
            .flat_map(|j| j.steps.iter().map(|s| s.name.as_str()))
            .collect();

        let mut endpoints_found = true;
        for endpoint in [start_name, end_name] {
            if all_names.iter().any(|n| self.matcher.matches(n, endpoint)) {
                continue;
            }
            endpoints_found = false;
            let suggestions = self
                .matcher
                .closest_matches(endpoint, all_names.iter().copied());
            result.push(
                FilterValidationError::error(
                    ValidationCode::RangeEndpointNotFound,
                    endpoint,
                    format!("range endpoint '{endpoint}' in {range} matches no step"),
                )
                .with_suggestions(suggestions),
            );
        }

        if endpoints_found && !scope.iter().any(|j| range.resolve(j, &self.matcher).is_some()) {
            result.push(FilterValidationError::error(
                ValidationCode::InvalidRange,
                range.to_string(),
                format!("range {range} does not resolve within any single job (inverted or split across jobs)"),
            ));
        }
    }

    fn count_matches(&self, options: &FilterOptions, pipeline: &Pipeline, result: &mut FilterValidationResult) {
        let filter = CompositeFilter::from_options(options, self.matcher);

        result.matched_steps = pipeline
            .jobs
            .iter()
            .flat_map(|job| {
                job.steps
                    .iter()
                    .enumerate()
                    .map(move |(i, step)| (job, i + 1, step))
            })
            .filter(|(job, position, step)| filter.should_execute(step, *position, job).should_execute)
            .count();

        if options.has_filters() && result.matched_steps == 0 {
            let examples: Vec<String> = pipeline
                .step_names()
                .take(NO_MATCH_EXAMPLES)
                .map(str::to_string)
                .collect();
            result.push(
                FilterValidationError::error(
                    ValidationCode::NoStepsMatch,
                    "",
                    "the filters select no steps at all",
                )
                .with_suggestions(examples),
            );
        }
    }
}

fn max_steps(scope: &[&Job]) -> usize {
    scope.iter().map(|j| j.steps.len()).max().unwrap_or(0)
}

// src/filter/composite.rs

use std::sync::Arc;

use crate::filter::filters::{
    JobFilter, NoOpFilter, StepExclusionFilter, StepFilter, StepIndexFilter, StepNameFilter,
    StepRangeFilter,
};
use crate::filter::matcher::StringMatcher;
use crate::filter::options::{FilterOptions, FilterResult, SkipReason};
use crate::pipeline::{Job, Step};

/// Boolean combination of the configured filters.
///
/// Precedence:
/// 1. job filter not matching the job → `JobNotSelected`
/// 2. exclusion filter matching the step → `ExplicitlySkipped`
/// 3. inclusion filters (name / index / range) configured → run iff any matches
/// 4. no inclusion filters → run
#[derive(Debug, Default)]
pub struct CompositeFilter {
    job_filter: Option<JobFilter>,
    exclusion: Option<StepExclusionFilter>,
    inclusions: Vec<Box<dyn StepFilter>>,
}

impl CompositeFilter {
    pub fn from_options(options: &FilterOptions, matcher: StringMatcher) -> Self {
        let job_filter = (!options.job_names.is_empty())
            .then(|| JobFilter::new(options.job_names.clone(), matcher));

        let exclusion = (!options.skip_steps.is_empty())
            .then(|| StepExclusionFilter::new(options.skip_steps.clone(), matcher));

        let mut inclusions: Vec<Box<dyn StepFilter>> = Vec::new();
        if !options.step_names.is_empty() {
            inclusions.push(Box::new(StepNameFilter::new(
                options.step_names.clone(),
                matcher,
            )));
        }
        if !options.step_indices.is_empty() {
            inclusions.push(Box::new(StepIndexFilter::new(
                options.step_indices.iter().copied(),
            )));
        }
        if !options.step_ranges.is_empty() {
            inclusions.push(Box::new(StepRangeFilter::new(
                options.step_ranges.clone(),
                matcher,
            )));
        }

        Self {
            job_filter,
            exclusion,
            inclusions,
        }
    }

    /// True if the job passes the job filter (or there is none).
    pub fn selects_job(&self, job: &Job) -> bool {
        self.job_filter.as_ref().is_none_or(|f| f.matches_job(job))
    }
}

impl StepFilter for CompositeFilter {
    fn should_execute(&self, step: &Step, position: usize, job: &Job) -> FilterResult {
        if let Some(job_filter) = &self.job_filter {
            let result = job_filter.should_execute(step, position, job);
            if !result.should_execute {
                return result;
            }
        }

        if let Some(exclusion) = &self.exclusion {
            let result = exclusion.should_execute(step, position, job);
            if !result.should_execute {
                return result;
            }
        }

        if self.inclusions.is_empty() {
            return FilterResult::execute("no inclusion filters configured");
        }

        self.inclusions
            .iter()
            .map(|f| f.should_execute(step, position, job))
            .find(|r| r.should_execute)
            .unwrap_or_else(|| {
                FilterResult::skip(
                    SkipReason::FilteredOut,
                    format!("'{}' (#{position}) does not match any step filter", step.name),
                )
            })
    }
}

/// Build the filter for `options`, taking the no-op fast path when nothing
/// is configured.
pub fn build_step_filter(options: &FilterOptions, matcher: StringMatcher) -> Arc<dyn StepFilter> {
    if options.has_filters() {
        Arc::new(CompositeFilter::from_options(options, matcher))
    } else {
        Arc::new(NoOpFilter)
    }
}

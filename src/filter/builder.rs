// src/filter/builder.rs

use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::DependencyAnalyzer;
use crate::filter::composite::build_step_filter;
use crate::filter::filters::StepFilter;
use crate::filter::index_parser::{IndexParseError, parse_indices, parse_range};
use crate::filter::matcher::{FuzzyMatchConfig, StringMatcher};
use crate::filter::options::FilterOptions;
use crate::filter::validator::{
    FilterValidationError, FilterValidationResult, StepFilterValidator, ValidationCode,
};
use crate::pipeline::Pipeline;

/// Everything a caller needs after assembling filters for one invocation.
#[derive(Debug, Clone)]
pub struct BuiltFilter {
    /// Options after dependency expansion.
    pub options: FilterOptions,
    pub filter: Arc<dyn StepFilter>,
    pub validation: FilterValidationResult,
}

/// Assembles [`FilterOptions`], the step filter and its validation from raw
/// (string) option input, e.g. CLI flags.
#[derive(Debug, Clone, Default)]
pub struct StepFilterBuilder {
    step_names: Vec<String>,
    index_specs: Vec<String>,
    range_specs: Vec<String>,
    skip_steps: Vec<String>,
    job_names: Vec<String>,
    include_dependencies: bool,
    preview_only: bool,
    confirm: bool,
    fuzzy: FuzzyMatchConfig,
}

impl StepFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fuzzy_config(mut self, fuzzy: FuzzyMatchConfig) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn step_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.step_names, names);
        self
    }

    /// Index specs such as `"1"`, `"1,3,5"` or `"2-5"`.
    pub fn step_indices<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_specs.extend(specs.into_iter().map(Into::into));
        self
    }

    /// Range specs such as `"2-5"`, `"2..5"` or `"Build..Test"`.
    pub fn step_ranges<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.range_specs.extend(specs.into_iter().map(Into::into));
        self
    }

    pub fn skip_steps<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.skip_steps, names);
        self
    }

    pub fn jobs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.job_names, names);
        self
    }

    pub fn include_dependencies(mut self, yes: bool) -> Self {
        self.include_dependencies = yes;
        self
    }

    pub fn preview_only(mut self, yes: bool) -> Self {
        self.preview_only = yes;
        self
    }

    pub fn confirm(mut self, yes: bool) -> Self {
        self.confirm = yes;
        self
    }

    /// Parse the raw specs. Malformed specs come back as validation errors
    /// rather than failing the whole build.
    pub fn build_options(&self) -> (FilterOptions, Vec<FilterValidationError>) {
        let mut problems = Vec::new();
        let mut options = FilterOptions {
            step_names: self.step_names.clone(),
            skip_steps: self.skip_steps.clone(),
            job_names: self.job_names.clone(),
            include_dependencies: self.include_dependencies,
            preview_only: self.preview_only,
            confirm: self.confirm,
            ..FilterOptions::default()
        };

        for spec in &self.index_specs {
            match parse_indices(spec) {
                Ok(indices) => options.step_indices.extend(indices),
                Err(err) => problems.push(spec_error(ValidationCode::InvalidIndexSpec, spec, err)),
            }
        }

        for spec in &self.range_specs {
            match parse_range(spec) {
                Ok(range) => {
                    if !options.step_ranges.contains(&range) {
                        options.step_ranges.push(range);
                    }
                }
                Err(err) => problems.push(spec_error(ValidationCode::InvalidRange, spec, err)),
            }
        }

        (options, problems)
    }

    /// Parse, expand with dependencies, validate against `pipeline` and build
    /// the filter.
    pub fn build(&self, pipeline: &Pipeline) -> BuiltFilter {
        let matcher = StringMatcher::new(self.fuzzy);
        let (options, parse_problems) = self.build_options();

        let options = DependencyAnalyzer::new(matcher).expand_with_dependencies(&options, pipeline);

        let mut validation = StepFilterValidator::new(matcher).validate(&options, pipeline);
        if !parse_problems.is_empty() {
            let mut errors = parse_problems;
            errors.append(&mut validation.errors);
            validation.errors = errors;
        }

        for warning in &validation.warnings {
            warn!(code = %warning.code, value = %warning.problematic_value, "{}", warning.message);
        }
        debug!(
            has_filters = options.has_filters(),
            status = ?validation.status(),
            "built step filter"
        );

        BuiltFilter {
            filter: build_step_filter(&options, matcher),
            options,
            validation,
        }
    }
}

fn spec_error(code: ValidationCode, spec: &str, err: IndexParseError) -> FilterValidationError {
    FilterValidationError::error(code, spec, format!("'{spec}': {err}"))
}

fn extend_unique<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item: String = item.into();
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if !target.iter().any(|t| t.eq_ignore_ascii_case(item)) {
            target.push(item.to_string());
        }
    }
}

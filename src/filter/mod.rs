// src/filter/mod.rs

//! Step selection engine.
//!
//! - [`matcher`] / [`index_parser`]: pure leaf utilities.
//! - [`options`]: the filter data model.
//! - [`filters`] / [`composite`]: predicates behind the [`StepFilter`] contract.
//! - [`validator`]: typed diagnostics against a concrete pipeline.
//! - [`builder`]: raw input → options + filter + validation.

pub mod builder;
pub mod composite;
pub mod filters;
pub mod index_parser;
pub mod matcher;
pub mod options;
pub mod validator;

pub use builder::{BuiltFilter, StepFilterBuilder};
pub use composite::{CompositeFilter, build_step_filter};
pub use filters::{
    JobFilter, NoOpFilter, StepExclusionFilter, StepFilter, StepIndexFilter, StepNameFilter,
    StepRangeFilter,
};
pub use index_parser::{IndexParseError, parse_indices, parse_range};
pub use matcher::{FuzzyMatchConfig, MatchKind, StringMatcher, levenshtein};
pub use options::{FilterOptions, FilterResult, SkipReason, StepRange};
pub use validator::{
    FilterValidationError, FilterValidationResult, Severity, StepFilterValidator,
    ValidationCode, ValidationStatus,
};

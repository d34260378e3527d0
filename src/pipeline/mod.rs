// src/pipeline/mod.rs

//! The read-only Pipeline / Job / Step model the scheduler works against.
//!
//! Parsing real CI dialects into this model happens elsewhere; the
//! [`loader`] here only reads a TOML rendition of the model so the binary is
//! usable on its own.

pub mod loader;
pub mod model;

pub use loader::{load_pipeline, parse_pipeline};
pub use model::{Job, Pipeline, Step};

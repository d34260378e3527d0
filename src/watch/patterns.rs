// src/watch/patterns.rs

//! Glob-based exclusion of watched paths.

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Directories ignored by default: VCS metadata, build output and
/// dependency caches.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".vs",
    ".idea",
    "bin",
    "obj",
    "target",
    "node_modules",
    "dist",
    "build",
    ".stepwatch",
];

/// Default exclusion globs: each directory itself and everything below it,
/// at any depth.
pub fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS
        .iter()
        .flat_map(|dir| [format!("**/{dir}"), format!("**/{dir}/**")])
        .collect()
}

/// Compiled set of exclusion globs, matched against root-relative paths
/// such as `"src/main.rs"`.
///
/// `**` matches any number of path segments; `*` and `?` never cross a `/`.
#[derive(Clone)]
pub struct ExclusionSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for ExclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusionSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl ExclusionSet {
    /// Compile `extra` patterns, optionally preceded by the defaults.
    pub fn new(extra: &[String], use_defaults: bool) -> Result<Self> {
        let mut patterns = if use_defaults {
            default_exclude_patterns()
        } else {
            Vec::new()
        };
        patterns.extend(extra.iter().cloned());

        let set = build_globset(&patterns)?;
        Ok(Self { patterns, set })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Compile a single glob with path-aware wildcard semantics.
pub fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    builder.build().context("building exclusion globset")
}

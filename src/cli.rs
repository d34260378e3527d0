// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stepwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stepwatch",
    version,
    about = "Run CI pipelines locally, a chosen subset of steps at a time, optionally re-running on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML rendition of the pipeline model).
    #[arg(long, short = 'p', value_name = "PATH")]
    pub pipeline: String,

    /// Path to the settings file (TOML).
    ///
    /// Defaults to `Stepwatch.toml` in the current directory, which may be
    /// absent. A file named here must exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Working directory handed to every step. Defaults to the pipeline's directory.
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<String>,

    /// Only run steps matching this name (exact, substring or close typo).
    #[arg(long = "step", value_name = "NAME")]
    pub steps: Vec<String>,

    /// Only run steps at these 1-based positions, e.g. "1,3-5".
    #[arg(long = "step-index", value_name = "SPEC")]
    pub step_indices: Vec<String>,

    /// Only run steps inside this range, e.g. "2-5", "2..5" or "Build..Test".
    #[arg(long = "step-range", value_name = "SPEC")]
    pub step_ranges: Vec<String>,

    /// Never run steps matching this name.
    #[arg(long = "skip-step", value_name = "NAME")]
    pub skip_steps: Vec<String>,

    /// Only run jobs with this name or id.
    #[arg(long = "job", value_name = "NAME")]
    pub jobs: Vec<String>,

    /// Also run every step the selected steps depend on.
    #[arg(long)]
    pub include_deps: bool,

    /// Print the execution plan and exit without running anything.
    #[arg(long)]
    pub preview: bool,

    /// Print the execution plan and ask for confirmation before running.
    #[arg(long)]
    pub confirm: bool,

    /// Keep running and re-execute on file changes until Ctrl-C.
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Quiet period after the last file change before re-running (milliseconds).
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub debounce_ms: Option<u64>,

    /// Extra glob patterns to ignore in watch mode (relative to the workspace).
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STEPWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_filter_flags_accumulate() {
        let args = CliArgs::try_parse_from([
            "stepwatch",
            "--pipeline",
            "ci.toml",
            "--step",
            "Build",
            "--step",
            "Test",
            "--step-index",
            "1,3-5",
            "--skip-step",
            "Deploy",
            "--include-deps",
        ])
        .unwrap();

        assert_eq!(args.steps, vec!["Build", "Test"]);
        assert_eq!(args.step_indices, vec!["1,3-5"]);
        assert_eq!(args.skip_steps, vec!["Deploy"]);
        assert!(args.include_deps);
        assert!(!args.watch);
        assert_eq!(args.config, None);
    }

    #[test]
    fn zero_debounce_is_rejected() {
        let err = CliArgs::try_parse_from(["stepwatch", "--pipeline", "ci.toml", "--debounce-ms", "0"]);
        assert!(err.is_err());

        let args =
            CliArgs::try_parse_from(["stepwatch", "--pipeline", "ci.toml", "--debounce-ms", "1"]).unwrap();
        assert_eq!(args.debounce_ms, Some(1));
    }
}

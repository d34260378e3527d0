// tests/settings_and_pipeline_loading.rs

use std::error::Error;
use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use stepwatch::config::{Settings, load_or_default, load_settings};
use stepwatch::errors::StepwatchError;
use stepwatch::pipeline::{load_pipeline, parse_pipeline};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn missing_settings_file_yields_defaults() -> TestResult {
    let dir = tempdir()?;
    let settings = load_or_default(dir.path().join("Stepwatch.toml"))?;

    assert_eq!(settings.watch.debounce(), Duration::from_millis(500));
    assert_eq!(settings.watch.shutdown_timeout(), Duration::from_secs(30));
    assert!(settings.watch.use_default_excludes);
    assert_eq!(settings.filter.match_threshold, 2);
    assert_eq!(settings.filter.suggestion_threshold, 5);
    assert_eq!(settings.filter.max_suggestions, 3);
    Ok(())
}

#[test]
fn explicitly_named_settings_file_must_exist() -> TestResult {
    let dir = tempdir()?;
    let missing = dir.path().join("typo.toml");

    let err = load_settings(Some(missing.as_path())).unwrap_err();
    assert!(matches!(err, StepwatchError::IoError(_)), "{err}");

    let present = dir.path().join("custom.toml");
    fs::write(&present, "[watch]\ndebounce_ms = 100\n")?;
    let settings = load_settings(Some(present.as_path()))?;
    assert_eq!(settings.watch.debounce(), Duration::from_millis(100));
    Ok(())
}

#[test]
fn settings_file_overrides_defaults() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Stepwatch.toml");
    fs::write(
        &path,
        r#"
[watch]
debounce_ms = 250
exclude = ["docs/**", "**/*.tmp"]
use_default_excludes = false

[filter]
match_threshold = 1
"#,
    )?;

    let settings: Settings = load_or_default(&path)?;
    assert_eq!(settings.watch.debounce_ms, 250);
    assert_eq!(settings.watch.exclude, vec!["docs/**", "**/*.tmp"]);
    assert!(!settings.watch.use_default_excludes);
    assert_eq!(settings.filter.match_threshold, 1);
    assert_eq!(settings.filter.suggestion_threshold, 5);
    Ok(())
}

#[test]
fn invalid_settings_are_rejected() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Stepwatch.toml");

    for body in [
        "[watch]\ndebounce_ms = 0\n",
        "[watch]\nshutdown_timeout_secs = 0\n",
        "[watch]\nexclude = [\"src/[\"]\n",
        "[filter]\nmax_suggestions = 0\n",
        "[filter]\nmatch_threshold = 6\nsuggestion_threshold = 5\n",
    ] {
        fs::write(&path, body)?;
        let err = load_or_default(&path).unwrap_err();
        assert!(
            matches!(err, StepwatchError::ConfigError(_)),
            "{body:?} gave {err:?}"
        );
    }

    for body in ["[watch]\ndebounce = 10\n", "[filter]\nmatch_treshold = 1\n"] {
        fs::write(&path, body)?;
        assert!(
            matches!(load_or_default(&path), Err(StepwatchError::TomlError(_))),
            "{body:?} should be rejected"
        );
    }
    Ok(())
}

#[test]
fn pipeline_file_round_trips_into_the_model() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("ci.toml");
    fs::write(
        &path,
        r#"
[[job]]
id = "build"
name = "Build and test"
env = { RUST_LOG = "debug" }

[[job.step]]
name = "Checkout"
run = "git status"

[[job.step]]
name = "Test"
run = "cargo test"
continue_on_error = true
working_directory = "crates/core"

[[job]]
id = "docs"

[[job.step]]
name = "Render"
run = "mdbook build"
"#,
    )?;

    let pipeline = load_pipeline(&path)?;
    assert_eq!(pipeline.name, "ci");
    assert_eq!(pipeline.jobs.len(), 2);
    assert_eq!(pipeline.step_count(), 3);

    let build = &pipeline.jobs[0];
    assert_eq!(build.display_name(), "Build and test");
    assert_eq!(build.env.get("RUST_LOG").map(String::as_str), Some("debug"));
    assert!(build.steps[1].continue_on_error);
    assert_eq!(build.steps[1].working_directory.as_deref(), Some("crates/core"));

    assert_eq!(pipeline.jobs[1].display_name(), "docs");
    Ok(())
}

#[test]
fn malformed_pipelines_are_rejected() {
    let cases = [
        "",
        "[[job]]\nid = \"a\"\n[[job]]\nid = \"a\"\n",
        "[[job]]\nid = \"\"\n",
        "[[job]]\nid = \"a\"\n[[job.step]]\nname = \"\"\nrun = \"true\"\n",
        "[[job]]\nid = \"a\"\n[[job.step]]\nname = \"x\"\nrun = \"  \"\n",
    ];
    for body in cases {
        assert!(
            matches!(parse_pipeline(body), Err(StepwatchError::PipelineError(_))),
            "accepted {body:?}"
        );
    }
}

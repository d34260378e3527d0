// tests/file_watcher.rs

use std::error::Error;
use std::fs;

use tempfile::tempdir;
use tokio::sync::mpsc;

use stepwatch::watch::{ChangeSource, ExclusionSet, FileWatcher, WatcherMessage};
use stepwatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn reports_relative_paths_and_skips_excluded_dirs() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    // Subdirectories exist up front so the recursive watch already covers them.
    fs::create_dir_all(dir.path().join("target/debug"))?;
    fs::create_dir_all(dir.path().join("src"))?;

    let mut watcher = FileWatcher::new(dir.path(), ExclusionSet::new(&["*.tmp".to_string()], true)?);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _guard = watcher.start(tx)?;

    fs::write(dir.path().join("target/debug/out.bin"), b"x")?;
    fs::write(dir.path().join("scratch.tmp"), b"x")?;
    fs::write(dir.path().join("src/lib.rs"), b"pub fn f() {}")?;

    let seen = with_timeout(async {
        let mut seen = Vec::new();
        while let Some(msg) = rx.recv().await {
            if let WatcherMessage::Change(change) = msg {
                let done = change.relative_path == "src/lib.rs";
                seen.push(change.relative_path);
                if done {
                    break;
                }
            }
        }
        seen
    })
    .await;

    assert!(seen.iter().all(|p| !p.starts_with("target")), "{seen:?}");
    assert!(seen.iter().all(|p| !p.ends_with(".tmp")), "{seen:?}");
    assert_eq!(seen.last().map(String::as_str), Some("src/lib.rs"));
    Ok(())
}

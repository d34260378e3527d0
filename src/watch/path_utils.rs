// src/watch/path_utils.rs

use std::path::Path;

/// Express `path` relative to `root` using `/` separators.
///
/// Tries a plain prefix strip first, then retries with both sides
/// canonicalized (macOS reports `/private/var/...` for `/var/...`).
/// Deleted files cannot be canonicalized, so the second attempt only helps
/// for paths that still exist.
///
/// Returns `None` for the root itself and for paths outside it.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            let root_canon = root.canonicalize().ok()?;
            let path_canon = path.canonicalize().ok()?;
            path_canon.strip_prefix(&root_canon).ok()?.to_path_buf()
        }
    };

    let s = rel.to_string_lossy().replace('\\', "/");
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_and_normalises_separators() {
        let root = Path::new("/work/repo");
        assert_eq!(
            relative_str(root, Path::new("/work/repo/src/lib.rs")).as_deref(),
            Some("src/lib.rs")
        );
        assert_eq!(relative_str(root, Path::new("/work/repo")), None);
        assert_eq!(relative_str(root, Path::new("/elsewhere/file")), None);
    }
}

use crate::error::{EtlError, Result};
use std::path::{Path, PathBuf};

/// Recursively find every file ending in `.{extension}` under `root`.
///
/// Paths come back absolute, in the lexicographic traversal order `glob`
/// produces. A missing or empty root yields an empty list.
pub fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "data root missing, nothing to locate");
        return Ok(Vec::new());
    }

    let root = std::path::absolute(root).map_err(|e| EtlError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{escaped}/**/*.{extension}");

    let entries = glob::glob(&pattern).map_err(|e| EtlError::Io {
        path: root.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EtlError::Io {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let files = find_files(&dir.path().join("nope"), "json").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(find_files(dir.path(), "json").unwrap().is_empty());
    }

    #[test]
    fn finds_nested_files_by_extension_only() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("A/B/C/TRAAAAW128F429D538.json"));
        touch(&dir.path().join("A/B/TRAAABD128F429CF47.json"));
        touch(&dir.path().join("top.json"));
        touch(&dir.path().join("A/notes.txt"));
        touch(&dir.path().join("A/.json.bak"));

        let files = find_files(dir.path(), "json").unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|p| p.is_absolute()));
        assert!(files.iter().all(|p| p.extension().unwrap() == "json"));
    }

    #[test]
    fn directories_named_like_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("odd.json")).unwrap();
        touch(&dir.path().join("odd.json/inner.json"));

        let files = find_files(dir.path(), "json").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("odd.json/inner.json"));
    }

    #[test]
    fn order_is_stable_across_calls() {
        let dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "sub/c.json"] {
            touch(&dir.path().join(name));
        }
        let first = find_files(dir.path(), "json").unwrap();
        let second = find_files(dir.path(), "json").unwrap();
        assert_eq!(first, second);
    }
}

//! core::metadata::discover
//!
//! Document discovery inside a version's source directory.
//!
//! A document is any file whose name ends with one of the configured
//! source suffixes. Its logical name is the path relative to the source
//! directory, `/`-separated, with the suffix removed. Hidden entries are
//! skipped, as is anything matched by an exclude pattern.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use walkdir::{DirEntry, WalkDir};

use super::MetadataError;
use crate::core::paths::to_posix;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Collect the sorted logical document names under `sourcedir`.
///
/// # Errors
///
/// Returns `InvalidPattern` for a bad exclude pattern and `ScanError` if
/// the directory cannot be walked.
pub fn discover_docnames(
    sourcedir: &Path,
    suffixes: &[String],
    exclude_patterns: &[String],
) -> Result<Vec<String>, MetadataError> {
    let excludes = exclude_patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| MetadataError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Longest suffix first so `.en.rst` wins over `.rst`
    let mut suffixes: Vec<&str> = suffixes.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();
    suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let excluded = |entry: &DirEntry| -> bool {
        let rel = relative(sourcedir, entry.path());
        !rel.is_empty() && excludes.iter().any(|p| p.matches_with(&rel, MATCH_OPTIONS))
    };

    let mut docnames = Vec::new();
    let walker = WalkDir::new(sourcedir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (!is_hidden(e) && !excluded(e)));

    for entry in walker {
        let entry = entry.map_err(|e| MetadataError::ScanError {
            path: sourcedir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative(sourcedir, entry.path());
        if let Some(name) = suffixes.iter().find_map(|s| rel.strip_suffix(s)) {
            if !name.is_empty() && !name.ends_with('/') {
                docnames.push(name.to_string());
            }
        }
    }

    docnames.sort();
    docnames.dedup();
    Ok(docnames)
}

fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).map(to_posix).unwrap_or_default()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn rst() -> Vec<String> {
        vec![".rst".to_string()]
    }

    #[test]
    fn nested_docs_use_forward_slashes() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "index.rst");
        touch(temp.path(), "appendix/faq.rst");
        touch(temp.path(), "conf.py");

        let names = discover_docnames(temp.path(), &rst(), &[]).unwrap();
        assert_eq!(names, vec!["appendix/faq", "index"]);
    }

    #[test]
    fn hidden_entries_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "index.rst");
        touch(temp.path(), ".hidden.rst");
        touch(temp.path(), ".git/notes.rst");

        let names = discover_docnames(temp.path(), &rst(), &[]).unwrap();
        assert_eq!(names, vec!["index"]);
    }

    #[test]
    fn exclude_patterns_prune_dirs_and_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "index.rst");
        touch(temp.path(), "_build/html/index.rst");
        touch(temp.path(), "drafts/a.rst");
        touch(temp.path(), "drafts/keep/b.rst");

        let names = discover_docnames(
            temp.path(),
            &rst(),
            &["_build".to_string(), "drafts/*.rst".to_string()],
        )
        .unwrap();
        assert_eq!(names, vec!["drafts/keep/b", "index"]);
    }

    #[test]
    fn multiple_suffixes() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.rst");
        touch(temp.path(), "b.md");
        touch(temp.path(), "c.txt");

        let suffixes = vec![".rst".to_string(), ".md".to_string()];
        let names = discover_docnames(temp.path(), &suffixes, &[]).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn bad_pattern_reported() {
        let temp = TempDir::new().unwrap();
        let result = discover_docnames(temp.path(), &rst(), &["[".to_string()]);
        assert!(matches!(result, Err(MetadataError::InvalidPattern { .. })));
    }

    #[test]
    fn missing_dir_is_scan_error() {
        let temp = TempDir::new().unwrap();
        let result = discover_docnames(&temp.path().join("nope"), &rst(), &[]);
        assert!(matches!(result, Err(MetadataError::ScanError { .. })));
    }
}

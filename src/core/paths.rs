//! core::paths
//!
//! Centralized path routing and path arithmetic.
//!
//! # Run Layout
//!
//! Every run owns one private temporary directory, removed when the run
//! ends:
//! - `<tmp>/<commit>/` - extracted tree for a commit (shared by refs at the
//!   same commit)
//! - `<tmp>/versions.json` - the serialized metadata table handed to each
//!   child build
//!
//! **Hard rule:** no code outside this module computes paths inside the run
//! directory. Everything goes through [`RunLayout`].
//!
//! # Path Arithmetic
//!
//! Output links are computed lexically. Nothing here touches the
//! filesystem, so results are stable for directories that do not exist
//! yet (output roots are created just before each build).
//!
//! # Example
//!
//! ```
//! use vershelf::core::paths::{common_ancestor, posix_relative, relative_components};
//! use std::path::Path;
//!
//! let a = Path::new("/build/html/master");
//! let b = Path::new("/build/html/v1/x");
//! let root = common_ancestor(a, b);
//! assert_eq!(root, Path::new("/build/html"));
//!
//! let from = relative_components(a, &root).unwrap();
//! let to = relative_components(b, &root).unwrap();
//! assert_eq!(posix_relative(&to, &from).join("/"), "../v1/x");
//! ```

use std::path::{Component, Path, PathBuf};

use crate::core::types::Oid;

/// File name of the serialized metadata table inside the run directory.
pub const METADATA_FILE_NAME: &str = "versions.json";

/// Directory name for downloadable artifacts inside a version's output root.
pub const ARTIFACTS_DIR_NAME: &str = "artifacts";

/// Path routing for one run's private temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    /// Create a layout rooted at `root` (normally a fresh temp dir).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The run directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the tree of `commit` is extracted.
    ///
    /// # Example
    ///
    /// ```
    /// use vershelf::core::paths::RunLayout;
    /// use vershelf::core::types::Oid;
    /// use std::path::PathBuf;
    ///
    /// let layout = RunLayout::new("/tmp/run");
    /// let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
    /// assert_eq!(
    ///     layout.tree_dir(&oid),
    ///     PathBuf::from("/tmp/run/abc123def4567890abc123def4567890abc12345")
    /// );
    /// ```
    pub fn tree_dir(&self, commit: &Oid) -> PathBuf {
        self.root.join(commit.as_str())
    }

    /// Where the metadata table is persisted for child builds.
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }
}

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// `..` at the root of an absolute path is dropped; leading `..` of a
/// relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Make `path` absolute against `base` and normalize it.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&base.join(path))
    }
}

/// Longest common ancestor of two normalized paths.
pub fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// Components of `path` below `base`, as strings.
///
/// Returns `None` when `base` is not an ancestor of `path`. An empty vec
/// means the two are equal.
pub fn relative_components(path: &Path, base: &Path) -> Option<Vec<String>> {
    let rest = path.strip_prefix(base).ok()?;
    Some(
        rest.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
    )
}

/// POSIX relative path between two component lists sharing one root.
///
/// This is `posixpath.relpath(target, start)` over already-split paths:
/// one `..` per unshared component of `start`, then the rest of `target`.
pub fn posix_relative(target: &[String], start: &[String]) -> Vec<String> {
    let shared = target
        .iter()
        .zip(start)
        .take_while(|(a, b)| a == b)
        .count();

    std::iter::repeat("..".to_string())
        .take(start.len() - shared)
        .chain(target[shared..].iter().cloned())
        .collect()
}

/// Split a `/`-separated logical name into its non-empty segments.
pub fn posix_segments(name: &str) -> Vec<String> {
    name.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(String::from)
        .collect()
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

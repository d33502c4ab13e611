//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! vershelf. Everything here is read-only with respect to the repository:
//! refs are enumerated, commits and tags are inspected, and trees are
//! written out to directories *outside* the repository. The index, the
//! working tree and the ref database are never touched.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`]: Commit or tree missing from the object store
//! - [`GitError::Io`]: Writing an extracted tree failed
//!
//! # Example
//!
//! ```ignore
//! use vershelf::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for entry in git.list_refs()? {
//!     println!("{} -> {}", entry.name, entry.oid.short(7));
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::core::types::{CreatorDate, Oid, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Filesystem error while extracting a tree.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file or directory being written
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn io(path: &Path) -> impl FnOnce(io::Error) -> GitError + '_ {
        move |source| GitError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
            other => GitError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Information about a Git repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Path to .git directory
    pub git_dir: PathBuf,
    /// Path to working directory (the repository top level)
    pub work_dir: PathBuf,
}

/// A ref with its name, target commit, and creation date.
///
/// Used when enumerating refs under `refs/`.
#[derive(Debug, Clone)]
pub struct RefEntry {
    /// The full ref name
    pub name: RefName,
    /// The commit the ref points to (tags are peeled)
    pub oid: Oid,
    /// Tagger date for annotated tags, committer date otherwise
    pub creator_date: CreatorDate,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// should import `git2` directly.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Get repository information (git_dir and work_dir paths).
    pub fn info(&self) -> Result<RepoInfo, GitError> {
        let git_dir = self.repo.path().to_path_buf();
        let work_dir = self.repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(RepoInfo { git_dir, work_dir })
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Get HEAD commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (new repository)
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    // =========================================================================
    // Ref Enumeration
    // =========================================================================

    /// List every direct ref under `refs/` that peels to a commit.
    ///
    /// Symbolic refs (such as `refs/remotes/origin/HEAD`), refs with
    /// non-UTF8 names, and tags pointing at trees or blobs are skipped.
    /// A ref whose date cannot be represented is skipped with a warning.
    /// Classification into heads/tags/remotes is left to the caller.
    pub fn list_refs(&self) -> Result<Vec<RefEntry>, GitError> {
        let refs = self.repo.references()?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference?;

            if reference.kind() == Some(git2::ReferenceType::Symbolic) {
                continue;
            }

            let Some(name) = reference.name() else {
                continue;
            };
            if !name.starts_with("refs/") {
                continue;
            }
            let Ok(name) = RefName::new(name) else {
                continue;
            };

            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };

            // Annotated tags carry their own creation date
            let when = match reference.peel_to_tag() {
                Ok(tag) => tag
                    .tagger()
                    .map(|sig| sig.when())
                    .unwrap_or_else(|| commit.committer().when()),
                Err(_) => commit.committer().when(),
            };

            let oid = match Oid::new(commit.id().to_string()) {
                Ok(oid) => oid,
                Err(e) => {
                    warn!(refname = %name, error = %e, "skipping ref");
                    continue;
                }
            };
            let creator_date = match CreatorDate::from_git_time(when.seconds(), when.offset_minutes()) {
                Ok(date) => date,
                Err(e) => {
                    warn!(refname = %name, error = %e, "skipping ref");
                    continue;
                }
            };

            entries.push(RefEntry {
                name,
                oid,
                creator_date,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    // =========================================================================
    // Tree Operations
    // =========================================================================

    /// Check whether `path` exists in the tree of commit `oid`.
    ///
    /// An empty path (the repository root) always exists.
    pub fn tree_has_path(&self, oid: &Oid, path: &Path) -> Result<bool, GitError> {
        let tree = self.commit_tree(oid)?;

        if path.as_os_str().is_empty() || path == Path::new(".") {
            return Ok(true);
        }

        match tree.get_path(path) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::from_git2(e, &path.display().to_string())),
        }
    }

    /// Write the full tree of commit `oid` into `dest`.
    ///
    /// `dest` is created if needed. Files are written straight from the
    /// object store, so the repository's index and working tree are left
    /// alone and nothing is hardlinked. Submodule entries are skipped.
    ///
    /// Returns the number of files written.
    pub fn extract_tree(&self, oid: &Oid, dest: &Path) -> Result<usize, GitError> {
        let tree = self.commit_tree(oid)?;
        self.write_tree(&tree, dest)
    }

    fn commit_tree(&self, oid: &Oid) -> Result<git2::Tree<'_>, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        commit
            .tree()
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn write_tree(&self, tree: &git2::Tree<'_>, dir: &Path) -> Result<usize, GitError> {
        fs::create_dir_all(dir).map_err(GitError::io(dir))?;

        let mut written = 0;
        for entry in tree.iter() {
            let Some(name) = entry.name() else {
                continue;
            };
            let path = dir.join(name);
            let id = entry.id().to_string();

            match entry.kind() {
                Some(git2::ObjectType::Tree) => {
                    let subtree = self
                        .repo
                        .find_tree(entry.id())
                        .map_err(|e| GitError::from_git2(e, &id))?;
                    written += self.write_tree(&subtree, &path)?;
                }
                Some(git2::ObjectType::Blob) => {
                    let blob = self
                        .repo
                        .find_blob(entry.id())
                        .map_err(|e| GitError::from_git2(e, &id))?;
                    write_blob(&path, blob.content(), entry.filemode())?;
                    written += 1;
                }
                _ => {}
            }
        }

        Ok(written)
    }
}

#[cfg(unix)]
fn write_blob(path: &Path, content: &[u8], mode: i32) -> Result<(), GitError> {
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::PermissionsExt;

    const MODE_EXECUTABLE: i32 = 0o100755;
    const MODE_SYMLINK: i32 = 0o120000;

    if mode == MODE_SYMLINK {
        let target = std::ffi::OsStr::from_bytes(content);
        return std::os::unix::fs::symlink(target, path).map_err(GitError::io(path));
    }

    fs::write(path, content).map_err(GitError::io(path))?;
    if mode == MODE_EXECUTABLE {
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(GitError::io(path))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn write_blob(path: &Path, content: &[u8], _mode: i32) -> Result<(), GitError> {
    // Symlinks are materialized as plain files holding the link target
    fs::write(path, content).map_err(GitError::io(path))
}

//! engine::materialize
//!
//! Extracted working trees, one per commit.
//!
//! # Invariants
//!
//! - Trees live under the run directory, never inside the repository
//! - A commit is extracted at most once per run; refs sharing a commit
//!   share the directory
//! - A failed extraction leaves no partial directory behind

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::paths::RunLayout;
use crate::core::types::Oid;
use crate::git::{Git, GitError};

/// Errors from tree extraction.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// Reading objects or writing files failed.
    #[error("failed to extract commit {commit}: {source}")]
    Extract {
        commit: String,
        #[source]
        source: GitError,
    },

    /// Removing a stale directory failed.
    #[error("failed to clear '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extracts commit trees into the run directory.
pub struct Materializer<'a> {
    git: &'a Git,
    layout: &'a RunLayout,
    extracted: HashSet<Oid>,
}

impl<'a> Materializer<'a> {
    pub fn new(git: &'a Git, layout: &'a RunLayout) -> Self {
        Self {
            git,
            layout,
            extracted: HashSet::new(),
        }
    }

    /// Return the directory holding the tree of `commit`, extracting it on
    /// first use.
    pub fn materialize(&mut self, commit: &Oid) -> Result<PathBuf, MaterializeError> {
        let dir = self.layout.tree_dir(commit);
        if self.extracted.contains(commit) {
            debug!(commit = %commit.short(7), "reusing extracted tree");
            return Ok(dir);
        }

        clear(&dir)?;
        match self.git.extract_tree(commit, &dir) {
            Ok(files) => {
                debug!(commit = %commit.short(7), files, dir = %dir.display(), "extracted tree");
                self.extracted.insert(commit.clone());
                Ok(dir)
            }
            Err(source) => {
                // Best effort; the extraction error is the one worth reporting
                let _ = fs::remove_dir_all(&dir);
                Err(MaterializeError::Extract {
                    commit: commit.to_string(),
                    source,
                })
            }
        }
    }

    /// Number of distinct commits extracted so far.
    pub fn extracted_count(&self) -> usize {
        self.extracted.len()
    }
}

fn clear(dir: &Path) -> Result<(), MaterializeError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|source| MaterializeError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

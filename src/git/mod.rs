//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. No other module should
//! import `git2`. We use the `git2` crate exclusively (no shelling out to
//! the git CLI).
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Ref enumeration with peeled commit ids and creation dates
//! - Tree inspection and extraction into private directories
//!
//! # Invariants
//!
//! - The repository is never mutated
//! - All operations return strong types (Oid, RefName, CreatorDate)

mod interface;

pub use interface::{Git, GitError, RefEntry, RepoInfo};

//! vershelf - multi-version documentation builds
//!
//! vershelf builds a project's documentation once for every matching branch
//! and tag of its git repository, each version into its own output root,
//! and lets every build link to the same page in the other versions.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Orchestrates Configure → Scan → Persist → Build
//! - [`core`] - Domain types, configuration, metadata table and path math
//! - [`git`] - Single interface for all Git operations
//! - [`nav`] - Build-time navigation between versions
//! - [`ui`] - Logging and terminal output
//!
//! # Correctness Invariants
//!
//! 1. The repository is only read, never written
//! 2. Output directories are unique across the metadata table
//! 3. Every child build sees the same immutable metadata table
//! 4. A version that cannot be prepared is skipped, a build that fails
//!    stops the run

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod nav;
pub mod ui;

//! core::metadata
//!
//! Version metadata schema and document discovery.
//!
//! # Modules
//!
//! - [`schema`] - The metadata table shared with every child build
//! - [`discover`] - Logical document names of a source directory
//!
//! # Lifecycle
//!
//! The table is assembled once per run, persisted as JSON in the run
//! directory, and read back (immutable) by whatever needs navigation data
//! during a build.
//!
//! # Example
//!
//! ```
//! use vershelf::core::metadata::MetadataTable;
//!
//! let table: MetadataTable = serde_json::from_str("{}").unwrap();
//! assert!(table.is_empty());
//! ```

pub mod discover;
pub mod schema;

pub use discover::discover_docnames;
pub use schema::{MetadataError, MetadataTable, VersionMetadata};

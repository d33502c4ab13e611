//! core
//!
//! Core domain types, schemas, and path arithmetic for vershelf.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, RefName, RefSource, CreatorDate
//! - [`refs`] - Version refs: classification, filtering, ordering
//! - [`config`] - Configuration schema, loading and overrides
//! - [`template`] - Output directory templates and define substitution
//! - [`metadata`] - Metadata table schema and document discovery
//! - [`paths`] - Run layout and lexical path math
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here spawns processes or talks to git

pub mod config;
pub mod metadata;
pub mod paths;
pub mod refs;
pub mod template;
pub mod types;

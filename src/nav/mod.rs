//! nav
//!
//! Build-time navigation between versions.
//!
//! Each child build receives the metadata table path and its own version
//! name. [`VersionInfo`] answers per-page questions against that table:
//! which versions exist, whether the current page exists in another
//! version, and the relative link to it. [`NavContext`] bundles the answers
//! for one page.
//!
//! The table is read once and never mutated; every query is recomputed
//! from it.

pub mod context;
pub mod version_info;

pub use context::NavContext;
pub use version_info::{NavError, Version, VersionInfo, DEFAULT_DATE_FORMAT};

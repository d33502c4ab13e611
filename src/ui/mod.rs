//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Verbosity, logging setup and terminal messages
//!
//! # Design
//!
//! Diagnostics go through `tracing` to stderr; stdout carries only
//! machine-readable results such as `--dump-metadata`.

pub mod output;

//! ui::output
//!
//! Logging setup and terminal messages.
//!
//! # Design
//!
//! All diagnostics are `tracing` events written to stderr. The global
//! flags pick the filter: `--debug` shows everything, `--quiet` only
//! errors, and otherwise `RUST_LOG` applies (default `info`).

use std::fmt::Display;

use tracing_subscriber::EnvFilter;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - `RUST_LOG` or info
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Filter directive used when `RUST_LOG` does not apply.
    pub fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Debug => "debug",
        }
    }
}

/// Build the log filter for a verbosity.
///
/// `RUST_LOG` is honoured only in normal mode; the explicit flags win.
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    match verbosity {
        Verbosity::Normal => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive())),
        _ => EnvFilter::new(verbosity.default_directive()),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

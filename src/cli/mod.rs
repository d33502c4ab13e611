//! cli
//!
//! Command-line interface layer for vershelf.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and split off pass-through arguments
//! - Initialize logging
//! - Delegate to [`crate::engine::run`] and map the outcome to an exit status
//!
//! # Exit Status
//!
//! | Status | Meaning                                         |
//! |--------|-------------------------------------------------|
//! | 0      | all versions built, or `--dump-metadata`        |
//! | 1      | `-C`, configuration or repository error         |
//! | 2      | no matching refs                                |
//! | other  | exit status of the failed build                 |

pub mod args;

pub use args::{split_passthrough, Cli};

use tracing::info;

use crate::core::config::Override;
use crate::engine::{self, Context, RunOutcome};
use crate::ui::output::{self, Verbosity};

/// Run the CLI application and return the process exit status.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> i32 {
    let cli = Cli::parse_args();
    output::init_tracing(Verbosity::from_flags(cli.quiet, cli.debug));
    execute(cli)
}

/// Run a parsed command line.
pub fn execute(cli: Cli) -> i32 {
    if cli.noconfig {
        output::error("-C/--no-config is not supported: a vershelf.toml is required");
        return 1;
    }

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            output::error(format!("cannot determine working directory: {e}"));
            return 1;
        }
    };

    let defines = match cli
        .define
        .iter()
        .map(|d| Override::parse(d))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(defines) => defines,
        Err(e) => {
            output::error(e);
            return 1;
        }
    };

    let ctx = Context {
        sourcedir: cli.sourcedir,
        outputdir: cli.outputdir,
        confdir: cli.confdir,
        filenames: cli.filenames,
        defines,
        passthrough: cli.passthrough,
        cwd,
        dump_metadata: cli.dump_metadata,
    };

    match engine::run(&ctx) {
        Ok(RunOutcome::Dumped { json }) => {
            println!("{json}");
            0
        }
        Ok(RunOutcome::Built { versions }) => {
            info!(versions, "all versions built");
            0
        }
        Err(e) => {
            output::error(&e);
            e.exit_code()
        }
    }
}

//! vershelf-nav - version navigation for one page, as JSON.
//!
//! Run from inside a child build: the metadata table path and the current
//! version default to the environment vershelf sets for every build.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use vershelf::core::metadata::MetadataTable;
use vershelf::nav::{NavContext, VersionInfo};
use vershelf::ui::output::{self, Verbosity};

/// Print cross-version navigation for one page
#[derive(Parser, Debug)]
#[command(name = "vershelf-nav", version, about)]
struct Args {
    /// Metadata table written by vershelf
    #[arg(long, env = "VERSHELF_METADATA_PATH", value_name = "PATH")]
    metadata: PathBuf,

    /// Version being built
    #[arg(long, env = "VERSHELF_CURRENT_VERSION", value_name = "NAME")]
    current: String,

    /// Logical name of the page being rendered
    #[arg(long, default_value = "index")]
    page: String,

    /// Version to report as the latest one
    #[arg(long, env = "VERSHELF_LATEST_VERSION", value_name = "NAME")]
    latest: Option<String>,

    /// Print only the link to this version
    #[arg(long, value_name = "NAME")]
    link: Option<String>,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,
}

fn main() {
    let args = Args::parse();
    output::init_tracing(Verbosity::from_flags(true, false));

    if let Err(e) = run(&args) {
        output::error(format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let table = MetadataTable::load(&args.metadata)
        .with_context(|| format!("failed to load '{}'", args.metadata.display()))?;

    if let Some(other) = &args.link {
        let info = VersionInfo::new(&table, &args.current, args.page.as_str())?;
        println!("{}", info.resolve_link(other)?);
        return Ok(());
    }

    let ctx = NavContext::build(&table, &args.current, &args.page, args.latest.as_deref())?;
    let json = if args.compact {
        serde_json::to_string(&ctx)?
    } else {
        serde_json::to_string_pretty(&ctx)?
    };
    println!("{json}");
    Ok(())
}

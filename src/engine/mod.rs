//! engine
//!
//! Orchestrates a run: Configure -> Scan -> Persist -> Build.
//!
//! # Architecture
//!
//! 1. **Configure**: Load and validate the HEAD configuration. Failure here
//!    is fatal; no ref is looked at.
//! 2. **Scan**: Enumerate refs, extract trees, load per-version
//!    configuration and assemble the metadata table ([`scan`]).
//! 3. **Persist**: Write the table into the run directory.
//! 4. **Build**: One child build per version and target, in table order
//!    ([`build`], [`package`]).
//!
//! # Invariants
//!
//! - Everything a run writes outside the output directory lives in one
//!   temporary directory removed when the run ends
//! - Per-version failures during the scan never abort the run
//! - The first failed build aborts the run
//!
//! # Example
//!
//! ```ignore
//! use vershelf::engine::{run, Context};
//!
//! let ctx = Context::new("docs", "build/html", std::env::current_dir()?);
//! match run(&ctx) {
//!     Ok(outcome) => println!("{outcome:?}"),
//!     Err(err) => std::process::exit(err.exit_code()),
//! }
//! ```

pub mod build;
pub mod materialize;
pub mod package;
pub mod scan;

pub use build::{build_all, BuildError, BuildPlan, Invocation};
pub use materialize::{MaterializeError, Materializer};
pub use package::{ArtifactOutcome, DownloadFormat, PackageError};
pub use scan::{scan, ScanError, ScanOptions, VersionError};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::{ConfigError, Override, ProjectConfig};
use crate::core::metadata::MetadataError;
use crate::core::paths::{absolutize, RunLayout};
use crate::git::{Git, GitError};

/// Exit status when no version survived the scan.
pub const EXIT_NO_VERSIONS: i32 = 2;

/// Options for one run, derived from the command line.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Source directory as given
    pub sourcedir: PathBuf,
    /// Output root as given
    pub outputdir: PathBuf,
    /// Configuration directory; defaults to the source directory
    pub confdir: Option<PathBuf>,
    /// Explicit file names to build
    pub filenames: Vec<String>,
    /// `-D key=value` settings
    pub defines: Vec<Override>,
    /// Arguments forwarded to the build engine
    pub passthrough: Vec<String>,
    /// Directory relative paths are resolved against
    pub cwd: PathBuf,
    /// Print the metadata table instead of building
    pub dump_metadata: bool,
}

impl Context {
    pub fn new(
        sourcedir: impl Into<PathBuf>,
        outputdir: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sourcedir: sourcedir.into(),
            outputdir: outputdir.into(),
            cwd: cwd.into(),
            ..Default::default()
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every version was built.
    Built { versions: usize },
    /// `--dump-metadata`: the table as pretty JSON, nothing built.
    Dumped { json: String },
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// HEAD configuration missing, malformed or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Repository could not be opened or read.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// Ref enumeration failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A directory given on the command line is outside the repository.
    #[error("'{}' is not inside the repository at '{}'", path.display(), root.display())]
    OutsideRepository { path: PathBuf, root: PathBuf },

    /// Filesystem failure outside any single version.
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The metadata table could not be serialized or written.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// No ref produced a version.
    #[error("no matching refs found")]
    NoVersions,

    /// A child build failed.
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl RunError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::NoVersions => EXIT_NO_VERSIONS,
            RunError::Build(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Run the whole pipeline.
pub fn run(ctx: &Context) -> Result<RunOutcome, RunError> {
    let sourcedir = canonical(&absolutize(&ctx.sourcedir, &ctx.cwd))?;
    let confdir = match &ctx.confdir {
        Some(dir) => canonical(&absolutize(dir, &ctx.cwd))?,
        None => sourcedir.clone(),
    };
    let outputdir = absolutize(&ctx.outputdir, &ctx.cwd);

    // 1. Configure
    let head = ProjectConfig::load_head(&confdir, &ctx.defines)?;
    let head_config_path = ProjectConfig::path_in(&confdir);

    let git = Git::open(&confdir)?;
    let root = canonical(&git.info()?.work_dir)?;
    let sourcedir_rel = repo_relative(&sourcedir, &root)?;
    let confdir_rel = repo_relative(&confdir, &root)?;
    let cwd_rel = canonical(&ctx.cwd)
        .ok()
        .and_then(|cwd| cwd.strip_prefix(&root).ok().map(Path::to_path_buf))
        .unwrap_or_default();
    debug!(
        root = %root.display(),
        sourcedir = %sourcedir_rel.display(),
        confdir = %confdir_rel.display(),
        cwd = %cwd_rel.display(),
        "resolved repository paths"
    );

    let run_dir = tempfile::Builder::new()
        .prefix("vershelf-")
        .tempdir()
        .map_err(|source| RunError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
    let layout = RunLayout::new(run_dir.path());

    // 2. Scan
    let table = scan(
        &git,
        &layout,
        &ScanOptions {
            settings: &head.multiversion,
            overrides: &ctx.defines,
            head_config_path: &head_config_path,
            sourcedir: &sourcedir_rel,
            confdir: &confdir_rel,
            outputdir: &outputdir,
        },
    )?;

    if ctx.dump_metadata {
        return Ok(RunOutcome::Dumped {
            json: table.to_json_pretty()?,
        });
    }
    if table.is_empty() {
        return Err(RunError::NoVersions);
    }

    // 3. Persist
    let metadata_path = layout.metadata_path();
    table.save(&metadata_path)?;
    info!(versions = table.len(), path = %metadata_path.display(), "wrote metadata table");

    // 4. Build
    let built = build_all(
        &table,
        &BuildPlan {
            command: &head.multiversion.build_command,
            passthrough: &ctx.passthrough,
            defines: &ctx.defines,
            head_confdir: &confdir,
            filenames: &ctx.filenames,
            metadata_path: &metadata_path,
            cwd_relative: &cwd_rel,
            clean_intermediate_files: head.multiversion.clean_intermediate_files,
            project: &head.project,
            latest_version: &head.multiversion.latest_version,
        },
    )?;

    Ok(RunOutcome::Built { versions: built })
}

fn canonical(path: &Path) -> Result<PathBuf, RunError> {
    fs::canonicalize(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn repo_relative(path: &Path, root: &Path) -> Result<PathBuf, RunError> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| RunError::OutsideRepository {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
}

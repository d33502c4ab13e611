//! engine::build
//!
//! One blocking build-engine process per version (and per build target).
//!
//! # Invocation
//!
//! ```text
//! <build_command...> <passthrough...>
//!     -D vershelf_metadata_path=<run>/versions.json
//!     -D <user defines, $field substituted>
//!     -D vershelf_current_version=<name>
//!     [-b <builder>] -c <HEAD confdir>
//!     <sourcedir> <outdir> <filenames...>
//! ```
//!
//! `-b` is only added for configured build targets. A plain build keeps
//! whatever builder the command or the forwarded flags select.
//!
//! The working directory is the extracted tree joined with the caller's
//! directory relative to the repository root. Every child also receives
//! the `VERSHELF_*` environment variables.
//!
//! # Failure Policy
//!
//! The first failing child stops the run and its exit status is
//! propagated. Packaging problems other than I/O errors are warnings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::package::{
    artifact_path, make_artifact, merge_dir, remove_build_dir, ArtifactOutcome, DownloadFormat,
    PackageError,
};
use crate::core::config::{BuildTarget, Override};
use crate::core::metadata::{MetadataTable, VersionMetadata};
use crate::core::template::safe_substitute;

pub const ENV_NAME: &str = "VERSHELF_NAME";
pub const ENV_VERSION: &str = "VERSHELF_VERSION";
pub const ENV_RELEASE: &str = "VERSHELF_RELEASE";
pub const ENV_SOURCEDIR: &str = "VERSHELF_SOURCEDIR";
pub const ENV_OUTPUTDIR: &str = "VERSHELF_OUTPUTDIR";
pub const ENV_CONFDIR: &str = "VERSHELF_CONFDIR";
pub const ENV_METADATA_PATH: &str = "VERSHELF_METADATA_PATH";
pub const ENV_CURRENT_VERSION: &str = "VERSHELF_CURRENT_VERSION";
pub const ENV_LATEST_VERSION: &str = "VERSHELF_LATEST_VERSION";

/// Define carrying the metadata table location.
pub const METADATA_PATH_DEFINE: &str = "vershelf_metadata_path";
/// Define carrying the name of the version being built.
pub const CURRENT_VERSION_DEFINE: &str = "vershelf_current_version";

/// Build target whose output is merged into the version's output root.
pub const HTML_TARGET: &str = "html";

/// Errors from running builds.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build command is empty")]
    EmptyCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("build of version '{name}'{} failed ({})", describe_builder(builder.as_deref()), describe_status(*code))]
    Failed {
        name: String,
        builder: Option<String>,
        code: Option<i32>,
    },

    #[error("failed to create '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("packaging failed: {0}")]
    Package(#[from] PackageError),
}

impl BuildError {
    /// Process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Failed { code, .. } => code.filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}

fn describe_builder(builder: Option<&str>) -> String {
    builder
        .map(|b| format!(" with builder '{b}'"))
        .unwrap_or_default()
}

fn describe_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Run-wide build inputs.
#[derive(Debug, Clone)]
pub struct BuildPlan<'a> {
    /// Program and leading arguments
    pub command: &'a [String],
    /// Arguments forwarded verbatim to the build engine
    pub passthrough: &'a [String],
    /// `-D` defines, substituted per version
    pub defines: &'a [Override],
    /// HEAD configuration directory passed as `-c`
    pub head_confdir: &'a Path,
    /// Explicit file names to build
    pub filenames: &'a [String],
    /// Persisted metadata table
    pub metadata_path: &'a Path,
    /// Caller's working directory relative to the repository root
    pub cwd_relative: &'a Path,
    /// Remove per-target build directories after packaging
    pub clean_intermediate_files: bool,
    /// Project name used for artifact file names
    pub project: &'a str,
    /// Version navigation treats as the latest one
    pub latest_version: &'a str,
}

/// A fully resolved child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
}

impl Invocation {
    /// Resolve the child process for one version.
    ///
    /// `builder` is passed as `-b` only for configured build targets; a
    /// plain build leaves the choice to the command and forwarded flags.
    pub fn for_version(
        entry: &VersionMetadata,
        plan: &BuildPlan<'_>,
        builder: Option<&str>,
        outdir: &Path,
    ) -> Result<Self, BuildError> {
        let (program, leading) = plan.command.split_first().ok_or(BuildError::EmptyCommand)?;

        let mut args: Vec<String> = leading.to_vec();
        args.extend(plan.passthrough.iter().cloned());
        args.push("-D".to_string());
        args.push(format!("{METADATA_PATH_DEFINE}={}", plan.metadata_path.display()));
        for define in plan.defines {
            args.push("-D".to_string());
            args.push(safe_substitute(&define.to_define(), |key| entry.field(key)));
        }
        args.push("-D".to_string());
        args.push(format!("{CURRENT_VERSION_DEFINE}={}", entry.name));
        if let Some(builder) = builder {
            args.push("-b".to_string());
            args.push(builder.to_string());
        }
        args.push("-c".to_string());
        args.push(plan.head_confdir.display().to_string());
        args.push(entry.sourcedir.display().to_string());
        args.push(outdir.display().to_string());
        args.extend(plan.filenames.iter().cloned());

        let env = vec![
            (ENV_NAME.to_string(), entry.name.clone()),
            (ENV_VERSION.to_string(), entry.version.clone()),
            (ENV_RELEASE.to_string(), entry.release.clone()),
            (ENV_SOURCEDIR.to_string(), entry.sourcedir.display().to_string()),
            (ENV_OUTPUTDIR.to_string(), entry.outputdir.display().to_string()),
            (ENV_CONFDIR.to_string(), entry.confdir.display().to_string()),
            (ENV_METADATA_PATH.to_string(), plan.metadata_path.display().to_string()),
            (ENV_CURRENT_VERSION.to_string(), entry.name.clone()),
            (ENV_LATEST_VERSION.to_string(), plan.latest_version.to_string()),
        ];

        Ok(Self {
            program: program.clone(),
            args,
            env,
            cwd: working_dir(&entry.basedir, plan.cwd_relative),
        })
    }

    /// Run the child to completion, inheriting stdio.
    fn run(&self, name: &str, builder: Option<&str>) -> Result<(), BuildError> {
        debug!(program = %self.program, args = ?self.args, cwd = %self.cwd.display(), "spawning build");

        let status = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.cwd)
            .status()
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::Failed {
                name: name.to_string(),
                builder: builder.map(String::from),
                code: status.code(),
            })
        }
    }
}

fn working_dir(basedir: &Path, cwd_relative: &Path) -> PathBuf {
    let dir = basedir.join(cwd_relative);
    if dir.is_dir() {
        dir
    } else {
        warn!(
            dir = %dir.display(),
            "working directory missing in extracted tree, using tree root"
        );
        basedir.to_path_buf()
    }
}

/// Build every version in table order. Returns the number of versions built.
pub fn build_all(table: &MetadataTable, plan: &BuildPlan<'_>) -> Result<usize, BuildError> {
    let mut built = 0;
    for entry in table {
        build_version(entry, plan)?;
        built += 1;
    }
    Ok(built)
}

/// Build one version: a single plain build, or one build per target.
pub fn build_version(entry: &VersionMetadata, plan: &BuildPlan<'_>) -> Result<(), BuildError> {
    fs::create_dir_all(&entry.outputdir).map_err(|source| BuildError::Io {
        path: entry.outputdir.clone(),
        source,
    })?;

    if entry.build_targets.is_empty() {
        info!(version = %entry.name, "building");
        return Invocation::for_version(entry, plan, None, &entry.outputdir)?.run(&entry.name, None);
    }

    for (target_name, target) in &entry.build_targets {
        let target_dir = entry.outputdir.join(target_name);
        info!(version = %entry.name, build_target = %target_name, builder = %target.builder, "building");
        Invocation::for_version(entry, plan, Some(&target.builder), &target_dir)?
            .run(&entry.name, Some(&target.builder))?;

        finish_target(entry, plan, target_name, target, &target_dir)?;
    }
    Ok(())
}

fn finish_target(
    entry: &VersionMetadata,
    plan: &BuildPlan<'_>,
    target_name: &str,
    target: &BuildTarget,
    target_dir: &Path,
) -> Result<(), BuildError> {
    if target.downloadable {
        if let Some(format) = target.download_format.as_deref() {
            let format = DownloadFormat::parse(format);
            let dest = artifact_path(&entry.outputdir, plan.project, &entry.name, &format);
            match make_artifact(target_dir, &format, &dest)? {
                ArtifactOutcome::Written(path) => {
                    info!(version = %entry.name, artifact = %path.display(), "wrote artifact")
                }
                ArtifactOutcome::Missing { format } => warn!(
                    version = %entry.name,
                    build_target = %target_name,
                    "no *.{format} artifact found, skipping download"
                ),
                ArtifactOutcome::Ambiguous { format, candidates } => warn!(
                    version = %entry.name,
                    build_target = %target_name,
                    candidates = ?candidates,
                    "several *.{format} artifacts found, skipping download"
                ),
            }
        }
    }

    if target_name.eq_ignore_ascii_case(HTML_TARGET) {
        let copied = merge_dir(target_dir, &entry.outputdir)?;
        debug!(version = %entry.name, copied, "merged html output into version root");
    }

    if plan.clean_intermediate_files {
        remove_build_dir(target_dir)?;
    }
    Ok(())
}

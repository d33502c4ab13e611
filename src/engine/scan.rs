//! engine::scan
//!
//! Version discovery: from repository refs to the metadata table.
//!
//! # Architecture
//!
//! For every candidate ref, in ref order:
//! 1. Skip it if its tree lacks the source directory
//! 2. Extract its tree into the run directory
//! 3. Load its configuration from the extracted tree
//! 4. Render its output directory and check for collisions
//! 5. Discover its documents
//!
//! # Invariants
//!
//! - Scan never mutates the repository
//! - A failure in steps 2-5 skips that ref only
//! - On an output directory collision the earlier ref wins
//! - Table order is ref order, which is also build order

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::materialize::{MaterializeError, Materializer};
use crate::core::config::{ConfigError, MultiversionSettings, Override, ProjectConfig};
use crate::core::metadata::{discover_docnames, MetadataError, MetadataTable, VersionMetadata};
use crate::core::paths::{normalize_lexically, RunLayout};
use crate::core::refs::{find_versions, VersionRef};
use crate::core::template::OutputDirTemplate;
use crate::git::{Git, GitError};

/// Errors that stop the scan as a whole.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Failed to enumerate refs.
    #[error("failed to list refs: {0}")]
    Git(#[from] GitError),

    /// Invalid multi-version settings.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Why a single ref was left out of the table.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to discover documents: {0}")]
    Discover(MetadataError),

    #[error(transparent)]
    Conflict(MetadataError),
}

/// Inputs to a scan, resolved against the repository root.
#[derive(Debug, Clone)]
pub struct ScanOptions<'a> {
    /// Multi-version settings from the HEAD configuration
    pub settings: &'a MultiversionSettings,
    /// `-D` overrides applied to every configuration load
    pub overrides: &'a [Override],
    /// HEAD configuration file, copied into trees that lack one
    pub head_config_path: &'a Path,
    /// Source directory relative to the repository root
    pub sourcedir: &'a Path,
    /// Configuration directory relative to the repository root
    pub confdir: &'a Path,
    /// Absolute output root of the whole run
    pub outputdir: &'a Path,
}

/// Build the metadata table for every eligible ref.
///
/// Returns an empty table when nothing survives; the caller decides
/// whether that is fatal.
pub fn scan(
    git: &Git,
    layout: &RunLayout,
    opts: &ScanOptions<'_>,
) -> Result<MetadataTable, ScanError> {
    let filter = opts.settings.ref_filter()?;
    let released = opts.settings.released_regex()?;
    let template = opts.settings.output_template()?;

    let refs = find_versions(git.list_refs()?, &filter, opts.settings.prefer_remote_refs);
    debug!(count = refs.len(), "candidate refs after filtering");

    let scanner = RefScanner {
        opts,
        template: &template,
    };
    let mut materializer = Materializer::new(git, layout);
    let mut table = MetadataTable::new();

    for vref in refs {
        match git.tree_has_path(&vref.commit, opts.sourcedir) {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    refname = %vref.refname,
                    sourcedir = %opts.sourcedir.display(),
                    "skipping ref without source directory"
                );
                continue;
            }
            Err(e) => {
                error!(refname = %vref.refname, error = %e, "skipping ref");
                continue;
            }
        }

        let refname = vref.refname.clone();
        let is_released = released.is_match(refname.as_str());
        match scanner.scan_ref(vref, is_released, &mut materializer, &table) {
            Ok(entry) => {
                info!(
                    name = %entry.name,
                    outputdir = %entry.outputdir.display(),
                    docs = entry.docnames.len(),
                    "found version"
                );
                if let Err(e) = table.insert(entry) {
                    warn!(refname = %refname, "{e}");
                }
            }
            Err(VersionError::Conflict(e)) => {
                warn!(refname = %refname, "skipping ref: {e}");
            }
            Err(e) => {
                error!(refname = %refname, "skipping ref: {e}");
            }
        }
    }

    debug!(
        versions = table.len(),
        trees = materializer.extracted_count(),
        "scan finished"
    );
    Ok(table)
}

struct RefScanner<'s, 'a> {
    opts: &'s ScanOptions<'a>,
    template: &'s OutputDirTemplate,
}

impl RefScanner<'_, '_> {
    fn scan_ref(
        &self,
        vref: VersionRef,
        is_released: bool,
        materializer: &mut Materializer<'_>,
        table: &MetadataTable,
    ) -> Result<VersionMetadata, VersionError> {
        let basedir = materializer.materialize(&vref.commit)?;
        let sourcedir = under(&basedir, self.opts.sourcedir);
        let confdir = under(&basedir, self.opts.confdir);

        let config =
            ProjectConfig::load_for_version(&confdir, self.opts.head_config_path, self.opts.overrides)?;
        let vref = vref.with_release_info(config.version.clone(), config.release.clone());

        let rendered = self.template.render(&vref, &config);
        let outputdir = normalize_lexically(&self.opts.outputdir.join(&rendered));
        table
            .check(&vref.name, &outputdir)
            .map_err(VersionError::Conflict)?;

        let docnames = discover_docnames(&sourcedir, &config.source_suffix, &config.exclude_patterns)
            .map_err(VersionError::Discover)?;

        Ok(VersionMetadata {
            name: vref.name,
            version: vref.version,
            release: vref.release,
            prolog: config.prolog,
            is_released,
            source: vref.source,
            creatordate: vref.creator_date,
            basedir,
            sourcedir,
            outputdir,
            confdir,
            docnames,
            build_targets: self.opts.settings.build_targets.clone(),
        })
    }
}

/// Join a repository-relative path onto an extracted tree.
fn under(base: &Path, rel: &Path) -> PathBuf {
    normalize_lexically(&base.join(rel))
}

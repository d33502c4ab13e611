//! engine::package
//!
//! Post-build handling of a target's output directory.
//!
//! - Downloadable artifacts: `zip`, `tar` and `gztar` archive the whole
//!   build directory; any other format names a file extension the builder
//!   produced (`pdf`, `epub`), which is copied when exactly one matches.
//! - Merging the canonical HTML target into the version's output root.
//! - Removing intermediate build directories.
//!
//! Missing or ambiguous artifacts are reported as [`ArtifactOutcome`]
//! values, not errors; only I/O failures are errors.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::core::paths::{to_posix, ARTIFACTS_DIR_NAME};

/// Errors from packaging.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to write zip archive '{path}': {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to walk '{path}': {message}")]
    Walk { path: PathBuf, message: String },

    #[error("invalid artifact pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

impl PackageError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> PackageError + '_ {
        move |source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of producing a downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Artifact written to this path.
    Written(PathBuf),
    /// No file with the requested extension was produced.
    Missing { format: String },
    /// More than one candidate file; nothing copied.
    Ambiguous { format: String, candidates: Vec<PathBuf> },
}

/// Supported download formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFormat {
    Zip,
    Tar,
    GzTar,
    /// A single file with this extension
    File(String),
}

impl DownloadFormat {
    pub fn parse(format: &str) -> Self {
        match format.trim() {
            "zip" => DownloadFormat::Zip,
            "tar" => DownloadFormat::Tar,
            "gztar" => DownloadFormat::GzTar,
            other => DownloadFormat::File(other.trim_start_matches('.').to_string()),
        }
    }

    /// File extension of the produced artifact, without the leading dot.
    pub fn extension(&self) -> &str {
        match self {
            DownloadFormat::Zip => "zip",
            DownloadFormat::Tar => "tar",
            DownloadFormat::GzTar => "tar.gz",
            DownloadFormat::File(ext) => ext,
        }
    }
}

/// Where the artifact of `version_name` goes.
///
/// `<outputdir>/artifacts/<project>-<version_name>.<ext>`, with `/` in the
/// version name replaced by `-`.
///
/// # Example
///
/// ```
/// use vershelf::engine::package::{artifact_path, DownloadFormat};
/// use std::path::{Path, PathBuf};
///
/// let path = artifact_path(Path::new("/out/feature/x"), "demo", "feature/x", &DownloadFormat::GzTar);
/// assert_eq!(path, PathBuf::from("/out/feature/x/artifacts/demo-feature-x.tar.gz"));
/// ```
pub fn artifact_path(
    outputdir: &Path,
    project: &str,
    version_name: &str,
    format: &DownloadFormat,
) -> PathBuf {
    let project = if project.is_empty() { "docs" } else { project };
    let stem = format!("{project}-{}", version_name.replace(['/', '\\'], "-"));
    outputdir
        .join(ARTIFACTS_DIR_NAME)
        .join(format!("{stem}.{}", format.extension()))
}

/// Produce the downloadable artifact of one target build.
pub fn make_artifact(
    build_dir: &Path,
    format: &DownloadFormat,
    dest: &Path,
) -> Result<ArtifactOutcome, PackageError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(PackageError::io(parent))?;
    }

    match format {
        DownloadFormat::Zip => write_zip(build_dir, dest)?,
        DownloadFormat::Tar => write_tar(build_dir, dest, false)?,
        DownloadFormat::GzTar => write_tar(build_dir, dest, true)?,
        DownloadFormat::File(ext) => {
            let mut candidates = find_artifacts(build_dir, ext)?;
            match candidates.len() {
                0 => {
                    return Ok(ArtifactOutcome::Missing {
                        format: ext.clone(),
                    })
                }
                1 => {
                    let src = candidates.remove(0);
                    fs::copy(&src, dest).map_err(PackageError::io(&src))?;
                }
                _ => {
                    return Ok(ArtifactOutcome::Ambiguous {
                        format: ext.clone(),
                        candidates,
                    })
                }
            }
        }
    }

    Ok(ArtifactOutcome::Written(dest.to_path_buf()))
}

/// Files under `dir` with extension `ext`, sorted.
pub fn find_artifacts(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, PackageError> {
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(ext)
    );
    let paths = glob::glob(&pattern).map_err(|e| PackageError::Pattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut found: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    found.sort();
    Ok(found)
}

/// Copy the contents of `src` into `dest`, overwriting existing files.
///
/// Returns the number of files copied.
pub fn merge_dir(src: &Path, dest: &Path) -> Result<usize, PackageError> {
    let mut copied = 0;
    for (path, rel) in walk(src)? {
        let target = dest.join(&rel);
        if path.is_dir() {
            fs::create_dir_all(&target).map_err(PackageError::io(&target))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(PackageError::io(parent))?;
            }
            fs::copy(&path, &target).map_err(PackageError::io(&path))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove an intermediate build directory if it exists.
pub fn remove_build_dir(dir: &Path) -> Result<(), PackageError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(PackageError::io(dir))?;
    }
    Ok(())
}

fn write_zip(src: &Path, dest: &Path) -> Result<(), PackageError> {
    let zip_err = |source: zip::result::ZipError| PackageError::Zip {
        path: dest.to_path_buf(),
        source,
    };

    let file = File::create(dest).map_err(PackageError::io(dest))?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (path, rel) in walk(src)? {
        let name = to_posix(&rel);
        if path.is_dir() {
            zip.add_directory(name, options).map_err(zip_err)?;
        } else {
            zip.start_file(name, options).map_err(zip_err)?;
            let mut input = File::open(&path).map_err(PackageError::io(&path))?;
            io::copy(&mut input, &mut zip).map_err(PackageError::io(dest))?;
        }
    }

    zip.finish()
        .map_err(zip_err)?
        .flush()
        .map_err(PackageError::io(dest))
}

fn write_tar(src: &Path, dest: &Path, gzip: bool) -> Result<(), PackageError> {
    let file = File::create(dest).map_err(PackageError::io(dest))?;
    if gzip {
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let encoder = append_tree(tar::Builder::new(encoder), src, dest)?;
        encoder
            .finish()
            .and_then(|mut inner| inner.flush())
            .map_err(PackageError::io(dest))
    } else {
        append_tree(tar::Builder::new(BufWriter::new(file)), src, dest)?
            .flush()
            .map_err(PackageError::io(dest))
    }
}

fn append_tree<W: Write>(
    mut builder: tar::Builder<W>,
    src: &Path,
    dest: &Path,
) -> Result<W, PackageError> {
    builder.follow_symlinks(true);
    for (path, rel) in walk(src)? {
        if path.is_dir() {
            builder
                .append_dir(&rel, &path)
                .map_err(PackageError::io(&path))?;
        } else {
            builder
                .append_path_with_name(&path, &rel)
                .map_err(PackageError::io(&path))?;
        }
    }
    builder.into_inner().map_err(PackageError::io(dest))
}

/// Every entry below `root` with its path relative to `root`, sorted.
fn walk(root: &Path) -> Result<Vec<(PathBuf, PathBuf)>, PackageError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| PackageError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .map_err(|e| PackageError::Walk {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?;
        entries.push((entry.into_path(), rel));
    }
    Ok(entries)
}

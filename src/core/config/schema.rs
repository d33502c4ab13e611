//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Project Config
//!
//! Read from `vershelf.toml` in the configuration directory. Top-level keys
//! this crate does not know are left alone; they belong to the build
//! engine.
//!
//! # Multiversion Settings
//!
//! The `[multiversion]` table drives ref selection and the build. Only the
//! HEAD configuration's table is consulted. Unknown keys are rejected so a
//! typo never silently falls back to a default.
//!
//! # Validation
//!
//! [`MultiversionSettings::validate`] compiles every pattern and template
//! once, so the run fails before any ref is enumerated.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use super::ConfigError;
use crate::core::refs::{anchored, RefFilter};
use crate::core::template::OutputDirTemplate;

/// Per-version project configuration.
///
/// # Example
///
/// ```toml
/// project = "demo"
/// version = "1.0"
/// release = "1.0.0"
/// source_suffix = [".rst", ".md"]
/// exclude_patterns = ["_build/**"]
///
/// [multiversion]
/// tag_whitelist = '^v\d+'
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used for artifact file names
    pub project: String,

    /// Short version string (`1.0`)
    pub version: String,

    /// Full release string (`1.0.0rc1`)
    pub release: String,

    /// Text prepended to every source page by the build engine
    pub prolog: String,

    /// Recognised source file suffixes
    #[serde(deserialize_with = "string_or_list")]
    pub source_suffix: Vec<String>,

    /// Glob patterns, relative to the source directory, excluded from
    /// document discovery
    pub exclude_patterns: Vec<String>,

    /// Multi-version build settings
    pub multiversion: MultiversionSettings,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            version: String::new(),
            release: String::new(),
            prolog: String::new(),
            source_suffix: vec![".rst".to_string()],
            exclude_patterns: Vec::new(),
            multiversion: MultiversionSettings::default(),
        }
    }
}

/// The `[multiversion]` table.
///
/// # Example
///
/// ```toml
/// [multiversion]
/// tag_whitelist = '^v\d+\.\d+$'
/// branch_whitelist = '^(main|stable)$'
/// remote_whitelist = '^origin$'
/// released_pattern = '^refs/tags/v.*$'
/// outputdir_format = "{ref.name}"
/// latest_version = "main"
///
/// [multiversion.build_targets.html]
/// builder = "html"
/// downloadable = true
/// download_format = "zip"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MultiversionSettings {
    /// Tags pass if unset or the tag name matches
    pub tag_whitelist: Option<String>,

    /// Branches pass if unset or the branch name matches
    pub branch_whitelist: Option<String>,

    /// Remote branches are considered only when set
    pub remote_whitelist: Option<String>,

    /// Matched against the full ref name to mark a version released
    pub released_pattern: String,

    /// Output directory template, relative to the output root
    pub outputdir_format: String,

    /// Sort remote tracking branches before local refs
    pub prefer_remote_refs: bool,

    /// Version name treated as the default comparison target
    pub latest_version: String,

    /// Program and leading arguments of the build engine
    #[serde(deserialize_with = "string_or_list")]
    pub build_command: Vec<String>,

    /// Remove per-target build directories after packaging
    pub clean_intermediate_files: bool,

    /// Named build targets; empty means one plain build per version
    pub build_targets: BTreeMap<String, BuildTarget>,
}

impl Default for MultiversionSettings {
    fn default() -> Self {
        Self {
            tag_whitelist: None,
            branch_whitelist: None,
            remote_whitelist: None,
            released_pattern: Self::DEFAULT_RELEASED_PATTERN.to_string(),
            outputdir_format: Self::DEFAULT_OUTPUTDIR_FORMAT.to_string(),
            prefer_remote_refs: false,
            latest_version: Self::DEFAULT_LATEST_VERSION.to_string(),
            build_command: vec![Self::DEFAULT_BUILD_COMMAND.to_string()],
            clean_intermediate_files: true,
            build_targets: BTreeMap::new(),
        }
    }
}

impl MultiversionSettings {
    pub const DEFAULT_RELEASED_PATTERN: &'static str = r"^refs/tags/.*$";
    pub const DEFAULT_OUTPUTDIR_FORMAT: &'static str = "{ref.name}";
    pub const DEFAULT_LATEST_VERSION: &'static str = "master";
    pub const DEFAULT_BUILD_COMMAND: &'static str = "sphinx-build";

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` for a regex that does not
    /// compile, `ConfigError::Template` for a bad output directory
    /// template, and `ConfigError::InvalidValue` for anything else.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ref_filter()?;
        self.released_regex()?;
        self.output_template()?;

        if self.build_command.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "multiversion.build_command cannot be empty".to_string(),
            ));
        }

        for (name, target) in &self.build_targets {
            target.validate(name)?;
        }

        Ok(())
    }

    /// Compile the whitelists into a ref filter.
    pub fn ref_filter(&self) -> Result<RefFilter, ConfigError> {
        for (setting, pattern) in [
            ("tag_whitelist", &self.tag_whitelist),
            ("branch_whitelist", &self.branch_whitelist),
            ("remote_whitelist", &self.remote_whitelist),
        ] {
            if let Some(pattern) = pattern {
                anchored(pattern).map_err(|source| ConfigError::InvalidPattern {
                    setting: setting.to_string(),
                    source,
                })?;
            }
        }

        RefFilter::new(
            self.tag_whitelist.as_deref(),
            self.branch_whitelist.as_deref(),
            self.remote_whitelist.as_deref(),
        )
        .map_err(|source| ConfigError::InvalidPattern {
            setting: "whitelist".to_string(),
            source,
        })
    }

    /// Compile the released pattern.
    pub fn released_regex(&self) -> Result<Regex, ConfigError> {
        anchored(&self.released_pattern).map_err(|source| ConfigError::InvalidPattern {
            setting: "released_pattern".to_string(),
            source,
        })
    }

    /// Parse the output directory template.
    pub fn output_template(&self) -> Result<OutputDirTemplate, ConfigError> {
        Ok(OutputDirTemplate::parse(&self.outputdir_format)?)
    }
}

/// One named build target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildTarget {
    /// Builder identifier passed to the engine (`html`, `latex`, ...)
    pub builder: String,

    /// Whether to produce a downloadable artifact
    #[serde(default)]
    pub downloadable: bool,

    /// `zip`, `tar`, `gztar` or the extension of a file the builder emits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_format: Option<String>,
}

impl BuildTarget {
    /// Archive formats packed directly from the build directory.
    pub const ARCHIVE_FORMATS: &'static [&'static str] = &["zip", "tar", "gztar"];

    /// Validate one target definition.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if name.trim().is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::InvalidValue(format!(
                "invalid build target name '{name}'"
            )));
        }
        if self.builder.trim().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "build target '{name}' has no builder"
            )));
        }
        if self.downloadable {
            match self.download_format.as_deref().map(str::trim) {
                None | Some("") => {
                    return Err(ConfigError::InvalidValue(format!(
                        "build target '{name}' is downloadable but has no download_format"
                    )))
                }
                Some(fmt) if fmt.contains(['/', '\\', '*']) => {
                    return Err(ConfigError::InvalidValue(format!(
                        "build target '{name}' has invalid download_format '{fmt}'"
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Whether the download format is an archive of the whole build.
    pub fn is_archive(&self) -> bool {
        self.download_format
            .as_deref()
            .is_some_and(|f| Self::ARCHIVE_FORMATS.contains(&f))
    }
}

/// Accept either a single string or a list of strings.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

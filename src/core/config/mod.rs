//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Each version's tree carries its own `vershelf.toml`. Two loads happen
//! per run:
//! - **HEAD**: the configuration directory given on the command line. Any
//!   failure here is fatal since the ref filters live in it.
//! - **Per version**: the same file inside each extracted tree. Failures
//!   skip that version only.
//!
//! # Isolation
//!
//! Loading is a pure function of the file contents and the overrides. The
//! result is an owned value and nothing is cached, so one version's
//! settings cannot leak into another's.
//!
//! # Overrides
//!
//! `-D key=value` options are applied to the parsed TOML table before
//! deserialization. Dotted keys address nested tables
//! (`multiversion.latest_version=main`). Values are coerced to the type of
//! the value they replace.
//!
//! # Example
//!
//! ```
//! use vershelf::core::config::{Override, ProjectConfig};
//!
//! let overrides = vec![Override::parse("multiversion.prefer_remote_refs=true").unwrap()];
//! let config = ProjectConfig::parse(
//!     "project = 'demo'\n[multiversion]\nprefer_remote_refs = false\n",
//!     &overrides,
//! )
//! .unwrap();
//! assert_eq!(config.project, "demo");
//! assert!(config.multiversion.prefer_remote_refs);
//! ```

pub mod schema;

pub use schema::{BuildTarget, MultiversionSettings, ProjectConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

use crate::core::template::TemplateError;

/// File name of the project configuration inside a configuration directory.
pub const CONFIG_FILE_NAME: &str = "vershelf.toml";

/// Table key holding the multi-version settings.
const MULTIVERSION_KEY: &str = "multiversion";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to copy config file to '{path}': {source}")]
    CopyError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("invalid regular expression in {setting}: {source}")]
    InvalidPattern {
        setting: String,
        source: regex::Error,
    },

    #[error("invalid override '{define}': {message}")]
    InvalidOverride { define: String, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// One `-D key=value` configuration override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Dotted key path
    pub key: String,
    /// Raw value as given on the command line
    pub value: String,
}

impl Override {
    /// Parse `key=value`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidOverride` if there is no `=` or the key
    /// is empty.
    pub fn parse(define: &str) -> Result<Self, ConfigError> {
        let (key, value) = define
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride {
                define: define.to_string(),
                message: "expected key=value".to_string(),
            })?;

        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(ConfigError::InvalidOverride {
                define: define.to_string(),
                message: "empty key".to_string(),
            });
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// The override in `key=value` form.
    pub fn to_define(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidOverride {
            define: self.to_define(),
            message: message.into(),
        }
    }
}

impl ProjectConfig {
    /// Parse configuration text and apply overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML, an override cannot
    /// be applied, or the result does not match the schema.
    pub fn parse(contents: &str, overrides: &[Override]) -> Result<Self, ConfigError> {
        Self::parse_table(Self::read_table(contents, Path::new(CONFIG_FILE_NAME))?, overrides)
            .map_err(|e| relabel(e, Path::new(CONFIG_FILE_NAME)))
    }

    /// Path of the configuration file inside `confdir`.
    pub fn path_in(confdir: &Path) -> PathBuf {
        confdir.join(CONFIG_FILE_NAME)
    }

    /// Load and validate the HEAD configuration.
    ///
    /// # Errors
    ///
    /// Any error here is fatal for the run: a missing or unreadable file, a
    /// parse failure, or invalid multi-version settings.
    pub fn load_head(confdir: &Path, overrides: &[Override]) -> Result<Self, ConfigError> {
        let path = Self::path_in(confdir);
        debug!(path = %path.display(), "loading HEAD configuration");

        let table = Self::read_file(&path)?;
        let config = Self::parse_table(table, overrides).map_err(|e| relabel(e, &path))?;
        config.multiversion.validate()?;
        Ok(config)
    }

    /// Load one version's configuration from its extracted tree.
    ///
    /// If the tree has no configuration file, `head_path` is copied into
    /// `confdir` first. The version's `[multiversion]` table is discarded;
    /// only the HEAD settings drive a run.
    ///
    /// # Errors
    ///
    /// Returns an error the caller should treat as "skip this version".
    pub fn load_for_version(
        confdir: &Path,
        head_path: &Path,
        overrides: &[Override],
    ) -> Result<Self, ConfigError> {
        let path = Self::path_in(confdir);
        if !path.is_file() {
            debug!(
                from = %head_path.display(),
                to = %path.display(),
                "tree has no configuration, using HEAD's"
            );
            fs::create_dir_all(confdir).map_err(|source| ConfigError::CopyError {
                path: path.clone(),
                source,
            })?;
            fs::copy(head_path, &path).map_err(|source| ConfigError::CopyError {
                path: path.clone(),
                source,
            })?;
        }

        let mut table = Self::read_file(&path)?;
        table.remove(MULTIVERSION_KEY);
        let overrides: Vec<Override> = overrides
            .iter()
            .filter(|o| o.key.split('.').next() != Some(MULTIVERSION_KEY))
            .cloned()
            .collect();

        Self::parse_table(table, &overrides).map_err(|e| relabel(e, &path))
    }

    fn read_file(path: &Path) -> Result<Table, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::read_table(&contents, path)
    }

    fn read_table(contents: &str, path: &Path) -> Result<Table, ConfigError> {
        contents.parse::<Table>().map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn parse_table(mut table: Table, overrides: &[Override]) -> Result<Self, ConfigError> {
        for o in overrides {
            apply_override(&mut table, o)?;
        }

        Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: PathBuf::new(),
                message: e.to_string(),
            })
    }
}

/// Fill in the file path of a schema error raised after parsing.
fn relabel(err: ConfigError, path: &Path) -> ConfigError {
    match err {
        ConfigError::ParseError { path: p, message } if p.as_os_str().is_empty() => {
            ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            }
        }
        other => other,
    }
}

/// Apply one override to a parsed table.
///
/// Intermediate tables are created as needed. The new value takes the type
/// of the value it replaces; new keys become booleans when spelled
/// `true`/`false` and strings otherwise.
pub fn apply_override(table: &mut Table, o: &Override) -> Result<(), ConfigError> {
    let mut keys: Vec<&str> = o.key.split('.').map(str::trim).collect();
    let leaf = keys.pop().ok_or_else(|| o.error("empty key"))?;

    let mut current = table;
    for key in keys {
        let entry = current
            .entry(key.to_string())
            .or_insert(Value::Table(Table::new()));
        current = match entry {
            Value::Table(t) => t,
            _ => return Err(o.error(format!("'{key}' is not a table"))),
        };
    }

    let value = coerce(current.get(leaf), &o.value).map_err(|m| o.error(m))?;
    current.insert(leaf.to_string(), value);
    Ok(())
}

fn coerce(existing: Option<&Value>, raw: &str) -> Result<Value, String> {
    match existing {
        Some(Value::Boolean(_)) => parse_bool(raw)
            .map(Value::Boolean)
            .ok_or_else(|| format!("expected a boolean, got '{raw}'")),
        Some(Value::Integer(_)) => raw
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| format!("expected an integer, got '{raw}'")),
        Some(Value::Float(_)) => raw
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| format!("expected a number, got '{raw}'")),
        Some(Value::Array(_)) => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        Some(Value::Table(_)) => Err("cannot replace a table".to_string()),
        Some(_) => Ok(Value::String(raw.to_string())),
        None => Ok(match raw {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::String(raw.to_string()),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

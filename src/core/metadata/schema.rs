//! core::metadata::schema
//!
//! The per-run metadata table.
//!
//! # Format
//!
//! Persisted as one JSON object keyed by version name, in build order:
//!
//! ```json
//! {
//!   "master": {
//!     "name": "master",
//!     "version": "0.2",
//!     "release": "0.2",
//!     "prolog": "",
//!     "is_released": false,
//!     "source": "heads",
//!     "creatordate": "2020-08-07 07:45:20 -0700",
//!     "basedir": "/tmp/.../<commit>",
//!     "sourcedir": "/tmp/.../<commit>/docs",
//!     "outputdir": "/work/build/html/master",
//!     "confdir": "/tmp/.../<commit>/docs",
//!     "docnames": ["index", "appendix/faq"],
//!     "build_targets": {}
//!   }
//! }
//! ```
//!
//! # Invariants
//!
//! - Names are unique.
//! - Output directories are unique.
//!
//! Both are enforced by [`MetadataTable::insert`]; a second entry with the
//! same name or output directory is refused and the first one stays.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::core::config::BuildTarget;
use crate::core::types::{CreatorDate, RefSource};

/// Errors from metadata operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("version '{name}' is already in the table")]
    DuplicateName { name: String },

    #[error("output directory '{}' of version '{name}' is already used by '{existing}'", outputdir.display())]
    DuplicateOutputDir {
        name: String,
        existing: String,
        outputdir: PathBuf,
    },

    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata table '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to serialize metadata table: {0}")]
    SerializeError(String),

    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to scan '{path}': {message}")]
    ScanError { path: PathBuf, message: String },
}

/// One accepted version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Version name (the ref's short name)
    pub name: String,

    /// Short version string from the version's configuration
    pub version: String,

    /// Release string from the version's configuration
    pub release: String,

    /// Prolog text from the version's configuration
    #[serde(default)]
    pub prolog: String,

    /// Whether the full ref name matched the released pattern
    pub is_released: bool,

    /// Namespace the ref came from
    pub source: RefSource,

    /// Creation date of the ref
    pub creatordate: CreatorDate,

    /// Root of the extracted tree
    pub basedir: PathBuf,

    /// Source directory inside the extracted tree
    pub sourcedir: PathBuf,

    /// Absolute output root of this version
    pub outputdir: PathBuf,

    /// Configuration directory inside the extracted tree
    pub confdir: PathBuf,

    /// Logical document names, sorted
    #[serde(default)]
    pub docnames: Vec<String>,

    /// Build targets copied from the run's settings
    #[serde(default)]
    pub build_targets: BTreeMap<String, BuildTarget>,
}

impl VersionMetadata {
    /// Whether this version came from a tag.
    pub fn is_tag(&self) -> bool {
        self.source.is_tag()
    }

    /// Whether the version has a document with this logical name.
    pub fn has_docname(&self, docname: &str) -> bool {
        self.docnames.iter().any(|d| d == docname)
    }

    /// Value of a field by its serialized name, for `$name` substitution.
    pub fn field(&self, key: &str) -> Option<String> {
        let value = match key {
            "name" => self.name.clone(),
            "version" => self.version.clone(),
            "release" => self.release.clone(),
            "prolog" => self.prolog.clone(),
            "is_released" => self.is_released.to_string(),
            "source" => self.source.to_string(),
            "creatordate" => self.creatordate.to_string(),
            "basedir" => self.basedir.display().to_string(),
            "sourcedir" => self.sourcedir.display().to_string(),
            "outputdir" => self.outputdir.display().to_string(),
            "confdir" => self.confdir.display().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// Ordered table of accepted versions.
///
/// Iteration order is insertion order, which is the build order.
///
/// # Example
///
/// ```
/// use vershelf::core::metadata::MetadataTable;
///
/// let table = MetadataTable::new();
/// assert!(table.is_empty());
/// assert_eq!(serde_json::to_string(&table).unwrap(), "{}");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    entries: Vec<VersionMetadata>,
}

impl MetadataTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version, keeping the first entry on any conflict.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` or `DuplicateOutputDir` and leaves the table
    /// unchanged.
    pub fn insert(&mut self, entry: VersionMetadata) -> Result<(), MetadataError> {
        self.check(&entry.name, &entry.outputdir)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Whether a version with this name and output directory could be added.
    pub fn check(&self, name: &str, outputdir: &Path) -> Result<(), MetadataError> {
        if let Some(existing) = self.entries.iter().find(|e| e.outputdir == outputdir) {
            return Err(MetadataError::DuplicateOutputDir {
                name: name.to_string(),
                existing: existing.name.clone(),
                outputdir: outputdir.to_path_buf(),
            });
        }
        if self.get(name).is_some() {
            return Err(MetadataError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Look up a version by name.
    pub fn get(&self, name: &str) -> Option<&VersionMetadata> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Versions in build order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionMetadata> {
        self.entries.iter()
    }

    /// Version names in build order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty JSON, as written to disk and printed by `--dump-metadata`.
    pub fn to_json_pretty(&self) -> Result<String, MetadataError> {
        serde_json::to_string_pretty(self).map_err(|e| MetadataError::SerializeError(e.to_string()))
    }

    /// Write the table to `path`.
    pub fn save(&self, path: &Path) -> Result<(), MetadataError> {
        let json = self.to_json_pretty()?;
        fs::write(path, json).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a table written by [`MetadataTable::save`].
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let json = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|e| MetadataError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl<'a> IntoIterator for &'a MetadataTable {
    type Item = &'a VersionMetadata;
    type IntoIter = std::slice::Iter<'a, VersionMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for MetadataTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetadataTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = MetadataTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of version name to version metadata")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = MetadataTable::new();
                while let Some((key, entry)) = access.next_entry::<String, VersionMetadata>()? {
                    if key != entry.name {
                        return Err(serde::de::Error::custom(format!(
                            "key '{key}' does not match version name '{}'",
                            entry.name
                        )));
                    }
                    table.insert(entry).map_err(serde::de::Error::custom)?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, outputdir: &str) -> VersionMetadata {
        VersionMetadata {
            name: name.to_string(),
            version: "0.1".to_string(),
            release: "0.1.0".to_string(),
            prolog: String::new(),
            is_released: false,
            source: RefSource::Heads,
            creatordate: "2020-08-07 07:45:20 -0700".parse().unwrap(),
            basedir: PathBuf::from("/tmp/run/abc"),
            sourcedir: PathBuf::from("/tmp/run/abc/docs"),
            outputdir: PathBuf::from(outputdir),
            confdir: PathBuf::from("/tmp/run/abc/docs"),
            docnames: vec!["appendix/faq".to_string(), "index".to_string()],
            build_targets: BTreeMap::new(),
        }
    }

    mod table {
        use super::*;

        #[test]
        fn first_entry_wins_on_outputdir_collision() {
            let mut table = MetadataTable::new();
            table.insert(entry("main", "/out/x")).unwrap();
            let err = table.insert(entry("other", "/out/x")).unwrap_err();
            assert!(matches!(
                err,
                MetadataError::DuplicateOutputDir { ref existing, .. } if existing == "main"
            ));
            assert_eq!(table.len(), 1);
            assert_eq!(table.names().collect::<Vec<_>>(), vec!["main"]);
        }

        #[test]
        fn duplicate_name_rejected() {
            let mut table = MetadataTable::new();
            table.insert(entry("main", "/out/heads/main")).unwrap();
            let err = table.insert(entry("main", "/out/remotes/origin/main")).unwrap_err();
            assert!(matches!(err, MetadataError::DuplicateName { .. }));
        }

        #[test]
        fn preserves_insertion_order() {
            let mut table = MetadataTable::new();
            for name in ["zeta", "alpha", "mid"] {
                table.insert(entry(name, &format!("/out/{name}"))).unwrap();
            }
            assert_eq!(table.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        }
    }

    mod json {
        use super::*;

        #[test]
        fn keyed_by_name_in_order() {
            let mut table = MetadataTable::new();
            table.insert(entry("zeta", "/out/zeta")).unwrap();
            table.insert(entry("alpha", "/out/alpha")).unwrap();

            let json = table.to_json_pretty().unwrap();
            assert!(json.find("\"zeta\"").unwrap() < json.find("\"alpha\"").unwrap());

            let back: MetadataTable = serde_json::from_str(&json).unwrap();
            assert_eq!(back, table);
        }

        #[test]
        fn source_and_date_serialized_as_strings() {
            let mut table = MetadataTable::new();
            let mut e = entry("origin-main", "/out/o");
            e.source = RefSource::Remote("origin".to_string());
            table.insert(e).unwrap();

            let value: serde_json::Value = serde_json::to_value(&table).unwrap();
            assert_eq!(value["origin-main"]["source"], "remotes/origin");
            assert_eq!(value["origin-main"]["creatordate"], "2020-08-07 07:45:20 -0700");
        }

        #[test]
        fn mismatched_key_rejected() {
            let json = serde_json::to_string(&serde_json::json!({
                "wrong": serde_json::to_value(entry("main", "/out/main")).unwrap()
            }))
            .unwrap();
            assert!(serde_json::from_str::<MetadataTable>(&json).is_err());
        }

        #[test]
        fn save_and_load() {
            let temp = tempfile::TempDir::new().unwrap();
            let path = temp.path().join("versions.json");
            let mut table = MetadataTable::new();
            table.insert(entry("main", "/out/main")).unwrap();
            table.save(&path).unwrap();
            assert_eq!(MetadataTable::load(&path).unwrap(), table);
        }
    }

    mod fields {
        use super::*;

        #[test]
        fn lookup_by_serialized_name() {
            let e = entry("main", "/out/main");
            assert_eq!(e.field("name").as_deref(), Some("main"));
            assert_eq!(e.field("is_released").as_deref(), Some("false"));
            assert_eq!(e.field("source").as_deref(), Some("heads"));
            assert_eq!(e.field("outputdir").as_deref(), Some("/out/main"));
            assert_eq!(e.field("docnames"), None);
        }

        #[test]
        fn has_docname() {
            let e = entry("main", "/out/main");
            assert!(e.has_docname("appendix/faq"));
            assert!(!e.has_docname("appendix"));
        }
    }
}

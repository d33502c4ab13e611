//! nav::version_info
//!
//! Cross-version navigation for one page of one version's build.
//!
//! # Link Resolution
//!
//! Links are relative URLs from the page being rendered to the same page in
//! another version, or to that version's `index.html` when the page does
//! not exist there. Both output roots are expressed below their common
//! ancestor, so the result is correct for any nesting depth:
//!
//! ```text
//! /build/html/master/appendix/faq.html  ->  ../../v0.1.0/appendix/faq.html
//! /build/html/master/testpage.html      ->  ../v0.1.0/index.html
//! ```
//!
//! # Invariants
//!
//! - `tags` and `branches` partition the table by source
//! - `releases` and `in_development` partition the table by `is_released`
//! - A link to the current version never has a directory component

use serde::Serialize;
use thiserror::Error;

use crate::core::metadata::{MetadataTable, VersionMetadata};
use crate::core::paths::{common_ancestor, posix_relative, posix_segments, relative_components};
use crate::core::types::{CreatorDate, RefSource};

/// Default pattern for [`Version::format_date`].
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from navigation queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("unknown version '{name}'")]
    UnknownVersion { name: String },
}

/// Presentation view of one version, relative to the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub name: String,
    /// Link from the current page to this version
    pub url: String,
    pub version: String,
    pub release: String,
    pub is_released: bool,
    pub source: RefSource,
    pub creatordate: CreatorDate,
}

impl Version {
    /// Creation date rendered with a strftime pattern.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(version.format_date(None), "2020-08-07");
    /// assert_eq!(version.format_date(Some("%d.%m.%Y")), "07.08.2020");
    /// ```
    pub fn format_date(&self, fmt: Option<&str>) -> String {
        self.creatordate.format(fmt.unwrap_or(DEFAULT_DATE_FORMAT))
    }
}

/// Navigation state for one build: the table, the version being built and
/// the page being rendered.
#[derive(Debug, Clone)]
pub struct VersionInfo<'a> {
    table: &'a MetadataTable,
    current: &'a VersionMetadata,
    page: String,
}

impl<'a> VersionInfo<'a> {
    /// Create navigation state for `current`, rendering `page`.
    pub fn new(
        table: &'a MetadataTable,
        current: &str,
        page: impl Into<String>,
    ) -> Result<Self, NavError> {
        let current = lookup(table, current)?;
        Ok(Self {
            table,
            current,
            page: page.into(),
        })
    }

    /// Move on to the next rendered page.
    pub fn set_page(&mut self, page: impl Into<String>) {
        self.page = page.into();
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn current_name(&self) -> &str {
        &self.current.name
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Versions built from tags.
    pub fn tags(&self) -> Vec<Version> {
        self.select(|v| v.is_tag())
    }

    /// Versions built from local or remote branches.
    pub fn branches(&self) -> Vec<Version> {
        self.select(|v| !v.is_tag())
    }

    pub fn releases(&self) -> Vec<Version> {
        self.select(|v| v.is_released)
    }

    pub fn in_development(&self) -> Vec<Version> {
        self.select(|v| !v.is_released)
    }

    /// All versions: tags first, then branches.
    pub fn versions(&self) -> Vec<Version> {
        let mut all = self.tags();
        all.extend(self.branches());
        all
    }

    /// One version by name, or `None` if it is not in the table.
    pub fn get(&self, name: &str) -> Option<Version> {
        self.table.get(name).map(|entry| self.view(entry))
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Whether the current page exists in `other`.
    pub fn has_doc(&self, other: &str) -> Result<bool, NavError> {
        let entry = lookup(self.table, other)?;
        Ok(self.has_doc_in(entry))
    }

    /// Relative URL from the current page to its counterpart in `other`.
    pub fn resolve_link(&self, other: &str) -> Result<String, NavError> {
        let entry = lookup(self.table, other)?;
        Ok(self.link_to(entry))
    }

    fn has_doc_in(&self, entry: &VersionMetadata) -> bool {
        entry.name == self.current.name || entry.has_docname(&self.page)
    }

    fn link_to(&self, entry: &VersionMetadata) -> String {
        let page = posix_segments(&self.page);

        if entry.name == self.current.name {
            let last = page.last().map(String::as_str).unwrap_or_default();
            return format!("{last}.html");
        }

        let root = common_ancestor(&self.current.outputdir, &entry.outputdir);
        let current_root = relative_components(&self.current.outputdir, &root).unwrap_or_default();
        let other_root = relative_components(&entry.outputdir, &root).unwrap_or_default();

        let mut page_dir = current_root;
        page_dir.extend(page.iter().take(page.len().saturating_sub(1)).cloned());

        let mut parts = posix_relative(&other_root, &page_dir);
        if self.has_doc_in(entry) {
            parts.extend(page);
            if let Some(last) = parts.last_mut() {
                last.push_str(".html");
            }
        } else {
            parts.push("index.html".to_string());
        }
        parts.join("/")
    }

    fn select(&self, keep: impl Fn(&VersionMetadata) -> bool) -> Vec<Version> {
        self.table
            .iter()
            .filter(|entry| keep(entry))
            .map(|entry| self.view(entry))
            .collect()
    }

    fn view(&self, entry: &VersionMetadata) -> Version {
        Version {
            name: entry.name.clone(),
            url: self.link_to(entry),
            version: entry.version.clone(),
            release: entry.release.clone(),
            is_released: entry.is_released,
            source: entry.source.clone(),
            creatordate: entry.creatordate,
        }
    }
}

fn lookup<'t>(table: &'t MetadataTable, name: &str) -> Result<&'t VersionMetadata, NavError> {
    table.get(name).ok_or_else(|| NavError::UnknownVersion {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn entry(
        name: &str,
        release: &str,
        is_released: bool,
        source: RefSource,
        outputdir: &str,
        docnames: &[&str],
    ) -> VersionMetadata {
        VersionMetadata {
            name: name.to_string(),
            version: String::new(),
            release: release.to_string(),
            prolog: String::new(),
            is_released,
            source,
            creatordate: "2020-08-07 07:45:20 -0700".parse().unwrap(),
            basedir: PathBuf::from("/tmp").join(name),
            sourcedir: PathBuf::from("/tmp").join(name).join("docs"),
            outputdir: PathBuf::from(outputdir),
            confdir: PathBuf::from("/tmp").join(name).join("docs"),
            docnames: docnames.iter().map(|s| s.to_string()).collect(),
            build_targets: BTreeMap::new(),
        }
    }

    fn table() -> MetadataTable {
        let mut table = MetadataTable::new();
        table
            .insert(entry(
                "master",
                "0.2",
                false,
                RefSource::Heads,
                "/tmp/build/html/master",
                &["testpage", "appendix/faq"],
            ))
            .unwrap();
        table
            .insert(entry(
                "v0.1.0",
                "0.1.0",
                true,
                RefSource::Tags,
                "/tmp/build/html/v0.1.0",
                &["old_testpage", "appendix/faq"],
            ))
            .unwrap();
        table
            .insert(entry(
                "branch-with/slash",
                "0.1.1",
                false,
                RefSource::Heads,
                "/tmp/build/html/branch-with/slash",
                &["testpage"],
            ))
            .unwrap();
        table
    }

    fn names(versions: Vec<Version>) -> Vec<String> {
        versions.into_iter().map(|v| v.name).collect()
    }

    mod collections {
        use super::*;

        #[test]
        fn tags_and_branches() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert_eq!(names(info.tags()), vec!["v0.1.0"]);
            assert_eq!(names(info.branches()), vec!["master", "branch-with/slash"]);
        }

        #[test]
        fn releases_and_in_development() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert_eq!(names(info.releases()), vec!["v0.1.0"]);
            assert_eq!(
                names(info.in_development()),
                vec!["master", "branch-with/slash"]
            );
        }

        #[test]
        fn versions_lists_tags_first() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert_eq!(
                names(info.versions()),
                vec!["v0.1.0", "master", "branch-with/slash"]
            );
        }

        #[test]
        fn remote_branches_count_as_branches() {
            let mut table = table();
            table
                .insert(entry(
                    "feature",
                    "0.3",
                    false,
                    RefSource::Remote("origin".to_string()),
                    "/tmp/build/html/feature",
                    &[],
                ))
                .unwrap();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert!(names(info.branches()).contains(&"feature".to_string()));
        }

        #[test]
        fn get_known_and_unknown() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            let v = info.get("v0.1.0").unwrap();
            assert_eq!(v.release, "0.1.0");
            assert_eq!(v.url, "../v0.1.0/index.html");
            assert!(info.get("nope").is_none());
        }

        #[test]
        fn unknown_current_version() {
            let table = table();
            assert_eq!(
                VersionInfo::new(&table, "nope", "testpage").unwrap_err(),
                NavError::UnknownVersion {
                    name: "nope".to_string()
                }
            );
        }
    }

    mod has_doc {
        use super::*;

        #[test]
        fn top_level_page() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert!(info.has_doc("master").unwrap());
            assert!(!info.has_doc("v0.1.0").unwrap());
            assert!(info.has_doc("branch-with/slash").unwrap());
        }

        #[test]
        fn nested_page() {
            let table = table();
            let mut info = VersionInfo::new(&table, "master", "testpage").unwrap();
            info.set_page("appendix/faq");
            assert!(info.has_doc("master").unwrap());
            assert!(info.has_doc("v0.1.0").unwrap());
            assert!(!info.has_doc("branch-with/slash").unwrap());
        }

        #[test]
        fn current_version_always_has_page() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "not-a-page").unwrap();
            assert!(info.has_doc("master").unwrap());
        }
    }

    mod links {
        use super::*;

        #[test]
        fn from_top_level_page() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert_eq!(info.resolve_link("master").unwrap(), "testpage.html");
            assert_eq!(info.resolve_link("v0.1.0").unwrap(), "../v0.1.0/index.html");
            assert_eq!(
                info.resolve_link("branch-with/slash").unwrap(),
                "../branch-with/slash/testpage.html"
            );
        }

        #[test]
        fn from_nested_page() {
            let table = table();
            let mut info = VersionInfo::new(&table, "master", "testpage").unwrap();
            info.set_page("appendix/faq");
            assert_eq!(info.resolve_link("master").unwrap(), "faq.html");
            assert_eq!(
                info.resolve_link("v0.1.0").unwrap(),
                "../../v0.1.0/appendix/faq.html"
            );
            assert_eq!(
                info.resolve_link("branch-with/slash").unwrap(),
                "../../branch-with/slash/index.html"
            );
        }

        #[test]
        fn from_deeper_output_root() {
            let table = table();
            let info = VersionInfo::new(&table, "branch-with/slash", "testpage").unwrap();
            assert_eq!(info.resolve_link("master").unwrap(), "../../master/testpage.html");
        }

        #[test]
        fn into_nested_output_root() {
            let mut table = MetadataTable::new();
            table
                .insert(entry("root", "1", false, RefSource::Heads, "/out", &["index"]))
                .unwrap();
            table
                .insert(entry("child", "1", true, RefSource::Tags, "/out/old/child", &["index"]))
                .unwrap();
            let info = VersionInfo::new(&table, "root", "index").unwrap();
            assert_eq!(info.resolve_link("child").unwrap(), "old/child/index.html");

            let back = VersionInfo::new(&table, "child", "index").unwrap();
            assert_eq!(back.resolve_link("root").unwrap(), "../../index.html");
        }

        #[test]
        fn unknown_target() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            assert!(matches!(
                info.resolve_link("nope"),
                Err(NavError::UnknownVersion { .. })
            ));
        }
    }

    mod dates {
        use super::*;

        #[test]
        fn format_date_default_and_custom() {
            let table = table();
            let info = VersionInfo::new(&table, "master", "testpage").unwrap();
            let v = info.get("master").unwrap();
            assert_eq!(v.format_date(None), "2020-08-07");
            assert_eq!(v.format_date(Some("%d.%m.%Y %H:%M")), "07.08.2020 07:45");
        }
    }
}

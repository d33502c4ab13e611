//! nav::context
//!
//! The navigation context handed to page templates.
//!
//! One context is computed per rendered page. It is plain data so that a
//! build-engine plugin can consume it as JSON from `vershelf-nav`.

use std::collections::BTreeMap;

use serde::Serialize;

use super::version_info::{NavError, Version, VersionInfo};
use crate::core::metadata::MetadataTable;

/// Everything a template needs to render version navigation for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavContext {
    pub page: String,
    pub current: Version,
    /// The configured latest version, if it was built
    pub latest: Option<Version>,
    pub versions: Vec<Version>,
    pub tags: Vec<Version>,
    pub branches: Vec<Version>,
    pub releases: Vec<Version>,
    pub in_development: Vec<Version>,
    /// Whether the page exists in each version
    pub has_doc: BTreeMap<String, bool>,
}

impl NavContext {
    /// Compute the context for `page` of version `current`.
    pub fn build(
        table: &MetadataTable,
        current: &str,
        page: &str,
        latest: Option<&str>,
    ) -> Result<Self, NavError> {
        let info = VersionInfo::new(table, current, page)?;
        Self::from_info(&info, latest)
    }

    /// Compute the context from existing navigation state.
    pub fn from_info(info: &VersionInfo<'_>, latest: Option<&str>) -> Result<Self, NavError> {
        let current = info
            .get(info.current_name())
            .ok_or_else(|| NavError::UnknownVersion {
                name: info.current_name().to_string(),
            })?;

        let versions = info.versions();
        let mut has_doc = BTreeMap::new();
        for version in &versions {
            has_doc.insert(version.name.clone(), info.has_doc(&version.name)?);
        }

        Ok(Self {
            page: info.page().to_string(),
            current,
            latest: latest.and_then(|name| info.get(name)),
            tags: info.tags(),
            branches: info.branches(),
            releases: info.releases(),
            in_development: info.in_development(),
            versions,
            has_doc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::VersionMetadata;
    use crate::core::types::RefSource;
    use std::path::PathBuf;

    fn table() -> MetadataTable {
        let mut table = MetadataTable::new();
        for (name, source, released, docs) in [
            ("main", RefSource::Heads, false, vec!["index", "guide"]),
            ("v1.0", RefSource::Tags, true, vec!["index"]),
        ] {
            table
                .insert(VersionMetadata {
                    name: name.to_string(),
                    version: "1".to_string(),
                    release: "1.0".to_string(),
                    prolog: String::new(),
                    is_released: released,
                    source,
                    creatordate: "2021-01-02 03:04:05 +0000".parse().unwrap(),
                    basedir: PathBuf::from("/tmp/run").join(name),
                    sourcedir: PathBuf::from("/tmp/run").join(name),
                    outputdir: PathBuf::from("/out").join(name),
                    confdir: PathBuf::from("/tmp/run").join(name),
                    docnames: docs.into_iter().map(String::from).collect(),
                    build_targets: Default::default(),
                })
                .unwrap();
        }
        table
    }

    #[test]
    fn context_for_page() {
        let table = table();
        let ctx = NavContext::build(&table, "main", "guide", Some("v1.0")).unwrap();

        assert_eq!(ctx.current.name, "main");
        assert_eq!(ctx.current.url, "guide.html");
        assert_eq!(ctx.latest.as_ref().map(|v| v.url.as_str()), Some("../v1.0/index.html"));
        assert_eq!(ctx.versions.len(), 2);
        assert_eq!(ctx.versions[0].name, "v1.0");
        assert_eq!(ctx.has_doc.get("main"), Some(&true));
        assert_eq!(ctx.has_doc.get("v1.0"), Some(&false));
    }

    #[test]
    fn missing_latest_is_none() {
        let table = table();
        let ctx = NavContext::build(&table, "main", "index", Some("master")).unwrap();
        assert!(ctx.latest.is_none());
    }

    #[test]
    fn serializes_as_json() {
        let table = table();
        let ctx = NavContext::build(&table, "v1.0", "index", None).unwrap();
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["current"]["source"], "tags");
        assert_eq!(value["current"]["creatordate"], "2021-01-02 03:04:05 +0000");
        assert_eq!(value["versions"][1]["url"], "../main/index.html");
        assert!(value["latest"].is_null());
    }
}

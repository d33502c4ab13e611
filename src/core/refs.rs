//! core::refs
//!
//! Turning the repository's refs into an ordered list of candidate versions.
//!
//! # Classification
//!
//! - `refs/heads/<name>` is a local branch
//! - `refs/tags/<name>` is a tag
//! - `refs/remotes/<remote>/<name>` is a remote tracking branch of `<remote>`
//!
//! Anything else is ignored.
//!
//! # Filtering
//!
//! Whitelists are regular expressions matched at the start of the name.
//! - tags pass if no tag whitelist is set or the tag name matches it
//! - branches pass if no branch whitelist is set or the branch name matches
//! - remote branches pass only if a remote whitelist is set, the remote
//!   name matches it, and the branch rule above holds for the short name
//!
//! # Ordering
//!
//! The ordering decides which version wins an output directory collision
//! (first seen wins), so it is total and deterministic.

use std::cmp::Ordering;

use regex::Regex;

use crate::core::types::{CreatorDate, Oid, RefName, RefSource};
use crate::git::RefEntry;

/// One discovered ref that may become a documentation version.
///
/// `version` and `release` stay empty until the ref's configuration has
/// been read; see [`VersionRef::with_release_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRef {
    /// Short name (`main`, `v1.0`, `feature/x`)
    pub name: String,
    /// Commit the ref points to
    pub commit: Oid,
    /// Namespace the ref was found in
    pub source: RefSource,
    /// Whether this is a remote tracking branch
    pub is_remote: bool,
    /// Fully qualified ref name
    pub refname: RefName,
    /// Creation date of the ref's commit or annotated tag
    pub creator_date: CreatorDate,
    /// Version string from the ref's configuration
    pub version: String,
    /// Release string from the ref's configuration
    pub release: String,
}

impl VersionRef {
    /// Classify a raw ref entry. Returns `None` for unsupported namespaces.
    pub fn from_entry(entry: &RefEntry) -> Option<Self> {
        let source = entry.name.source()?;
        let name = entry.name.short_name()?.to_string();
        Some(Self {
            name,
            commit: entry.oid.clone(),
            is_remote: source.is_remote(),
            source,
            refname: entry.name.clone(),
            creator_date: entry.creator_date,
            version: String::new(),
            release: String::new(),
        })
    }

    /// Attach the version and release read from this ref's configuration.
    pub fn with_release_info(self, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release: release.into(),
            ..self
        }
    }

    fn tuple_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.commit.cmp(&other.commit))
            .then_with(|| self.source.to_string().cmp(&other.source.to_string()))
            .then_with(|| self.refname.cmp(&other.refname))
            .then_with(|| self.creator_date.cmp(&other.creator_date))
    }
}

/// Compile a whitelist pattern so it matches at the start of the input.
pub fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Name-based ref filter built from the whitelist settings.
#[derive(Debug, Clone, Default)]
pub struct RefFilter {
    tag_whitelist: Option<Regex>,
    branch_whitelist: Option<Regex>,
    remote_whitelist: Option<Regex>,
}

impl RefFilter {
    /// Compile the three whitelists. `None` means "not configured".
    pub fn new(
        tag_whitelist: Option<&str>,
        branch_whitelist: Option<&str>,
        remote_whitelist: Option<&str>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            tag_whitelist: tag_whitelist.map(anchored).transpose()?,
            branch_whitelist: branch_whitelist.map(anchored).transpose()?,
            remote_whitelist: remote_whitelist.map(anchored).transpose()?,
        })
    }

    /// Whether a classified ref passes the whitelist policy.
    pub fn accepts(&self, vref: &VersionRef) -> bool {
        match &vref.source {
            RefSource::Tags => Self::passes(&self.tag_whitelist, &vref.name),
            RefSource::Heads => Self::passes(&self.branch_whitelist, &vref.name),
            RefSource::Remote(remote) => match &self.remote_whitelist {
                Some(re) => {
                    re.is_match(remote) && Self::passes(&self.branch_whitelist, &vref.name)
                }
                None => false,
            },
        }
    }

    fn passes(whitelist: &Option<Regex>, name: &str) -> bool {
        whitelist.as_ref().map_or(true, |re| re.is_match(name))
    }
}

/// Sort candidates so the preferred ref of each name comes first.
///
/// With `prefer_remote` remote tracking branches sort before local refs,
/// otherwise local refs come first. Ties fall back to
/// `(name, commit, source, refname, creator_date)`.
pub fn sort_refs(refs: &mut [VersionRef], prefer_remote: bool) {
    refs.sort_by(|a, b| {
        let rank = |r: &VersionRef| if prefer_remote { !r.is_remote } else { r.is_remote };
        rank(a).cmp(&rank(b)).then_with(|| a.tuple_cmp(b))
    });
}

/// Classify, filter and order raw ref entries.
pub fn find_versions<I>(entries: I, filter: &RefFilter, prefer_remote: bool) -> Vec<VersionRef>
where
    I: IntoIterator<Item = RefEntry>,
{
    let mut refs: Vec<VersionRef> = entries
        .into_iter()
        .filter_map(|entry| VersionRef::from_entry(&entry))
        .filter(|vref| filter.accepts(vref))
        .collect();
    sort_refs(&mut refs, prefer_remote);
    refs
}

//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Fully qualified Git reference name
//! - [`RefSource`] - Where a ref lives: local heads, tags, or a remote
//! - [`CreatorDate`] - Commit/tagger timestamp with its UTC offset
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use vershelf::core::types::{Oid, RefName, RefSource};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::new("refs/tags/v1.0").unwrap();
//! assert_eq!(refname.source(), Some(RefSource::Tags));
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(RefName::new("heads/main").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid ref source: {0}")]
    InvalidRefSource(String),

    #[error("invalid creator date '{0}'")]
    InvalidDate(String),
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use vershelf::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// If `len` exceeds the OID length, returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully qualified Git reference name (`refs/...`).
///
/// # Example
///
/// ```
/// use vershelf::core::types::{RefName, RefSource};
///
/// let refname = RefName::new("refs/remotes/origin/feature/x").unwrap();
/// assert_eq!(refname.source(), Some(RefSource::Remote("origin".into())));
/// assert_eq!(refname.short_name(), Some("feature/x"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name is not under `refs/`
    /// or contains whitespace or control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if !name.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' must start with 'refs/'"
            )));
        }
        if name.ends_with('/') || name.contains("//") {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' has an empty path component"
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' contains whitespace or control characters"
            )));
        }
        Ok(Self(name))
    }

    /// Classify this ref by namespace.
    ///
    /// Returns `None` for refs outside `refs/heads/`, `refs/tags/` and
    /// `refs/remotes/<remote>/` (notes, stashes, custom namespaces).
    pub fn source(&self) -> Option<RefSource> {
        self.split().map(|(source, _)| source)
    }

    /// The short name below the namespace (`main`, `v1.0`, `feature/x`).
    pub fn short_name(&self) -> Option<&str> {
        self.split().map(|(_, name)| name)
    }

    fn split(&self) -> Option<(RefSource, &str)> {
        let rest = self.0.strip_prefix("refs/")?;
        if let Some(name) = rest.strip_prefix("heads/") {
            return Some((RefSource::Heads, name));
        }
        if let Some(name) = rest.strip_prefix("tags/") {
            return Some((RefSource::Tags, name));
        }
        let rest = rest.strip_prefix("remotes/")?;
        let (remote, name) = rest.split_once('/')?;
        if remote.is_empty() || name.is_empty() {
            return None;
        }
        Some((RefSource::Remote(remote.to_string()), name))
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The namespace a version ref was discovered in.
///
/// Serialized as `heads`, `tags` or `remotes/<remote>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefSource {
    /// Local branch (`refs/heads/`)
    Heads,
    /// Tag (`refs/tags/`)
    Tags,
    /// Remote tracking branch (`refs/remotes/<remote>/`)
    Remote(String),
}

impl RefSource {
    /// Whether this is a tag.
    pub fn is_tag(&self) -> bool {
        matches!(self, RefSource::Tags)
    }

    /// Whether this is a remote tracking branch.
    pub fn is_remote(&self) -> bool {
        matches!(self, RefSource::Remote(_))
    }

    /// The remote name, for remote tracking branches.
    pub fn remote(&self) -> Option<&str> {
        match self {
            RefSource::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}

impl fmt::Display for RefSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefSource::Heads => write!(f, "heads"),
            RefSource::Tags => write!(f, "tags"),
            RefSource::Remote(remote) => write!(f, "remotes/{remote}"),
        }
    }
}

impl FromStr for RefSource {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heads" => Ok(RefSource::Heads),
            "tags" => Ok(RefSource::Tags),
            _ => match s.strip_prefix("remotes/") {
                Some(remote) if !remote.is_empty() && !remote.contains('/') => {
                    Ok(RefSource::Remote(remote.to_string()))
                }
                _ => Err(TypeError::InvalidRefSource(s.to_string())),
            },
        }
    }
}

impl Serialize for RefSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RefSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Timestamp of the commit (or annotated tag) that created a ref.
///
/// Keeps the author's UTC offset so dates render the way `git log` shows
/// them. Serialized as `%Y-%m-%d %H:%M:%S %z`.
///
/// # Example
///
/// ```
/// use vershelf::core::types::CreatorDate;
///
/// let date: CreatorDate = "2020-08-07 07:45:20 -0700".parse().unwrap();
/// assert_eq!(date.format("%Y-%m-%d"), "2020-08-07");
/// assert_eq!(date.to_string(), "2020-08-07 07:45:20 -0700");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatorDate(DateTime<FixedOffset>);

impl CreatorDate {
    /// Serialization format, shared with the build engine side.
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S %z";

    /// Build from a Unix timestamp and an offset in minutes, as git stores it.
    pub fn from_git_time(seconds: i64, offset_minutes: i32) -> Result<Self, TypeError> {
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| TypeError::InvalidDate(format!("offset {offset_minutes}")))?;
        let utc = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| TypeError::InvalidDate(format!("timestamp {seconds}")))?;
        Ok(Self(utc.with_timezone(&offset)))
    }

    /// Format with a strftime-style pattern.
    pub fn format(&self, fmt: &str) -> String {
        self.0.format(fmt).to_string()
    }
}

impl fmt::Display for CreatorDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for CreatorDate {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| TypeError::InvalidDate(s.to_string()))
    }
}

impl Serialize for CreatorDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CreatorDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

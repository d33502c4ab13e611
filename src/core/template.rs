//! core::template
//!
//! The two small template languages used by a run.
//!
//! - [`OutputDirTemplate`]: `{ref.name}`-style placeholders naming a
//!   version's output directory. Parsed once at configuration load so an
//!   unknown field is a configuration error rather than a per-version one.
//! - [`safe_substitute`]: `$name` / `${name}` placeholders in `-D` values,
//!   expanded per version. Unknown names are left untouched.

use std::fmt;

use thiserror::Error;

use crate::core::config::ProjectConfig;
use crate::core::refs::VersionRef;

/// Errors from parsing an output directory template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown field '{field}' in output directory template '{template}'")]
    UnknownField { template: String, field: String },

    #[error("unbalanced brace at byte {position} in output directory template '{template}'")]
    UnbalancedBrace { template: String, position: usize },

    #[error("output directory template is empty")]
    Empty,
}

/// A field of the version ref usable in the output directory template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefField {
    Name,
    Commit,
    Source,
    IsRemote,
    Refname,
    CreatorDate,
    Version,
    Release,
}

/// A field of the version's configuration usable in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Project,
    Version,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Ref(RefField),
    Config(ConfigField),
}

/// Parsed output directory template, e.g. `{ref.source}/{ref.name}`.
///
/// `{{` and `}}` produce literal braces.
///
/// # Example
///
/// ```
/// use vershelf::core::template::OutputDirTemplate;
///
/// assert!(OutputDirTemplate::parse("{ref.name}").is_ok());
/// assert!(OutputDirTemplate::parse("v{config.release}").is_ok());
/// assert!(OutputDirTemplate::parse("{ref.colour}").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirTemplate {
    source: String,
    parts: Vec<Part>,
}

impl OutputDirTemplate {
    /// Parse a template, rejecting unknown fields and stray braces.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        if template.trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace {
                            template: template.to_string(),
                            position: pos,
                        });
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Self::parse_field(template, field.trim())?);
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        template: template.to_string(),
                        position: pos,
                    });
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            parts,
        })
    }

    fn parse_field(template: &str, field: &str) -> Result<Part, TemplateError> {
        let part = match field {
            "ref.name" => Part::Ref(RefField::Name),
            "ref.commit" => Part::Ref(RefField::Commit),
            "ref.source" => Part::Ref(RefField::Source),
            "ref.is_remote" => Part::Ref(RefField::IsRemote),
            "ref.refname" => Part::Ref(RefField::Refname),
            "ref.creatordate" => Part::Ref(RefField::CreatorDate),
            "ref.version" => Part::Ref(RefField::Version),
            "ref.release" => Part::Ref(RefField::Release),
            "config.project" => Part::Config(ConfigField::Project),
            "config.version" => Part::Config(ConfigField::Version),
            "config.release" => Part::Config(ConfigField::Release),
            _ => {
                return Err(TemplateError::UnknownField {
                    template: template.to_string(),
                    field: field.to_string(),
                })
            }
        };
        Ok(part)
    }

    /// Render the output directory (relative to the run's output root).
    pub fn render(&self, vref: &VersionRef, config: &ProjectConfig) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Ref(field) => out.push_str(&match field {
                    RefField::Name => vref.name.clone(),
                    RefField::Commit => vref.commit.to_string(),
                    RefField::Source => vref.source.to_string(),
                    RefField::IsRemote => vref.is_remote.to_string(),
                    RefField::Refname => vref.refname.to_string(),
                    RefField::CreatorDate => vref.creator_date.to_string(),
                    RefField::Version => vref.version.clone(),
                    RefField::Release => vref.release.clone(),
                }),
                Part::Config(field) => out.push_str(match field {
                    ConfigField::Project => &config.project,
                    ConfigField::Version => &config.version,
                    ConfigField::Release => &config.release,
                }),
            }
        }
        out
    }

    /// The template text as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for OutputDirTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Expand `$name` and `${name}` placeholders; `$$` is a literal `$`.
///
/// Placeholders `lookup` does not know, and `$` signs not followed by an
/// identifier, are copied through unchanged.
///
/// # Example
///
/// ```
/// use vershelf::core::template::safe_substitute;
///
/// let lookup = |key: &str| (key == "name").then(|| "v1.0".to_string());
/// assert_eq!(safe_substitute("html_title=Docs ${name}", lookup), "html_title=Docs v1.0");
/// assert_eq!(safe_substitute("x=$unknown", lookup), "x=$unknown");
/// assert_eq!(safe_substitute("cost=$$5", lookup), "cost=$5");
/// ```
pub fn safe_substitute<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                let ident = &braced[..end];
                if is_identifier(ident) {
                    if let Some(value) = lookup(ident) {
                        out.push_str(&value);
                        rest = &braced[end + 1..];
                        continue;
                    }
                }
            }
            out.push('$');
            rest = after;
            continue;
        }

        let ident_len = identifier_prefix_len(after);
        if ident_len > 0 {
            if let Some(value) = lookup(&after[..ident_len]) {
                out.push_str(&value);
                rest = &after[ident_len..];
                continue;
            }
        }

        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}

fn identifier_prefix_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let ok = if i == 0 {
            c == '_' || c.is_ascii_alphabetic()
        } else {
            c == '_' || c.is_ascii_alphanumeric()
        };
        if !ok {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_prefix_len(s) == s.len()
}

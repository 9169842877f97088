//! Qualifier tags and canonical qualifier sets.
//!
//! Qualifiers tell apart several bindings of the same type, e.g.
//! `@Config("db-url") String` vs `@Config("admin-email") String`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::trace;

use scopegen_support::idents::{is_valid_payload, payload_identifier};

use crate::error::{CompileError, Result};

/// Marker tag that requests a generated curried factory.
pub const AUTO_FACTORY: &str = "AutoFactory";

/// A single qualifier: a bare marker or a named tag with a string payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualifierTag {
    /// Identified by its own type name, e.g. `@Primary`.
    Marker { tag: String },
    /// Carries one payload, e.g. `@Config("db-url")`.
    Named { tag: String, payload: String },
}

impl QualifierTag {
    pub fn marker(tag: impl Into<String>) -> Self {
        Self::Marker { tag: tag.into() }
    }

    /// Creates a named tag.
    ///
    /// # Errors
    /// [`CompileError::InvalidQualifierPayload`] if the payload uses
    /// characters outside `[a-zA-Z0-9-]`.
    pub fn named(tag: impl Into<String>, payload: impl Into<String>) -> Result<Self> {
        let named = Self::Named {
            tag: tag.into(),
            payload: payload.into(),
        };
        named.validate()?;
        Ok(named)
    }

    /// The `@AutoFactory` marker.
    pub fn auto_factory() -> Self {
        Self::marker(AUTO_FACTORY)
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Marker { tag } | Self::Named { tag, .. } => tag,
        }
    }

    /// Identifier-safe text: `Tag` or `Tag_payload`.
    pub fn identifier(&self) -> String {
        match self {
            Self::Marker { tag } => tag.clone(),
            Self::Named { tag, payload } => format!("{tag}_{}", payload_identifier(payload)),
        }
    }

    /// Source-like declaration: `@Tag` or `@Tag("payload")`.
    pub fn declaration(&self) -> String {
        match self {
            Self::Marker { tag } => format!("@{tag}"),
            Self::Named { tag, payload } => format!("@{tag}(\"{payload}\")"),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Named { tag, payload } if !is_valid_payload(payload) => {
                Err(CompileError::InvalidQualifierPayload {
                    tag: tag.clone(),
                    payload: payload.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// An immutable, deduplicated, canonically ordered set of qualifier tags.
///
/// Tags are sorted by identifier, so the order they were supplied in never
/// changes equality:
///
/// ```
/// use scopegen_compiler::qualifier::{QualifierSet, QualifierTag};
///
/// let a = QualifierSet::from_markers(["Primary", "Remote"]);
/// let b = QualifierSet::from_markers(["Remote", "Primary", "Remote"]);
/// assert_eq!(a, b);
/// assert_eq!(a.identifiers(), vec!["Primary", "Remote"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<QualifierTag>", into = "Vec<QualifierTag>")]
pub struct QualifierSet {
    tags: Vec<QualifierTag>,
}

impl QualifierSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a canonical set from any tags.
    ///
    /// # Errors
    /// [`CompileError::InvalidQualifierPayload`] for a malformed named tag.
    pub fn new(tags: impl IntoIterator<Item = QualifierTag>) -> Result<Self> {
        let mut tags: Vec<QualifierTag> = tags.into_iter().collect();
        for tag in &tags {
            tag.validate()?;
        }
        tags.sort_by_cached_key(QualifierTag::identifier);
        tags.dedup_by(|a, b| a.identifier() == b.identifier());
        trace!(count = tags.len(), "Canonicalized qualifier set");
        Ok(Self { tags })
    }

    /// Builds a set of bare markers. Markers cannot be malformed.
    pub fn from_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<QualifierTag> = markers.into_iter().map(QualifierTag::marker).collect();
        tags.sort_by_cached_key(QualifierTag::identifier);
        tags.dedup_by(|a, b| a.identifier() == b.identifier());
        Self { tags }
    }

    /// Returns a copy of this set with one more tag.
    pub fn with(&self, tag: QualifierTag) -> Result<Self> {
        Self::new(self.tags.iter().cloned().chain(std::iter::once(tag)))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QualifierTag> {
        self.tags.iter()
    }

    /// Returns `true` if any tag (marker or named) has this tag name.
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.tag() == tag)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.tags.iter().map(QualifierTag::identifier).collect()
    }

    pub fn declarations(&self) -> Vec<String> {
        self.tags.iter().map(QualifierTag::declaration).collect()
    }
}

// Equality, hashing and ordering go through the identifier list only.
impl PartialEq for QualifierSet {
    fn eq(&self, other: &Self) -> bool {
        self.identifiers() == other.identifiers()
    }
}

impl Eq for QualifierSet {}

impl Hash for QualifierSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifiers().hash(state);
    }
}

impl PartialOrd for QualifierSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifierSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identifiers().cmp(&other.identifiers())
    }
}

impl TryFrom<Vec<QualifierTag>> for QualifierSet {
    type Error = CompileError;

    fn try_from(tags: Vec<QualifierTag>) -> Result<Self> {
        Self::new(tags)
    }
}

impl From<QualifierSet> for Vec<QualifierTag> {
    fn from(set: QualifierSet) -> Self {
        set.tags
    }
}

impl fmt::Display for QualifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declarations().join(" "))
    }
}

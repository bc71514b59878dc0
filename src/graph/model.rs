//! Core data types for the content graph.
//!
//! A node is one of three kinds: an entity backed by a real source document,
//! a virtual placeholder for a referenced-but-nonexistent document, or a tag
//! facet. Kind-specific fields only exist on the relevant variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id prefix for tag nodes. A tag `rust` becomes the node id `tags/rust`.
pub const TAG_PREFIX: &str = "tags/";

/// Extension stripped when deriving a node id from a document path.
const DOC_EXTENSION: &str = ".md";

/// Derive a node id from a document's canonical relative path.
#[must_use]
pub fn doc_id(relative_path: &str) -> String {
    relative_path
        .strip_suffix(DOC_EXTENSION)
        .unwrap_or(relative_path)
        .to_string()
}

/// Expected on-disk relative path for an entity id.
#[must_use]
pub fn entity_path(id: &str) -> String {
    format!("{id}{DOC_EXTENSION}")
}

/// Node id for a tag facet.
#[must_use]
pub fn tag_node_id(tag: &str) -> String {
    format!("{TAG_PREFIX}{tag}")
}

/// Node kind discriminant, as persisted in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Entity,
    Virtual,
    Tag,
}

impl NodeKind {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Virtual => "virtual",
            Self::Tag => "tag",
        }
    }

    /// Parse the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entity" => Some(Self::Entity),
            "virtual" => Some(Self::Virtual),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// Document dates carried on entity nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dates {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
}

impl Dates {
    /// True when no date is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.created.is_none() && self.modified.is_none() && self.published.is_none()
    }
}

/// A node in the content graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Backed by a real, currently-existing source document.
    Entity {
        id: String,
        /// Modification time of the backing document, in Unix milliseconds.
        mtime_ms: i64,
        frontmatter: Option<serde_json::Value>,
        dates: Dates,
    },
    /// Placeholder for a referenced-but-nonexistent document.
    Virtual { id: String },
    /// A tag facet; always an edge target.
    Tag { id: String },
}

impl Node {
    /// Create an entity node with no metadata yet.
    #[must_use]
    pub const fn entity(id: String, mtime_ms: i64) -> Self {
        Self::Entity {
            id,
            mtime_ms,
            frontmatter: None,
            dates: Dates {
                created: None,
                modified: None,
                published: None,
            },
        }
    }

    /// The node's stable id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Entity { id, .. } | Self::Virtual { id } | Self::Tag { id } => id,
        }
    }

    /// The node's kind discriminant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Entity { .. } => NodeKind::Entity,
            Self::Virtual { .. } => NodeKind::Virtual,
            Self::Tag { .. } => NodeKind::Tag,
        }
    }
}

/// Edge kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// A document-to-document link.
    Link,
    /// A document-to-tag declaration. Always targets a tag node.
    Tag,
}

impl EdgeKind {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Tag => "tag",
        }
    }

    /// Parse the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "link" => Some(Self::Link),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// A directed edge, unique per (source, target, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl Edge {
    /// Create a link edge.
    #[must_use]
    pub fn link(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Link,
        }
    }

    /// Create a tag edge.
    #[must_use]
    pub fn tag(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Tag,
        }
    }
}

/// Graph statistics for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub entity_count: i64,
    pub virtual_count: i64,
    pub tag_count: i64,
    pub edge_count: i64,
}

impl GraphStats {
    /// Total node count across all kinds.
    #[must_use]
    pub const fn node_count(&self) -> i64 {
        self.entity_count + self.virtual_count + self.tag_count
    }
}

/// A parsed source document, as produced by the parser seam.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Canonical relative path within the content root (posix separators).
    pub relative_path: String,

    /// Parsed frontmatter, if the document has any.
    pub frontmatter: Option<serde_json::Value>,

    /// Document dates from frontmatter.
    pub dates: Dates,

    /// Outgoing link target ids, in document order, deduplicated.
    pub links: Vec<String>,

    /// Declared tags (bare names, no prefix).
    pub tags: Vec<String>,

    /// Document body, frontmatter stripped.
    pub body: String,
}

impl Document {
    /// Node id derived from the document path.
    #[must_use]
    pub fn id(&self) -> String {
        doc_id(&self.relative_path)
    }
}

/// Reconstructed logical unit handed to output stages.
///
/// A record with an empty `body` means "metadata only, no re-render needed",
/// never "empty document".
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub frontmatter: Option<serde_json::Value>,
    pub dates: Dates,
    pub links: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip)]
    pub body: String,
}

impl ContentRecord {
    /// True when this record was synthesized from cached metadata and
    /// carries no body to render.
    #[must_use]
    pub fn is_metadata_only(&self) -> bool {
        self.body.is_empty()
    }

    /// Build a record from a freshly parsed document.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        let id = doc.id();
        let title = title_from_frontmatter(doc.frontmatter.as_ref()).unwrap_or_else(|| id.clone());
        Self {
            slug: id.clone(),
            id,
            title,
            frontmatter: doc.frontmatter.clone(),
            dates: doc.dates.clone(),
            links: doc.links.clone(),
            tags: doc.tags.clone(),
            body: doc.body.clone(),
        }
    }
}

/// Extract a `title` string from frontmatter, if present.
#[must_use]
pub fn title_from_frontmatter(frontmatter: Option<&serde_json::Value>) -> Option<String> {
    frontmatter?
        .get("title")
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}

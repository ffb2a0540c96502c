//! Node storage for the index arena.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a node inside one [`Index`](crate::Index).
///
/// Handles are slot numbers in the index's node arena. They stay valid for
/// the lifetime of the index because nodes are never removed or moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    /// The arena slot this handle refers to.
    pub fn slot(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a node is a document or a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Container node; may hold documents and pages. Unit of "version".
    Document,
    /// Content node; should only hold pages.
    Page,
}

impl NodeKind {
    /// Element name used in the persisted XML.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Document => "doc",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Page => write!(f, "page"),
        }
    }
}

/// A document or page in the index tree.
///
/// Nodes are owned by the index arena and only ever reached through a
/// [`NodeHandle`]. The parent link is a plain handle used for navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) ids: Vec<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) title: String,
    pub(crate) content_id: String,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeHandle>) -> Self {
        Self {
            kind,
            ids: Vec::new(),
            tags: Vec::new(),
            title: String::new(),
            content_id: String::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_page(&self) -> bool {
        self.kind == NodeKind::Page
    }

    pub fn is_document(&self) -> bool {
        self.kind == NodeKind::Document
    }

    /// All ids, primary first.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The primary id, used to build canonical addresses.
    pub fn primary_id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    /// Ids after the first; they link the node to other versions.
    pub fn secondary_ids(&self) -> &[String] {
        self.ids.get(1..).unwrap_or(&[])
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Object id of the node's own body, if any.
    pub fn content_id(&self) -> Option<&str> {
        if self.content_id.is_empty() {
            None
        } else {
            Some(&self.content_id)
        }
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

/// Split a comma-separated list, trimming each entry and dropping empties.
pub(crate) fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

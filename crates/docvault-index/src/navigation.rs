//! Navigation and address queries over an [`Index`].
//!
//! Addresses are `/`-joined primary ids from the first level below the root
//! down to a node. Lookups are more lenient than address construction: at a
//! document level any of the document's ids may be used, which lets a reader
//! enter a version through an alias such as `current`.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{IndexError, IndexResult};
use crate::index::Index;
use crate::node::{NodeHandle, NodeKind};

/// Result of a successful address lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddressMatch {
    pub node: NodeHandle,
    /// The id used to enter the innermost document on the path, or empty
    /// if the path never crossed a document.
    pub doc_id: String,
}

/// Role of a node relative to the one navigation was computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationRole {
    Up,
    DirectPrevious,
    DirectNext,
    IndirectPrevious,
    IndirectNext,
}

impl NavigationRole {
    pub const ALL: [NavigationRole; 5] = [
        Self::Up,
        Self::DirectPrevious,
        Self::DirectNext,
        Self::IndirectPrevious,
        Self::IndirectNext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::DirectPrevious => "direct-previous",
            Self::DirectNext => "direct-next",
            Self::IndirectPrevious => "indirect-previous",
            Self::IndirectNext => "indirect-next",
        }
    }
}

/// Neighbours of a node for previous/next/up navigation.
///
/// `direct_*` are siblings. `indirect_*` follow pre-order, so they step into
/// children and out to ancestors' siblings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NavigationContext {
    pub up: Option<NodeHandle>,
    pub direct_previous: Option<NodeHandle>,
    pub direct_next: Option<NodeHandle>,
    pub indirect_previous: Option<NodeHandle>,
    pub indirect_next: Option<NodeHandle>,
}

impl NavigationContext {
    pub fn get(&self, role: NavigationRole) -> Option<NodeHandle> {
        match role {
            NavigationRole::Up => self.up,
            NavigationRole::DirectPrevious => self.direct_previous,
            NavigationRole::DirectNext => self.direct_next,
            NavigationRole::IndirectPrevious => self.indirect_previous,
            NavigationRole::IndirectNext => self.indirect_next,
        }
    }

    /// The present neighbours, tagged with their role.
    pub fn entries(&self) -> impl Iterator<Item = (NavigationRole, NodeHandle)> + '_ {
        NavigationRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|h| (role, h)))
    }
}

/// Another version of a node, together with the document holding it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RelatedVersion {
    pub node: NodeHandle,
    pub document: NodeHandle,
}

impl Index {
    /// Path from the root down to the node's parent, root included.
    /// Empty for the root itself.
    pub fn node_parents(&self, node: NodeHandle) -> Vec<NodeHandle> {
        let mut parents = Vec::new();
        let mut current = self.node(node).and_then(|n| n.parent());
        while let Some(parent) = current {
            parents.push(parent);
            current = self.at(parent).parent();
        }
        parents.reverse();
        parents
    }

    /// Position of the node in its parent's child list.
    pub fn node_parent_index(&self, node: NodeHandle) -> Option<usize> {
        let parent = self.node(node)?.parent()?;
        self.at(parent).children().iter().position(|&c| c == node)
    }

    /// Nearest document at or above the node.
    pub fn containing_document(&self, node: NodeHandle) -> Option<NodeHandle> {
        let mut current = Some(node);
        while let Some(handle) = current {
            let n = self.node(handle)?;
            if n.is_document() {
                return Some(handle);
            }
            current = n.parent();
        }
        None
    }

    /// Canonical address of `node`.
    ///
    /// When the node's containing document also carries `preferred_doc_id`,
    /// that id replaces the document's primary id in the path. The root's
    /// address is the empty string.
    pub fn node_address(&self, node: NodeHandle, preferred_doc_id: &str) -> String {
        if self.node(node).is_none() || node == self.root() {
            return String::new();
        }
        let doc = self
            .containing_document(node)
            .filter(|&d| !preferred_doc_id.is_empty() && self.at(d).has_id(preferred_doc_id));

        let mut path = self.node_parents(node);
        path.push(node);
        let mut segments: Vec<&str> = Vec::with_capacity(path.len());
        for &h in path.iter().skip(1) {
            if Some(h) == doc {
                segments.push(preferred_doc_id);
            } else {
                segments.push(self.at(h).primary_id().unwrap_or_default());
            }
        }
        segments.join("/")
    }

    /// Walk `address` segment by segment from the root.
    ///
    /// Documents match on any of their ids, pages only on their primary id.
    /// Returns `None` for the empty address or when a segment has no match.
    pub fn find_node_by_address(&self, address: &str) -> Option<AddressMatch> {
        if address.is_empty() {
            return None;
        }
        let mut current = self.root();
        let mut doc_id = String::new();
        for segment in address.split('/') {
            if segment.is_empty() {
                return None;
            }
            let next = self.at(current).children().iter().copied().find(|&c| {
                let child = self.at(c);
                match child.kind() {
                    NodeKind::Document => child.has_id(segment),
                    NodeKind::Page => child.primary_id() == Some(segment),
                }
            })?;
            if self.at(next).is_document() {
                doc_id = segment.to_string();
            }
            current = next;
        }
        Some(AddressMatch {
            node: current,
            doc_id,
        })
    }

    /// Like [`find_node_by_address`](Self::find_node_by_address), but a miss
    /// is an [`IndexError::AddressNotFound`].
    pub fn resolve_address(&self, address: &str) -> IndexResult<AddressMatch> {
        self.find_node_by_address(address)
            .ok_or_else(|| IndexError::AddressNotFound(address.to_string()))
    }

    pub fn navigation_context(&self, node: NodeHandle) -> NavigationContext {
        let Some(n) = self.node(node) else {
            return NavigationContext::default();
        };
        let up = n.parent();
        let direct_previous = self.sibling(node, -1);
        let direct_next = self.sibling(node, 1);

        let indirect_next = n.children().first().copied().or_else(|| {
            let mut current = node;
            loop {
                if let Some(next) = self.sibling(current, 1) {
                    return Some(next);
                }
                current = self.at(current).parent()?;
            }
        });
        let indirect_previous = direct_previous
            .map(|prev| self.deepest_last_descendant(prev))
            .or(up);

        NavigationContext {
            up,
            direct_previous,
            direct_next,
            indirect_previous,
            indirect_next,
        }
    }

    fn sibling(&self, node: NodeHandle, step: isize) -> Option<NodeHandle> {
        let parent = self.node(node)?.parent()?;
        let position = self.node_parent_index(node)?;
        let target = position.checked_add_signed(step)?;
        self.at(parent).children().get(target).copied()
    }

    fn deepest_last_descendant(&self, node: NodeHandle) -> NodeHandle {
        let mut current = node;
        while let Some(&last) = self.at(current).children().last() {
            current = last;
        }
        current
    }

    /// Descendants of `node` in pre-order, each tagged with its depth below
    /// `node` (1 = direct child), down to `max_depth`.
    ///
    /// Unless `across_documents` is set, child documents are listed but not
    /// descended into.
    pub fn node_children(
        &self,
        node: NodeHandle,
        max_depth: usize,
        across_documents: bool,
    ) -> Vec<(usize, NodeHandle)> {
        let mut out = Vec::new();
        if self.node(node).is_some() {
            self.collect_children(node, 1, max_depth, across_documents, &mut out);
        }
        out
    }

    fn collect_children(
        &self,
        node: NodeHandle,
        depth: usize,
        max_depth: usize,
        across_documents: bool,
        out: &mut Vec<(usize, NodeHandle)>,
    ) {
        if depth > max_depth {
            return;
        }
        for &child in self.at(node).children() {
            out.push((depth, child));
            if across_documents || !self.at(child).is_document() {
                self.collect_children(child, depth + 1, max_depth, across_documents, out);
            }
        }
    }

    /// The same logical node in every document that declares one of its ids.
    ///
    /// Candidates are nodes of the same kind sharing at least one id with
    /// `node`, ordered by the tree position of their containing document.
    /// When nothing but `node` itself matches, a page yields just itself and
    /// a document yields nothing.
    pub fn related_versions(&self, node: NodeHandle) -> Vec<RelatedVersion> {
        let Some(target) = self.node(node) else {
            return Vec::new();
        };

        let order: HashMap<NodeHandle, usize> = self
            .preorder()
            .enumerate()
            .map(|(i, h)| (h, i))
            .collect();

        let mut found: Vec<RelatedVersion> = Vec::new();
        if !target.ids().is_empty() {
            for handle in self.preorder() {
                let candidate = self.at(handle);
                if candidate.kind() != target.kind()
                    || !candidate.ids().iter().any(|id| target.has_id(id))
                {
                    continue;
                }
                if let Some(document) = self.containing_document(handle) {
                    found.push(RelatedVersion {
                        node: handle,
                        document,
                    });
                }
            }
        }

        if found.iter().all(|v| v.node == node) {
            return match (target.is_page(), self.containing_document(node)) {
                (true, Some(document)) => vec![RelatedVersion { node, document }],
                _ => Vec::new(),
            };
        }

        found.sort_by_key(|v| order.get(&v.document).copied().unwrap_or(usize::MAX));
        found
    }
}

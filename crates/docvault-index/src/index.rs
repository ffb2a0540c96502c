//! The core Index structure holding the document/page tree.
//!
//! The [`Index`] is an arena: every node lives in one `Vec<Node>` and is
//! addressed by a [`NodeHandle`] slot number. Slot 0 is the root document,
//! which has no ids, title or content. Nodes are append-only: once created,
//! a node is never removed or reparented, so handles never dangle.
//!
//! The index is deliberately permissive. Duplicate ids, missing titles and
//! documents nested inside pages are accepted here and reported later by
//! the verifier, so that a partially broken tree stays inspectable.

use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::node::{split_list, Node, NodeHandle, NodeKind};

const ROOT: NodeHandle = NodeHandle(0);

/// The document tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    nodes: Vec<Node>,
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Index {
    /// Create an index holding only the root document.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document, None)],
        }
    }

    /// Handle of the root document.
    pub fn root(&self) -> NodeHandle {
        ROOT
    }

    /// Number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns `true` if the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a node by handle.
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle.0)
    }

    pub(crate) fn get(&self, handle: NodeHandle) -> IndexResult<&Node> {
        self.nodes
            .get(handle.0)
            .ok_or(IndexError::UnknownNode(handle))
    }

    fn get_mut(&mut self, handle: NodeHandle) -> IndexResult<&mut Node> {
        self.nodes
            .get_mut(handle.0)
            .ok_or(IndexError::UnknownNode(handle))
    }

    /// Handles reached by following links the index created itself; these
    /// are always in range.
    pub(crate) fn at(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.0]
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Append a document under `parent`.
    ///
    /// `ids` is a comma-separated list; the first entry becomes the primary
    /// id. An empty `content_id` means the node has no body of its own.
    pub fn add_document(
        &mut self,
        parent: NodeHandle,
        ids: &str,
        title: &str,
        content_id: &str,
    ) -> IndexResult<NodeHandle> {
        self.add_node(NodeKind::Document, parent, ids, title, content_id)
    }

    /// Append a page under `parent`.
    pub fn add_page(
        &mut self,
        parent: NodeHandle,
        ids: &str,
        title: &str,
        content_id: &str,
    ) -> IndexResult<NodeHandle> {
        self.add_node(NodeKind::Page, parent, ids, title, content_id)
    }

    fn add_node(
        &mut self,
        kind: NodeKind,
        parent: NodeHandle,
        ids: &str,
        title: &str,
        content_id: &str,
    ) -> IndexResult<NodeHandle> {
        self.get(parent)?;
        let handle = NodeHandle(self.nodes.len());

        let mut node = Node::new(kind, Some(parent));
        node.ids.extend(split_list(ids));
        node.title = title.to_string();
        node.content_id = content_id.trim().to_string();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(handle);

        debug!(%handle, %parent, %kind, ids, "added node");
        Ok(handle)
    }

    /// Append more ids to a node (comma-separated, trimmed).
    pub fn add_node_ids(&mut self, node: NodeHandle, ids: &str) -> IndexResult<()> {
        self.get_mut(node)?.ids.extend(split_list(ids));
        Ok(())
    }

    /// Append tags to a node (comma-separated, trimmed, duplicates kept).
    pub fn add_node_tags(&mut self, node: NodeHandle, tags: &str) -> IndexResult<()> {
        self.get_mut(node)?.tags.extend(split_list(tags));
        Ok(())
    }

    pub fn set_title(&mut self, node: NodeHandle, title: &str) -> IndexResult<()> {
        self.get_mut(node)?.title = title.to_string();
        Ok(())
    }

    /// Replace the node's content id; an empty string clears it.
    pub fn set_content_id(&mut self, node: NodeHandle, content_id: &str) -> IndexResult<()> {
        self.get_mut(node)?.content_id = content_id.trim().to_string();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn is_page(&self, node: NodeHandle) -> bool {
        self.node(node).is_some_and(Node::is_page)
    }

    pub fn child_count(&self, node: NodeHandle) -> usize {
        self.node(node).map_or(0, |n| n.children.len())
    }

    pub fn child(&self, node: NodeHandle, index: usize) -> Option<NodeHandle> {
        self.node(node)?.children.get(index).copied()
    }

    /// Every node in pre-order, starting with the root.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            index: self,
            stack: vec![ROOT],
        }
    }

    /// Distance from the root (the root is at depth 0).
    pub fn depth(&self, node: NodeHandle) -> usize {
        let mut depth = 0;
        let mut current = self.node(node).and_then(Node::parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.at(parent).parent;
        }
        depth
    }
}

/// Pre-order iterator over an index; see [`Index::preorder`].
pub struct Preorder<'a> {
    index: &'a Index,
    stack: Vec<NodeHandle>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let handle = self.stack.pop()?;
        self.stack
            .extend(self.index.at(handle).children.iter().rev().copied());
        Some(handle)
    }
}

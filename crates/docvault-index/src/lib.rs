//! Document/page tree for docvault.
//!
//! The index arranges references to stored blobs into a tree of documents
//! and pages. Every node has one or more ids; the first builds the node's
//! address, the rest link it to the same logical node in other versions.
//!
//! # Key Types
//!
//! - [`Index`] -- Arena-backed tree, navigation queries and XML persistence
//! - [`Node`] -- Read-only view of a document or page
//! - [`NodeHandle`] -- Stable handle to a node inside one index
//! - [`NavigationContext`] -- Up/previous/next neighbours of a node
//! - [`AddressMatch`] -- Result of resolving a `/`-joined address

pub mod error;
pub mod index;
pub mod navigation;
pub mod node;
mod xml;

pub use error::{IndexError, IndexResult};
pub use index::{Index, Preorder};
pub use navigation::{AddressMatch, NavigationContext, NavigationRole, RelatedVersion};
pub use node::{Node, NodeHandle, NodeKind};

//! Consistency verifier for docvault.
//!
//! The verifier walks an [`Index`](docvault_index::Index) together with the
//! [`BlobStore`](docvault_store::BlobStore) holding its content, and reports
//! what would break a published site: nodes without ids or content, dead
//! links, duplicate addresses, anchors that are linked but never defined,
//! content that is missing or unparseable.
//!
//! # Key Types
//!
//! - [`Verifier`] -- Runs one verification pass
//! - [`MessageKind`] -- Stable identifiers of everything that can be reported
//! - [`MessageSink`] -- Destination for messages; see [`CollectingSink`],
//!   [`WriterSink`] and [`AggregatingSink`]
//! - [`MarkupParser`] / [`Renderer`] -- Pluggable content handling

pub mod config;
pub mod error;
pub mod html;
pub mod markup;
pub mod message;
pub mod sink;
pub mod verifier;

pub use config::VerifyConfig;
pub use error::{MarkupError, VerifyError, VerifyResult};
pub use html::{scan_html, HtmlScan};
pub use markup::{HtmlRenderer, MarkupNode, MarkupParser, RenderOptions, Renderer, XmlMarkupParser};
pub use message::{Message, MessageKind, MessageKindSet, Severity};
pub use sink::{AggregatedMessage, AggregatingSink, CollectingSink, MessageSink, WriterSink};
pub use verifier::{Verifier, VerifySummary};

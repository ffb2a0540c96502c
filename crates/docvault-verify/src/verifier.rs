//! The verification walk.
//!
//! One pre-order pass over the index checks every node on its own and
//! records what must be correlated across the whole tree: registered
//! addresses, secondary id usage and anchor definitions/uses. Those three
//! maps live in a verification context owned by a single `verify` call
//! and are evaluated once the walk is complete.

use std::collections::BTreeMap;

use docvault_index::{Index, Node, NodeHandle, NodeKind};
use docvault_store::{BlobStore, ObjectId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::VerifyConfig;
use crate::html::scan_html;
use crate::markup::{
    HtmlRenderer, MarkupNode, MarkupParser, RenderOptions, Renderer, XmlMarkupParser,
};
use crate::message::{MessageKind, MessageKindSet, Severity};
use crate::sink::MessageSink;

/// Link schemes that point outside the site.
const EXTERNAL_SCHEMES: &[&str] = &[
    "http:", "https:", "mailto:", "ftp:", "news:", "nntp:", "data:",
];

/// Counters for one verification run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifySummary {
    /// Nodes visited, root included.
    pub nodes: usize,
    /// Messages passed to the sink.
    pub reported: usize,
    /// Messages dropped by the enabled set.
    pub suppressed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl VerifySummary {
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    fn record(&mut self, kind: MessageKind) {
        self.reported += 1;
        match kind.severity() {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.infos += 1,
        }
    }
}

/// Walks an index and its blob store, reporting consistency problems.
///
/// The markup parser and renderer are pluggable; the defaults understand
/// the XML documentation dialect.
#[derive(Clone, Debug)]
pub struct Verifier<P = XmlMarkupParser, R = HtmlRenderer> {
    parser: P,
    renderer: R,
    enabled: MessageKindSet,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(XmlMarkupParser, HtmlRenderer)
    }
}

impl Verifier {
    pub fn from_config(config: &VerifyConfig) -> Self {
        Self::default().with_enabled(config.enabled_set())
    }
}

impl<P: MarkupParser, R: Renderer> Verifier<P, R> {
    /// A verifier reporting every message kind.
    pub fn new(parser: P, renderer: R) -> Self {
        Self {
            parser,
            renderer,
            enabled: MessageKindSet::all(),
        }
    }

    /// Only forward messages whose kind is in `enabled`.
    pub fn with_enabled(mut self, enabled: MessageKindSet) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn enabled(&self) -> MessageKindSet {
        self.enabled
    }

    /// Check `index` against `store`, streaming findings into `sink`.
    ///
    /// Never fails: problems with the tree or its content are messages.
    pub fn verify<S: MessageSink + ?Sized>(
        &self,
        index: &Index,
        store: &dyn BlobStore,
        sink: &mut S,
    ) -> VerifySummary {
        let mut context = VerificationContext {
            verifier: self,
            index,
            store,
            sink,
            summary: VerifySummary::default(),
            addresses: BTreeMap::new(),
            secondary_ids: BTreeMap::new(),
            anchors: BTreeMap::new(),
        };
        for handle in index.preorder() {
            context.visit(handle);
        }
        context.finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LinkRole {
    /// `href`
    Hyperlink,
    /// `src`
    Image,
}

#[derive(Default)]
struct SecondaryUsage {
    weight: u32,
    /// First node that listed the id as secondary.
    node: Option<NodeHandle>,
}

#[derive(Default)]
struct Anchor {
    defined: bool,
    /// `(referencing node, literal link)`
    uses: Vec<(NodeHandle, String)>,
}

/// Working state of one `verify` call.
struct VerificationContext<'a, P, R, S: ?Sized> {
    verifier: &'a Verifier<P, R>,
    index: &'a Index,
    store: &'a dyn BlobStore,
    sink: &'a mut S,
    summary: VerifySummary,
    /// Address -> node that registered it first.
    addresses: BTreeMap<String, NodeHandle>,
    secondary_ids: BTreeMap<String, SecondaryUsage>,
    /// `(content id, fragment)` -> definition and uses.
    anchors: BTreeMap<(String, String), Anchor>,
}

impl<P: MarkupParser, R: Renderer, S: MessageSink + ?Sized> VerificationContext<'_, P, R, S> {
    fn emit(&mut self, kind: MessageKind, node: NodeHandle, info: &str) {
        if self.verifier.enabled.contains(kind) {
            self.sink.report_message(kind, self.index, node, info);
            self.summary.record(kind);
        } else {
            self.summary.suppressed += 1;
        }
    }

    fn visit(&mut self, handle: NodeHandle) {
        let index = self.index;
        let Some(node) = index.node(handle) else {
            return;
        };
        self.summary.nodes += 1;

        if handle != index.root() {
            self.check_structure(handle, node);
            self.register_addresses(handle, node);
            if node.is_page() {
                self.register_secondary_ids(handle, node);
            }
        }
        if let Some(content_id) = node.content_id() {
            self.check_content(handle, content_id);
        }
        for tag in node.tags() {
            self.emit(MessageKind::UsedTags, handle, &redact_tag(tag));
        }
    }

    fn check_structure(&mut self, handle: NodeHandle, node: &Node) {
        if node.ids().is_empty() {
            self.emit(MessageKind::NodeHasNoId, handle, "");
        }
        if node.title().is_empty() {
            self.emit(MessageKind::NodeHasNoTitle, handle, "");
        }
        if !node.is_page() && node.parent().is_some_and(|p| self.index.is_page(p)) {
            let info = format!("{} inside page", node.kind());
            self.emit(MessageKind::NestingError, handle, &info);
        }
        if node.content_id().is_none() && node.children().is_empty() {
            self.emit(MessageKind::NodeIsEmpty, handle, "");
        }
    }

    /// Register every address under which the node can be reached: each of
    /// its ids, and for pages each id of the containing document as well.
    fn register_addresses(&mut self, handle: NodeHandle, node: &Node) {
        if node.ids().is_empty() {
            return;
        }
        let index = self.index;
        let parent_address = node
            .parent()
            .map(|p| index.node_address(p, ""))
            .unwrap_or_default();
        let prefixes: Vec<String> = match (node.kind(), index.containing_document(handle)) {
            (NodeKind::Document, _) | (NodeKind::Page, None) => vec![parent_address],
            (NodeKind::Page, Some(doc)) => {
                let inner: Vec<&str> = index
                    .node_parents(handle)
                    .into_iter()
                    .skip_while(|&h| h != doc)
                    .skip(1)
                    .filter_map(|h| index.node(h))
                    .map(|n| n.primary_id().unwrap_or_default())
                    .collect();
                let doc_ids = index.node(doc).map(Node::ids).unwrap_or_default();
                let doc_prefixes: Vec<String> = if doc_ids.is_empty() {
                    vec![index.node_address(doc, "")]
                } else {
                    doc_ids.iter().map(|id| index.node_address(doc, id)).collect()
                };
                doc_prefixes
                    .into_iter()
                    .map(|prefix| {
                        inner
                            .iter()
                            .fold(prefix, |acc, segment| join_address(&acc, segment))
                    })
                    .collect()
            }
        };

        for prefix in &prefixes {
            for id in node.ids() {
                let address = join_address(prefix, id);
                let first = *self.addresses.entry(address.clone()).or_insert(handle);
                if first != handle {
                    self.emit(MessageKind::DuplicateAddress, handle, &address);
                }
            }
        }
    }

    fn register_secondary_ids(&mut self, handle: NodeHandle, node: &Node) {
        if let Some(primary) = node.primary_id() {
            self.secondary_ids.entry(primary.to_string()).or_default().weight += 2;
        }
        for id in node.secondary_ids() {
            let usage = self.secondary_ids.entry(id.clone()).or_default();
            usage.weight += 1;
            usage.node.get_or_insert(handle);
        }
    }

    fn check_content(&mut self, handle: NodeHandle, content_id: &str) {
        let data = match self.store.get_object_hex(content_id) {
            Ok(data) => data,
            Err(err) => {
                debug!(node = %handle, content_id, %err, "content not resolvable");
                self.emit(MessageKind::UnresolvableContent, handle, content_id);
                return;
            }
        };
        let markup = match self.verifier.parser.parse(&data) {
            Ok(markup) => markup,
            Err(err) => {
                self.emit(MessageKind::ContentError, handle, &err.to_string());
                return;
            }
        };

        let index = self.index;
        let base = index
            .containing_document(handle)
            .map(|doc| index.node_address(doc, ""))
            .unwrap_or_default();
        self.check_links(handle, content_id, &base, &markup);

        let options = RenderOptions { base_address: base };
        let scan = scan_html(&self.verifier.renderer.render(&markup, &options));
        for (tag, class) in &scan.classes {
            self.emit(MessageKind::UsedClasses, handle, &format!("{tag}.{class}"));
        }
        for comment in &scan.comments {
            self.emit(MessageKind::InvalidComment, handle, comment);
        }
    }

    fn check_links(
        &mut self,
        handle: NodeHandle,
        content_id: &str,
        base: &str,
        nodes: &[MarkupNode],
    ) {
        for node in nodes {
            if let Some(anchor) = node.attribute("id") {
                self.anchors
                    .entry((content_id.to_string(), anchor.to_string()))
                    .or_default()
                    .defined = true;
            }
            if let Some(href) = node.attribute("href") {
                self.check_link(handle, base, href, LinkRole::Hyperlink);
            }
            if let Some(src) = node.attribute("src") {
                self.check_link(handle, base, src, LinkRole::Image);
            }
            self.check_links(handle, content_id, base, node.children());
        }
    }

    fn check_link(&mut self, handle: NodeHandle, base: &str, link: &str, role: LinkRole) {
        let lower = link.to_ascii_lowercase();
        if let Some(scheme) = EXTERNAL_SCHEMES
            .iter()
            .copied()
            .find(|s| lower.starts_with(s))
        {
            // data: URLs carry their payload inline.
            let info = if scheme == "data:" { scheme } else { link };
            self.emit(MessageKind::ExternalLinks, handle, info);
        } else if link.starts_with("site:") {
            self.emit(MessageKind::SiteLinks, handle, link);
        } else if let Some(asset) = link.strip_prefix("asset:") {
            match role {
                LinkRole::Hyperlink => self.emit(MessageKind::AssetLink, handle, link),
                LinkRole::Image => {
                    if !self.asset_exists(asset) {
                        self.emit(MessageKind::InvalidAsset, handle, link);
                    }
                }
            }
        } else if role == LinkRole::Image {
            self.emit(MessageKind::DocumentImage, handle, link);
        } else {
            self.check_internal_link(handle, base, link);
        }
    }

    /// `asset:<id>` or `asset:<id>/<name>`; only the id is looked up.
    fn asset_exists(&self, asset: &str) -> bool {
        let id = asset.split_once('/').map_or(asset, |(id, _)| id);
        ObjectId::from_hex(id.trim())
            .ok()
            .is_some_and(|id| self.store.contains(&id).unwrap_or(false))
    }

    /// Resolve a document-relative or root-relative link and record any
    /// fragment as an anchor use.
    fn check_internal_link(&mut self, handle: NodeHandle, base: &str, link: &str) {
        let index = self.index;
        let (path, fragment) = match link.split_once('#') {
            Some((path, fragment)) => (path, fragment),
            None => (link, ""),
        };

        let target = if path.is_empty() {
            handle
        } else {
            let address = match path.strip_prefix('/') {
                Some(rooted) => rooted.to_string(),
                None => join_address(base, path),
            };
            match index.find_node_by_address(address.trim_end_matches('/')) {
                Some(found) => found.node,
                None => {
                    self.emit(MessageKind::DeadLink, handle, &address);
                    return;
                }
            }
        };

        if fragment.is_empty() {
            return;
        }
        let target_content = index
            .node(target)
            .and_then(Node::content_id)
            .unwrap_or_default()
            .to_string();
        let anchor = self
            .anchors
            .entry((target_content, fragment.to_string()))
            .or_default();
        if !anchor.uses.iter().any(|(h, l)| *h == handle && l == link) {
            anchor.uses.push((handle, link.to_string()));
        }
    }

    fn finish(mut self) -> VerifySummary {
        let secondary_ids = std::mem::take(&mut self.secondary_ids);
        for (id, usage) in secondary_ids {
            if let (1, Some(node)) = (usage.weight, usage.node) {
                self.emit(MessageKind::UniqueSecondaryId, node, &id);
            }
        }

        let anchors = std::mem::take(&mut self.anchors);
        for anchor in anchors.into_values().filter(|a| !a.defined) {
            for (node, link) in anchor.uses {
                self.emit(MessageKind::BadAnchor, node, &link);
            }
        }

        let summary = self.summary;
        info!(
            nodes = summary.nodes,
            reported = summary.reported,
            suppressed = summary.suppressed,
            errors = summary.errors,
            warnings = summary.warnings,
            "verification finished"
        );
        summary
    }
}

fn join_address(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}/{segment}")
    }
}

/// Collapse per-file tag values so the inventory stays small.
fn redact_tag(tag: &str) -> String {
    for prefix in ["size=", "date="] {
        if tag.starts_with(prefix) {
            return format!("{prefix}#");
        }
    }
    tag.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use docvault_store::InMemoryBlobStore;

    use super::*;
    use crate::message::Message;
    use crate::sink::CollectingSink;

    fn put(store: &InMemoryBlobStore, content: &str) -> String {
        store.add_object(content.as_bytes()).unwrap().to_hex()
    }

    fn run(index: &Index, store: &InMemoryBlobStore) -> (Vec<Message>, VerifySummary) {
        let mut sink = CollectingSink::new();
        let summary = Verifier::default().verify(index, store, &mut sink);
        (sink.into_messages(), summary)
    }

    fn infos(messages: &[Message], kind: MessageKind) -> Vec<String> {
        messages
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.info.clone())
            .collect()
    }

    // ---------------------------------------------------------------
    // Whole-tree scenarios
    // ---------------------------------------------------------------

    #[test]
    fn dead_relative_link_is_reported_with_full_address() {
        let store = InMemoryBlobStore::new();
        let body = put(&store, r#"<p>See <a href="y">y</a></p>"#);
        let mut index = Index::new();
        let a = index.add_document(index.root(), "a", "A", "").unwrap();
        let x = index.add_page(a, "x", "X", &body).unwrap();

        let (messages, summary) = run(&index, &store);
        let dead: Vec<&Message> = messages
            .iter()
            .filter(|m| m.kind == MessageKind::DeadLink)
            .collect();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].info, "a/y");
        assert_eq!(dead[0].node, x);
        assert!(summary.has_errors());
    }

    #[test]
    fn duplicate_document_ids_are_one_duplicate_address() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        index.add_document(index.root(), "a", "First", "").unwrap();
        index.add_document(index.root(), "a", "Second", "").unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(infos(&messages, MessageKind::DuplicateAddress), vec!["a"]);
    }

    #[test]
    fn duplicate_pages_outside_documents() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let about = index.add_page(index.root(), "about", "About", "").unwrap();
        index.add_page(about, "team", "Team", "").unwrap();
        index.add_page(about, "team", "Team again", "").unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(infos(&messages, MessageKind::DuplicateAddress), vec!["about/team"]);
    }

    #[test]
    fn clean_tree_reports_only_empty_leaves() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let v1 = index.add_document(index.root(), "v1", "Manual", "").unwrap();
        let intro = index.add_page(v1, "intro", "Intro", "").unwrap();
        index.add_page(intro, "setup", "Setup", "").unwrap();
        index.add_page(v1, "usage", "Usage", "").unwrap();
        index.add_page(index.root(), "about", "About", "").unwrap();

        let (messages, summary) = run(&index, &store);
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.kind == MessageKind::NodeIsEmpty));
        let addresses: BTreeSet<&str> = messages.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(
            addresses,
            BTreeSet::from(["v1/intro/setup", "v1/usage", "about"])
        );
        assert_eq!(summary.warnings, 0);
        assert_eq!(summary.nodes, 6);
    }

    #[test]
    fn empty_index_reports_nothing() {
        let (messages, summary) = run(&Index::new(), &InMemoryBlobStore::new());
        assert!(messages.is_empty());
        assert_eq!(summary.nodes, 1);
    }

    // ---------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------

    #[test]
    fn structural_findings() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let page = index.add_page(index.root(), "p", "", "").unwrap();
        let nested = index.add_document(page, "d", "Nested", "").unwrap();
        index.add_page(nested, "", "Anonymous", "").unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(infos(&messages, MessageKind::NodeHasNoTitle).len(), 1);
        assert_eq!(
            infos(&messages, MessageKind::NestingError),
            vec!["document inside page"]
        );
        let no_id: Vec<&Message> = messages
            .iter()
            .filter(|m| m.kind == MessageKind::NodeHasNoId)
            .collect();
        assert_eq!(no_id.len(), 1);
        assert_eq!(index.node(no_id[0].node).unwrap().title(), "Anonymous");
    }

    #[test]
    fn only_literally_empty_titles_are_missing() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let v1 = index.add_document(index.root(), "v1", "V1", "").unwrap();
        let blank = index.add_page(v1, "blank", "   ", "").unwrap();
        let untitled = index.add_page(v1, "untitled", "", "").unwrap();

        let (messages, _) = run(&index, &store);
        let flagged: Vec<NodeHandle> = messages
            .iter()
            .filter(|m| m.kind == MessageKind::NodeHasNoTitle)
            .map(|m| m.node)
            .collect();
        assert_eq!(flagged, vec![untitled]);
        assert!(!flagged.contains(&blank));
    }

    #[test]
    fn document_aliases_register_page_addresses() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let v1 = index.add_document(index.root(), "v1,current", "V1", "").unwrap();
        index.add_page(v1, "intro", "Intro", "").unwrap();
        let v2 = index.add_document(index.root(), "v2", "V2", "").unwrap();
        index.add_page(v2, "intro", "Intro", "").unwrap();
        index.add_page(v2, "current", "Clash", "").unwrap();

        let (messages, _) = run(&index, &store);
        // "v2/intro" differs from "v1/intro" and "current/intro"; nothing
        // collides with the alias either.
        assert!(infos(&messages, MessageKind::DuplicateAddress).is_empty());

        index.add_document(index.root(), "current", "Alias clash", "").unwrap();
        let (messages, _) = run(&index, &store);
        assert_eq!(infos(&messages, MessageKind::DuplicateAddress), vec!["current"]);
    }

    #[test]
    fn secondary_id_used_once_is_flagged() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let v1 = index.add_document(index.root(), "v1", "V1", "").unwrap();
        index.add_page(v1, "intro", "Intro", "").unwrap();
        let v0 = index.add_document(index.root(), "v0", "V0", "").unwrap();
        let old = index.add_page(v0, "intro-old,intro,intro-typo", "Intro", "").unwrap();

        let (messages, _) = run(&index, &store);
        let unique: Vec<&Message> = messages
            .iter()
            .filter(|m| m.kind == MessageKind::UniqueSecondaryId)
            .collect();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].info, "intro-typo");
        assert_eq!(unique[0].node, old);
    }

    #[test]
    fn tags_are_inventoried_with_redaction() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let page = index.add_page(index.root(), "p", "P", "").unwrap();
        index.add_node_tags(page, "size=1234, date=2020-01-01, beta").unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(
            infos(&messages, MessageKind::UsedTags),
            vec!["size=#", "date=#", "beta"]
        );
    }

    // ---------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------

    #[test]
    fn unresolvable_and_malformed_content() {
        let store = InMemoryBlobStore::new();
        let broken = put(&store, "<p>never closed");
        let missing = ObjectId::compute(b"not stored").to_hex();
        let mut index = Index::new();
        let root = index.root();
        index.add_page(root, "bad-id", "Bad id", "xyz").unwrap();
        index.add_page(root, "missing", "Missing", &missing).unwrap();
        index.add_page(root, "broken", "Broken", &broken).unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(
            infos(&messages, MessageKind::UnresolvableContent),
            vec!["xyz".to_string(), missing]
        );
        assert_eq!(infos(&messages, MessageKind::ContentError).len(), 1);
        assert!(infos(&messages, MessageKind::NodeIsEmpty).is_empty());
    }

    #[test]
    fn links_are_classified() {
        let store = InMemoryBlobStore::new();
        let logo = store.add_object(b"\x89PNG").unwrap().to_hex();
        let missing = ObjectId::compute(b"no such asset").to_hex();
        let body = put(
            &store,
            &format!(
                r#"<p>
                <a href="https://example.org/">web</a>
                <a href="mailto:me@example.org">mail</a>
                <a href="site:download">dl</a>
                <a href="asset:{logo}">raw</a>
                <img src="asset:{logo}"/>
                <img src="asset:{missing}"/>
                <img src="v1/intro"/>
                <a href="/v1/intro">abs</a>
                <a href="intro">rel</a>
                </p>"#
            ),
        );
        let mut index = Index::new();
        let v1 = index.add_document(index.root(), "v1", "V1", "").unwrap();
        index.add_page(v1, "intro", "Intro", &body).unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(
            infos(&messages, MessageKind::ExternalLinks),
            vec!["https://example.org/", "mailto:me@example.org"]
        );
        assert_eq!(infos(&messages, MessageKind::SiteLinks), vec!["site:download"]);
        assert_eq!(
            infos(&messages, MessageKind::AssetLink),
            vec![format!("asset:{logo}")]
        );
        assert_eq!(
            infos(&messages, MessageKind::InvalidAsset),
            vec![format!("asset:{missing}")]
        );
        assert_eq!(infos(&messages, MessageKind::DocumentImage), vec!["v1/intro"]);
        assert!(infos(&messages, MessageKind::DeadLink).is_empty());
    }

    #[test]
    fn named_assets_resolve_by_id() {
        let store = InMemoryBlobStore::new();
        let logo = store.add_object(b"\x89PNG").unwrap().to_hex();
        let missing = ObjectId::compute(b"gone").to_hex();
        let body = put(
            &store,
            &format!(r#"<p><img src="asset:{logo}/logo.png"/><img src="asset:{missing}/x.png"/></p>"#),
        );
        let mut index = Index::new();
        let v1 = index.add_document(index.root(), "v1", "V1", "").unwrap();
        index.add_page(v1, "intro", "Intro", &body).unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(
            infos(&messages, MessageKind::InvalidAsset),
            vec![format!("asset:{missing}/x.png")]
        );
    }

    #[test]
    fn anchors_must_be_defined() {
        let store = InMemoryBlobStore::new();
        let target = put(&store, r#"<h2 id="top">Top</h2>"#);
        let source = put(
            &store,
            r##"<p><a href="x#top">ok</a><a href="x#gone">bad</a><a href="#self">self</a><a href="x#gone">again</a></p>"##,
        );
        let mut index = Index::new();
        let a = index.add_document(index.root(), "a", "A", "").unwrap();
        index.add_page(a, "x", "X", &target).unwrap();
        let y = index.add_page(a, "y", "Y", &source).unwrap();

        let (messages, _) = run(&index, &store);
        let bad: Vec<&Message> = messages
            .iter()
            .filter(|m| m.kind == MessageKind::BadAnchor)
            .collect();
        assert_eq!(bad.len(), 2);
        assert!(bad.iter().all(|m| m.node == y));
        let links: BTreeSet<&str> = bad.iter().map(|m| m.info.as_str()).collect();
        assert_eq!(links, BTreeSet::from(["x#gone", "#self"]));
    }

    #[test]
    fn rendering_reports_classes_and_fallback_comments() {
        let store = InMemoryBlobStore::new();
        let body = put(&store, "<note>Careful</note><blink>old</blink><!-- author note -->");
        let mut index = Index::new();
        index.add_page(index.root(), "p", "P", &body).unwrap();

        let (messages, _) = run(&index, &store);
        assert_eq!(infos(&messages, MessageKind::UsedClasses), vec!["div.note"]);
        assert_eq!(
            infos(&messages, MessageKind::InvalidComment),
            vec!["unknown tag blink"]
        );
    }

    #[test]
    fn custom_renderer_is_used() {
        let store = InMemoryBlobStore::new();
        let body = put(&store, "<p>x</p>");
        let mut index = Index::new();
        index.add_page(index.root(), "p", "P", &body).unwrap();

        let renderer = |_: &[MarkupNode], options: &RenderOptions| {
            format!("<i class=\"base-{}\"/>", options.base_address.len())
        };
        let mut sink = CollectingSink::new();
        Verifier::new(XmlMarkupParser, renderer).verify(&index, &store, &mut sink);
        assert_eq!(
            infos(sink.messages(), MessageKind::UsedClasses),
            vec!["i.base-0"]
        );
    }

    // ---------------------------------------------------------------
    // Filtering
    // ---------------------------------------------------------------

    #[test]
    fn disabled_kinds_are_suppressed() {
        let store = InMemoryBlobStore::new();
        let mut index = Index::new();
        let page = index.add_page(index.root(), "p", "", "").unwrap();
        index.add_node_tags(page, "beta").unwrap();

        let mut sink = CollectingSink::new();
        let summary = Verifier::default()
            .with_enabled(MessageKindSet::at_least(Severity::Error))
            .verify(&index, &store, &mut sink);

        assert_eq!(sink.count(MessageKind::NodeIsEmpty), 1);
        assert_eq!(sink.count(MessageKind::UsedTags), 0);
        assert_eq!(sink.count(MessageKind::NodeHasNoTitle), 0);
        assert_eq!(summary.reported, 1);
        assert_eq!(summary.suppressed, 2);
    }

    #[test]
    fn from_config_applies_enabled_set() {
        let config = VerifyConfig {
            enabled: vec![MessageKind::DeadLink],
            ..VerifyConfig::default()
        };
        let verifier = Verifier::from_config(&config);
        assert_eq!(verifier.enabled().iter().collect::<Vec<_>>(), vec![MessageKind::DeadLink]);
    }

    #[test]
    fn redaction() {
        assert_eq!(redact_tag("size=10"), "size=#");
        assert_eq!(redact_tag("date=x"), "date=#");
        assert_eq!(redact_tag("sized"), "sized");
    }
}

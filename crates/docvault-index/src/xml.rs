//! XML persistence for the index.
//!
//! ```xml
//! <index>
//!   <doc id="v1,current" title="Manual">
//!     <page id="intro" tag="lang=en" title="Intro" content="9a0f…"/>
//!   </doc>
//! </index>
//! ```
//!
//! `id` and `tag` hold comma-joined lists. Attributes with empty values are
//! left out rather than written as `""`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info};

use crate::error::{IndexError, IndexResult};
use crate::index::Index;
use crate::node::{NodeHandle, NodeKind};

const INDEX_TAG: &str = "index";

fn xml_error(position: u64, err: impl std::fmt::Display) -> IndexError {
    IndexError::Xml {
        position,
        message: err.to_string(),
    }
}

fn format_error(position: u64, reason: impl Into<String>) -> IndexError {
    IndexError::Format {
        position,
        reason: reason.into(),
    }
}

/// Where the reader is relative to the `<index>` element.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Before,
    Inside,
    After,
}

impl Index {
    // ---------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------

    /// Write the tree as indented XML.
    pub fn save<W: Write>(&self, writer: W) -> IndexResult<()> {
        let mut xml = Writer::new_with_indent(writer, b' ', 2);
        let top = self.at(self.root()).children();
        if top.is_empty() {
            xml.write_event(Event::Empty(BytesStart::new(INDEX_TAG)))
                .map_err(|e| xml_error(0, e))?;
        } else {
            xml.write_event(Event::Start(BytesStart::new(INDEX_TAG)))
                .map_err(|e| xml_error(0, e))?;
            for &child in top {
                self.write_node(&mut xml, child)?;
            }
            xml.write_event(Event::End(BytesEnd::new(INDEX_TAG)))
                .map_err(|e| xml_error(0, e))?;
        }
        let mut writer = xml.into_inner();
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn write_node<W: Write>(&self, xml: &mut Writer<W>, handle: NodeHandle) -> IndexResult<()> {
        let node = self.at(handle);
        let tag = node.kind().tag();
        let ids = node.ids().join(",");
        let tags = node.tags().join(",");

        let mut start = BytesStart::new(tag);
        for (key, value) in [
            ("id", ids.as_str()),
            ("tag", tags.as_str()),
            ("title", node.title()),
            ("content", node.content_id().unwrap_or_default()),
        ] {
            if !value.is_empty() {
                start.push_attribute((key, value));
            }
        }

        if node.children().is_empty() {
            xml.write_event(Event::Empty(start))
                .map_err(|e| xml_error(0, e))?;
        } else {
            xml.write_event(Event::Start(start))
                .map_err(|e| xml_error(0, e))?;
            for &child in node.children() {
                self.write_node(xml, child)?;
            }
            xml.write_event(Event::End(BytesEnd::new(tag)))
                .map_err(|e| xml_error(0, e))?;
        }
        Ok(())
    }

    pub fn save_to_string(&self) -> IndexResult<String> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        String::from_utf8(buf).map_err(|e| xml_error(0, e))
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();
        self.save(BufWriter::new(File::create(path)?))?;
        info!(path = %path.display(), nodes = self.len(), "saved index");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Load
    // ---------------------------------------------------------------

    /// Read a tree written by [`save`](Self::save).
    ///
    /// An empty stream and a bare `<index/>` both yield an empty tree. A
    /// `<doc>` inside a `<page>`, an element without `id`, anything outside
    /// `<index>` and unbalanced tags are rejected with
    /// [`IndexError::Format`] or [`IndexError::Xml`].
    pub fn load<R: BufRead>(reader: R) -> IndexResult<Index> {
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(true);

        let mut index = Index::new();
        let mut open: Vec<NodeHandle> = Vec::new();
        let mut phase = Phase::Before;
        let mut buf = Vec::new();

        loop {
            let position = xml.buffer_position() as u64;
            match xml
                .read_event_into(&mut buf)
                .map_err(|e| xml_error(position, e))?
            {
                Event::Eof => break,
                Event::Start(ref e) => {
                    phase = index.open_element(e, &mut open, phase, false, position)?;
                }
                Event::Empty(ref e) => {
                    phase = index.open_element(e, &mut open, phase, true, position)?;
                }
                Event::End(ref e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name == INDEX_TAG {
                        if phase != Phase::Inside || !open.is_empty() {
                            return Err(format_error(position, "misplaced </index>"));
                        }
                        phase = Phase::After;
                    } else if open.pop().is_none() {
                        return Err(format_error(position, format!("unexpected </{name}>")));
                    }
                }
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(|e| xml_error(position, e))?;
                    if !text.trim().is_empty() {
                        return Err(format_error(
                            position,
                            format!("unexpected text {:?}", text.trim()),
                        ));
                    }
                }
                Event::CData(_) => {
                    return Err(format_error(position, "unexpected CDATA section"));
                }
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }

        if phase == Phase::Inside {
            let position = xml.buffer_position() as u64;
            return Err(format_error(position, "unclosed element at end of input"));
        }
        debug!(nodes = index.len(), "loaded index");
        Ok(index)
    }

    fn open_element(
        &mut self,
        element: &BytesStart<'_>,
        open: &mut Vec<NodeHandle>,
        phase: Phase,
        empty: bool,
        position: u64,
    ) -> IndexResult<Phase> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        match phase {
            Phase::Before if name == INDEX_TAG => {
                return Ok(if empty { Phase::After } else { Phase::Inside });
            }
            Phase::Before | Phase::After => {
                return Err(format_error(
                    position,
                    format!("<{name}> outside <{INDEX_TAG}>"),
                ));
            }
            Phase::Inside => {}
        }

        let kind = match name.as_str() {
            "doc" => NodeKind::Document,
            "page" => NodeKind::Page,
            _ => return Err(format_error(position, format!("unknown element <{name}>"))),
        };
        let parent = open.last().copied().unwrap_or(self.root());
        if kind == NodeKind::Document && self.at(parent).is_page() {
            return Err(format_error(position, "<doc> nested inside <page>"));
        }

        let mut ids = String::new();
        let mut tags = String::new();
        let mut title = String::new();
        let mut content = String::new();
        for attr in element.attributes() {
            let attr = attr.map_err(|e| xml_error(position, e))?;
            let value = attr
                .unescape_value()
                .map_err(|e| xml_error(position, e))?
                .into_owned();
            match attr.key.as_ref() {
                b"id" => ids = value,
                b"tag" => tags = value,
                b"title" => title = value,
                b"content" => content = value,
                _ => {}
            }
        }
        if ids.trim().is_empty() {
            return Err(format_error(position, format!("<{name}> without id")));
        }

        let handle = self.add_node_of(kind, parent, &ids, &title, &content)?;
        self.add_node_tags(handle, &tags)?;
        if !empty {
            open.push(handle);
        }
        Ok(Phase::Inside)
    }

    fn add_node_of(
        &mut self,
        kind: NodeKind,
        parent: NodeHandle,
        ids: &str,
        title: &str,
        content: &str,
    ) -> IndexResult<NodeHandle> {
        match kind {
            NodeKind::Document => self.add_document(parent, ids, title, content),
            NodeKind::Page => self.add_page(parent, ids, title, content),
        }
    }

    pub fn load_from_str(xml: &str) -> IndexResult<Index> {
        Self::load(xml.as_bytes())
    }

    pub fn load_file(path: impl AsRef<Path>) -> IndexResult<Index> {
        let path = path.as_ref();
        let index = Self::load(BufReader::new(File::open(path)?))?;
        info!(path = %path.display(), nodes = index.len(), "loaded index");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use proptest::prelude::*;

    fn sample() -> Index {
        let mut index = Index::new();
        let root = index.root();
        let v1 = index.add_document(root, "v1,current", "Manual <1>", "").unwrap();
        let intro = index.add_page(v1, "intro", "Intro & Setup", "abc").unwrap();
        index.add_node_tags(intro, "lang=en,beta").unwrap();
        index.add_page(intro, "setup", "", "").unwrap();
        index.add_page(root, "about", "About", "def").unwrap();
        index
    }

    fn assert_same_tree(a: &Index, b: &Index) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.preorder().zip(b.preorder()) {
            let (x, y) = (a.node(x).unwrap(), b.node(y).unwrap());
            assert_eq!(x.kind(), y.kind());
            assert_eq!(x.ids(), y.ids());
            assert_eq!(x.tags(), y.tags());
            assert_eq!(x.title(), y.title());
            assert_eq!(x.content_id(), y.content_id());
            assert_eq!(x.children().len(), y.children().len());
        }
    }

    // ---------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------

    #[test]
    fn save_writes_nested_elements() {
        let xml = sample().save_to_string().unwrap();
        assert!(xml.starts_with("<index>"));
        assert!(xml.contains(r#"<doc id="v1,current" title="Manual &lt;1&gt;">"#));
        assert!(xml.contains(
            r#"<page id="intro" tag="lang=en,beta" title="Intro &amp; Setup" content="abc">"#
        ));
        assert!(xml.contains(r#"<page id="setup"/>"#));
        assert!(xml.trim_end().ends_with("</index>"));
    }

    #[test]
    fn empty_index_saves_as_empty_element() {
        assert_eq!(Index::new().save_to_string().unwrap().trim(), "<index/>");
    }

    #[test]
    fn save_load_roundtrip() {
        let index = sample();
        let loaded = Index::load_from_str(&index.save_to_string().unwrap()).unwrap();
        assert_same_tree(&index, &loaded);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.xml");
        let index = sample();
        index.save_file(&path).unwrap();
        assert_same_tree(&index, &Index::load_file(&path).unwrap());
    }

    // ---------------------------------------------------------------
    // Load
    // ---------------------------------------------------------------

    #[test]
    fn empty_inputs_load_as_empty_tree() {
        assert!(Index::load_from_str("").unwrap().is_empty());
        assert!(Index::load_from_str("<index/>").unwrap().is_empty());
        assert!(Index::load_from_str("<?xml version=\"1.0\"?>\n<index>\n</index>\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn load_rejects_doc_inside_page() {
        let err = Index::load_from_str(r#"<index><page id="p"><doc id="d"/></page></index>"#)
            .unwrap_err();
        assert!(matches!(err, IndexError::Format { .. }), "{err}");
    }

    #[test]
    fn load_rejects_missing_id() {
        let err = Index::load_from_str(r#"<index><doc title="No id"/></index>"#).unwrap_err();
        assert!(matches!(err, IndexError::Format { .. }), "{err}");
    }

    #[test]
    fn load_rejects_elements_outside_index() {
        for input in [
            r#"<doc id="a"/>"#,
            r#"<index/><doc id="a"/>"#,
            r#"<index></index><index/>"#,
        ] {
            let err = Index::load_from_str(input).unwrap_err();
            assert!(matches!(err, IndexError::Format { .. }), "{input}: {err}");
        }
    }

    #[test]
    fn load_rejects_unknown_elements_and_text() {
        assert!(Index::load_from_str(r#"<index><chapter id="a"/></index>"#).is_err());
        assert!(Index::load_from_str(r#"<index>stray</index>"#).is_err());
    }

    #[test]
    fn load_rejects_unbalanced_tags() {
        let mismatched = Index::load_from_str(r#"<index><doc id="a"></page></index>"#);
        assert!(matches!(mismatched, Err(IndexError::Xml { .. } | IndexError::Format { .. })));

        let unclosed = Index::load_from_str(r#"<index><doc id="a">"#);
        assert!(matches!(unclosed, Err(IndexError::Xml { .. } | IndexError::Format { .. })));
    }

    #[test]
    fn load_ignores_unknown_attributes() {
        let index =
            Index::load_from_str(r#"<index><doc id="a" lang="en"><page id="b"/></doc></index>"#)
                .unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.find_node_by_address("a/b").is_some());
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    fn id_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,7}"
    }

    /// A flat list of (parent pick, is_doc, ids, tags, title, content) steps
    /// replayed against a fresh index.
    fn tree_strategy() -> impl Strategy<Value = Vec<(usize, bool, Vec<String>, Vec<String>, String, String)>>
    {
        prop::collection::vec(
            (
                any::<usize>(),
                any::<bool>(),
                prop::collection::vec(id_strategy(), 1..3),
                prop::collection::vec("[a-z]{1,5}(=[a-z0-9]{1,3})?", 0..3),
                "[ -~]{0,12}",
                "([0-9a-f]{40})?",
            ),
            0..24,
        )
    }

    fn build(steps: &[(usize, bool, Vec<String>, Vec<String>, String, String)]) -> Index {
        let mut index = Index::new();
        let mut handles = vec![index.root()];
        for (pick, is_doc, ids, tags, title, content) in steps {
            let parent = handles[pick % handles.len()];
            // Keep the tree loadable: documents only under documents.
            let as_doc = *is_doc && !index.is_page(parent);
            let ids = ids.join(",");
            let handle = if as_doc {
                index.add_document(parent, &ids, title, content).unwrap()
            } else {
                index.add_page(parent, &ids, title, content).unwrap()
            };
            index.add_node_tags(handle, &tags.join(",")).unwrap();
            handles.push(handle);
        }
        index
    }

    /// Whether every step from the root down to `node` is the only sibling
    /// its primary id can select.
    fn unambiguous_path(index: &Index, node: NodeHandle) -> bool {
        let mut path = index.node_parents(node);
        path.push(node);
        path.into_iter().skip(1).all(|h| {
            let n = index.node(h).unwrap();
            let primary = n.primary_id().unwrap_or_default();
            let siblings = n
                .parent()
                .and_then(|p| index.node(p))
                .map(Node::children)
                .unwrap_or_default();
            siblings.iter().all(|&s| {
                let sibling = index.node(s).unwrap();
                s == h
                    || match sibling.kind() {
                        NodeKind::Document => !sibling.has_id(primary),
                        NodeKind::Page => sibling.primary_id() != Some(primary),
                    }
            })
        })
    }

    proptest! {
        #[test]
        fn prop_save_load_roundtrip(steps in tree_strategy()) {
            let index = build(&steps);
            let xml = index.save_to_string().unwrap();
            let loaded = Index::load_from_str(&xml).unwrap();
            prop_assert_eq!(loaded.len(), index.len());
            for (x, y) in index.preorder().zip(loaded.preorder()) {
                let (x, y) = (index.node(x).unwrap(), loaded.node(y).unwrap());
                prop_assert_eq!(x.kind(), y.kind());
                prop_assert_eq!(x.ids(), y.ids());
                prop_assert_eq!(x.tags(), y.tags());
                prop_assert_eq!(x.title(), y.title());
                prop_assert_eq!(x.content_id(), y.content_id());
            }
        }

        #[test]
        fn prop_address_roundtrip(steps in tree_strategy()) {
            let index = build(&steps);
            for node in index.preorder().skip(1) {
                if !unambiguous_path(&index, node) {
                    continue;
                }
                let address = index.node_address(node, "");
                let found = index.find_node_by_address(&address);
                prop_assert_eq!(found.map(|m| m.node), Some(node));
            }
        }

        #[test]
        fn prop_indirect_links_match_preorder(steps in tree_strategy()) {
            let index = build(&steps);
            let order: Vec<NodeHandle> = index.preorder().collect();
            for pair in order.windows(2) {
                prop_assert_eq!(index.navigation_context(pair[1]).indirect_previous, Some(pair[0]));
                prop_assert_eq!(index.navigation_context(pair[0]).indirect_next, Some(pair[1]));
            }
            if let Some(&last) = order.last() {
                prop_assert_eq!(index.navigation_context(last).indirect_next, None);
            }
        }
    }
}

//! Stored page markup: parsing and HTML rendering.
//!
//! Page bodies are XML fragments in a small documentation dialect. The
//! verifier only needs two things from it: a node tree to walk for links and
//! anchors, and a rendering to inspect. Both are behind traits so a caller
//! can plug in the dialect its site actually uses.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::MarkupError;

/// One node of parsed markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
    Comment(String),
}

impl MarkupNode {
    pub fn element(name: &str, attributes: &[(&str, &str)], children: Vec<MarkupNode>) -> Self {
        Self::Element {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    /// Element name, or `None` for text and comments.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            Self::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            Self::Element { children, .. } => children,
            _ => &[],
        }
    }
}

/// Turns stored bytes into a markup tree.
pub trait MarkupParser {
    fn parse(&self, data: &[u8]) -> Result<Vec<MarkupNode>, MarkupError>;
}

/// Parses content as an XML fragment: any number of top-level nodes, tags
/// balanced and properly nested.
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlMarkupParser;

impl MarkupParser for XmlMarkupParser {
    fn parse(&self, data: &[u8]) -> Result<Vec<MarkupNode>, MarkupError> {
        let mut reader = Reader::from_reader(data);
        let mut top: Vec<MarkupNode> = Vec::new();
        // Open elements: (name, attributes, children so far).
        let mut open: Vec<(String, Vec<(String, String)>, Vec<MarkupNode>)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position() as u64;
            let node = match reader
                .read_event_into(&mut buf)
                .map_err(|e| markup_error(position, e))?
            {
                Event::Eof => break,
                Event::Start(ref e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    open.push((name, read_attributes(e, position)?, Vec::new()));
                    None
                }
                Event::Empty(ref e) => Some(MarkupNode::Element {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    attributes: read_attributes(e, position)?,
                    children: Vec::new(),
                }),
                Event::End(_) => {
                    let (name, attributes, children) = open.pop().ok_or_else(|| {
                        markup_error(position, "closing tag without opening tag")
                    })?;
                    Some(MarkupNode::Element {
                        name,
                        attributes,
                        children,
                    })
                }
                Event::Text(ref t) => Some(MarkupNode::Text(
                    t.unescape()
                        .map_err(|e| markup_error(position, e))?
                        .into_owned(),
                )),
                Event::CData(ref c) => Some(MarkupNode::Text(
                    String::from_utf8_lossy(c.as_ref()).into_owned(),
                )),
                Event::Comment(ref c) => Some(MarkupNode::Comment(
                    String::from_utf8_lossy(c.as_ref()).into_owned(),
                )),
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => None,
            };
            buf.clear();

            if let Some(node) = node {
                match open.last_mut() {
                    Some((_, _, children)) => children.push(node),
                    None => top.push(node),
                }
            }
        }

        if let Some((element, _, _)) = open.pop() {
            return Err(MarkupError::Unclosed { element });
        }
        Ok(top)
    }
}

fn markup_error(position: u64, err: impl std::fmt::Display) -> MarkupError {
    MarkupError::Xml {
        position,
        message: err.to_string(),
    }
}

fn read_attributes(
    element: &quick_xml::events::BytesStart<'_>,
    position: u64,
) -> Result<Vec<(String, String)>, MarkupError> {
    let mut attributes = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| markup_error(position, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| markup_error(position, e))?;
        attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(attributes)
}

/// Per-page rendering parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Address of the page's containing document; relative links are
    /// rendered against it.
    pub base_address: String,
}

/// Turns a markup tree into HTML.
pub trait Renderer {
    fn render(&self, nodes: &[MarkupNode], options: &RenderOptions) -> String;
}

impl<F> Renderer for F
where
    F: Fn(&[MarkupNode], &RenderOptions) -> String,
{
    fn render(&self, nodes: &[MarkupNode], options: &RenderOptions) -> String {
        self(nodes, options)
    }
}

/// Tags copied to HTML unchanged.
const PASSTHROUGH: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "dd", "div", "dl", "dt", "em", "h1", "h2", "h3", "h4",
    "hr", "i", "img", "li", "ol", "p", "pre", "span", "strong", "sub", "sup", "table", "tbody",
    "td", "th", "thead", "tr", "ul",
];

/// Dialect tags rendered as an HTML element with a class.
const CLASSED: &[(&str, &str, &str)] = &[
    ("note", "div", "note"),
    ("warning", "div", "warning"),
    ("tip", "div", "tip"),
    ("section", "div", "section"),
    ("example", "pre", "example"),
    ("kbd", "span", "kbd"),
    ("term", "span", "term"),
    ("file", "code", "file"),
    ("command", "code", "command"),
];

/// Renders the documentation dialect to HTML.
///
/// Input comments are dropped. An unrecognized tag is rendered as an HTML
/// comment naming it, followed by its rendered children.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn render_node(&self, node: &MarkupNode, options: &RenderOptions, out: &mut String) {
        match node {
            MarkupNode::Text(text) => out.push_str(&escape(text.as_str())),
            MarkupNode::Comment(_) => {}
            MarkupNode::Element {
                name,
                attributes,
                children,
            } => {
                let (tag, class) = if PASSTHROUGH.contains(&name.as_str()) {
                    (name.as_str(), None)
                } else if let Some(&(_, tag, class)) =
                    CLASSED.iter().find(|(dialect, _, _)| dialect == name)
                {
                    (tag, Some(class))
                } else {
                    out.push_str(&format!("<!-- unknown tag {} -->", escape(name.as_str())));
                    self.render_children(children, options, out);
                    return;
                };

                out.push('<');
                out.push_str(tag);
                if let Some(class) = class {
                    out.push_str(&format!(" class=\"{class}\""));
                }
                for (key, value) in attributes {
                    if class.is_some() && key == "class" {
                        continue;
                    }
                    let value = match key.as_str() {
                        "href" | "src" => rewrite_link(value, options),
                        _ => Cow::Borrowed(value.as_str()),
                    };
                    out.push_str(&format!(" {}=\"{}\"", escape(key.as_str()), escape(&value)));
                }
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    self.render_children(children, options, out);
                    out.push_str(&format!("</{tag}>"));
                }
            }
        }
    }

    fn render_children(&self, children: &[MarkupNode], options: &RenderOptions, out: &mut String) {
        for child in children {
            self.render_node(child, options, out);
        }
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, nodes: &[MarkupNode], options: &RenderOptions) -> String {
        let mut out = String::new();
        self.render_children(nodes, options, &mut out);
        out
    }
}

/// Map dialect link forms to site URLs.
fn rewrite_link<'a>(link: &'a str, options: &RenderOptions) -> Cow<'a, str> {
    if let Some(rest) = link.strip_prefix("site:") {
        Cow::Owned(format!("/{}", rest.trim_start_matches('/')))
    } else if let Some(rest) = link.strip_prefix("asset:") {
        Cow::Owned(format!("/asset/{rest}"))
    } else if link.contains(':') || link.starts_with('/') || link.starts_with('#') {
        Cow::Borrowed(link)
    } else if options.base_address.is_empty() {
        Cow::Owned(format!("/{link}"))
    } else {
        Cow::Owned(format!("/{}/{link}", options.base_address))
    }
}

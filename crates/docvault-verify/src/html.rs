//! Re-tokenizing rendered HTML.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// What the verifier looks for in rendered output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HtmlScan {
    /// `(tag, class)` for every class on every element, in document order.
    pub classes: Vec<(String, String)>,
    /// Text of every comment, trimmed.
    pub comments: Vec<String>,
}

/// Collect classes and comments from an HTML string.
///
/// End tag names are not checked, so sloppy HTML still scans. Scanning stops
/// quietly at the first token quick-xml cannot read.
pub fn scan_html(html: &str) -> HtmlScan {
    let mut reader = Reader::from_str(html);
    reader.check_end_names(false);
    let mut scan = HtmlScan::default();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => collect_classes(e, &mut scan),
            Ok(Event::Comment(ref c)) => {
                scan.comments
                    .push(String::from_utf8_lossy(c.as_ref()).trim().to_string());
            }
            Ok(_) => {}
            Err(err) => {
                debug!(position = reader.buffer_position(), %err, "stopped scanning html");
                break;
            }
        }
    }
    scan
}

fn collect_classes(element: &BytesStart<'_>, scan: &mut HtmlScan) {
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() != b"class" {
            continue;
        }
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        for class in value.split_whitespace() {
            scan.classes.push((tag.clone(), class.to_string()));
        }
    }
}

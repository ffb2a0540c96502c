//! Destinations for verifier messages.

use std::collections::BTreeMap;
use std::io::{self, Write};

use docvault_index::{Index, NodeHandle};
use serde::Serialize;

use crate::message::{Message, MessageKind, Severity};

/// Receives every message the verifier does not filter out.
pub trait MessageSink {
    fn report_message(&mut self, kind: MessageKind, index: &Index, node: NodeHandle, info: &str);
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn report_message(&mut self, kind: MessageKind, index: &Index, node: NodeHandle, info: &str) {
        (**self).report_message(kind, index, node, info)
    }
}

/// Keeps every message in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Vec<Message>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Messages of one kind.
    pub fn of_kind(&self, kind: MessageKind) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    pub fn count(&self, kind: MessageKind) -> usize {
        self.of_kind(kind).count()
    }
}

impl MessageSink for CollectingSink {
    fn report_message(&mut self, kind: MessageKind, index: &Index, node: NodeHandle, info: &str) {
        self.messages.push(Message::new(kind, index, node, info));
    }
}

/// Writes each message as one line as soon as it arrives.
///
/// The first write failure is kept and returned by [`finish`](Self::finish);
/// later messages are dropped.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> MessageSink for WriterSink<W> {
    fn report_message(&mut self, kind: MessageKind, index: &Index, node: NodeHandle, info: &str) {
        if self.error.is_some() {
            return;
        }
        let message = Message::new(kind, index, node, info);
        if let Err(err) = writeln!(self.writer, "{message}") {
            self.error = Some(err);
        }
    }
}

/// One `(kind, info)` group of an [`AggregatingSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregatedMessage {
    pub kind: MessageKind,
    pub severity: Severity,
    pub info: String,
    /// The first node that reported this message.
    pub specimen: NodeHandle,
    pub specimen_address: String,
    pub count: usize,
}

/// Groups messages by `(kind, info)`, keeping one specimen node and a count.
#[derive(Debug, Default)]
pub struct AggregatingSink {
    groups: BTreeMap<(MessageKind, String), AggregatedMessage>,
}

impl AggregatingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups ordered by kind, then info.
    pub fn report(&self) -> Vec<AggregatedMessage> {
        self.groups.values().cloned().collect()
    }

    pub fn write_report<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for group in self.groups.values() {
            let address = if group.specimen_address.is_empty() {
                "/"
            } else {
                &group.specimen_address
            };
            writeln!(
                writer,
                "{:<7} {:<19} {:>6}x  {} (e.g. {address})",
                group.severity, group.kind, group.count, group.info
            )?;
        }
        writer.flush()
    }
}

impl MessageSink for AggregatingSink {
    fn report_message(&mut self, kind: MessageKind, index: &Index, node: NodeHandle, info: &str) {
        self.groups
            .entry((kind, info.to_string()))
            .and_modify(|g| g.count += 1)
            .or_insert_with(|| AggregatedMessage {
                kind,
                severity: kind.severity(),
                info: info.to_string(),
                specimen: node,
                specimen_address: index.node_address(node, ""),
                count: 1,
            });
    }
}

//! Message taxonomy reported by the verifier.

use std::fmt;
use std::str::FromStr;

use docvault_index::{Index, NodeHandle};
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

/// How serious a finding is.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Inventory output (tags, classes, external links).
    #[default]
    Info,
    /// Probably wrong, but the tree is still usable.
    Warning,
    /// Broken content or structure.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(VerifyError::UnknownSeverity(other.to_string())),
        }
    }
}

/// Stable identifiers for everything the verifier can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    NodeHasNoId,
    NodeHasNoTitle,
    NodeIsEmpty,
    UnresolvableContent,
    UniqueSecondaryId,
    NestingError,
    DuplicateAddress,
    ContentError,
    InvalidComment,
    AssetLink,
    DocumentImage,
    InvalidAsset,
    DeadLink,
    BadAnchor,
    UsedTags,
    UsedClasses,
    ExternalLinks,
    SiteLinks,
}

impl MessageKind {
    pub const ALL: [MessageKind; 18] = [
        Self::NodeHasNoId,
        Self::NodeHasNoTitle,
        Self::NodeIsEmpty,
        Self::UnresolvableContent,
        Self::UniqueSecondaryId,
        Self::NestingError,
        Self::DuplicateAddress,
        Self::ContentError,
        Self::InvalidComment,
        Self::AssetLink,
        Self::DocumentImage,
        Self::InvalidAsset,
        Self::DeadLink,
        Self::BadAnchor,
        Self::UsedTags,
        Self::UsedClasses,
        Self::ExternalLinks,
        Self::SiteLinks,
    ];

    pub fn severity(self) -> Severity {
        match self {
            Self::NodeHasNoId
            | Self::NodeIsEmpty
            | Self::UnresolvableContent
            | Self::NestingError
            | Self::DuplicateAddress
            | Self::ContentError
            | Self::InvalidAsset
            | Self::DeadLink
            | Self::BadAnchor => Severity::Error,
            Self::NodeHasNoTitle
            | Self::UniqueSecondaryId
            | Self::InvalidComment
            | Self::AssetLink
            | Self::DocumentImage => Severity::Warning,
            Self::UsedTags | Self::UsedClasses | Self::ExternalLinks | Self::SiteLinks => {
                Severity::Info
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeHasNoId => "NodeHasNoId",
            Self::NodeHasNoTitle => "NodeHasNoTitle",
            Self::NodeIsEmpty => "NodeIsEmpty",
            Self::UnresolvableContent => "UnresolvableContent",
            Self::UniqueSecondaryId => "UniqueSecondaryId",
            Self::NestingError => "NestingError",
            Self::DuplicateAddress => "DuplicateAddress",
            Self::ContentError => "ContentError",
            Self::InvalidComment => "InvalidComment",
            Self::AssetLink => "AssetLink",
            Self::DocumentImage => "DocumentImage",
            Self::InvalidAsset => "InvalidAsset",
            Self::DeadLink => "DeadLink",
            Self::BadAnchor => "BadAnchor",
            Self::UsedTags => "UsedTags",
            Self::UsedClasses => "UsedClasses",
            Self::ExternalLinks => "ExternalLinks",
            Self::SiteLinks => "SiteLinks",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = VerifyError;

    /// Accepts the stable identifier, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VerifyError::UnknownMessageKind(wanted.to_string()))
    }
}

/// A set of message kinds, stored as a bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MessageKindSet(u32);

impl MessageKindSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::ALL_KINDS
    }

    const ALL_KINDS: Self = Self((1 << MessageKind::ALL.len()) - 1);

    /// Every kind whose severity is `min` or worse.
    pub fn at_least(min: Severity) -> Self {
        MessageKind::ALL
            .into_iter()
            .filter(|k| k.severity() >= min)
            .collect()
    }

    pub fn insert(&mut self, kind: MessageKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: MessageKind) {
        self.0 &= !kind.bit();
    }

    pub fn contains(self, kind: MessageKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = MessageKind> {
        MessageKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<MessageKind> for MessageKindSet {
    fn from_iter<I: IntoIterator<Item = MessageKind>>(iter: I) -> Self {
        let mut set = Self::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// One reported finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub severity: Severity,
    pub node: NodeHandle,
    /// Address of `node` at the time of reporting.
    pub address: String,
    pub info: String,
}

impl Message {
    pub fn new(kind: MessageKind, index: &Index, node: NodeHandle, info: &str) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            node,
            address: index.node_address(node, ""),
            info: info.to_string(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = if self.address.is_empty() { "/" } else { &self.address };
        write!(f, "{:<7} {:<19} {address}", self.severity, self.kind)?;
        if !self.info.is_empty() {
            write!(f, ": {}", self.info)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip_through_from_str() {
        for kind in MessageKind::ALL {
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
        assert_eq!("deadlink".parse::<MessageKind>().unwrap(), MessageKind::DeadLink);
        assert!(matches!(
            "NoSuchKind".parse::<MessageKind>(),
            Err(VerifyError::UnknownMessageKind(_))
        ));
    }

    #[test]
    fn severities_follow_taxonomy() {
        assert_eq!(MessageKind::DeadLink.severity(), Severity::Error);
        assert_eq!(MessageKind::NodeIsEmpty.severity(), Severity::Error);
        assert_eq!(MessageKind::UniqueSecondaryId.severity(), Severity::Warning);
        assert_eq!(MessageKind::InvalidComment.severity(), Severity::Warning);
        assert_eq!(MessageKind::UsedClasses.severity(), Severity::Info);
        assert!(Severity::Error > Severity::Warning && Severity::Warning > Severity::Info);
    }

    #[test]
    fn severity_parsing() {
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn kind_set_operations() {
        let all = MessageKindSet::all();
        assert_eq!(all.len(), MessageKind::ALL.len());
        assert!(MessageKindSet::empty().is_empty());

        let errors = MessageKindSet::at_least(Severity::Error);
        assert!(errors.contains(MessageKind::BadAnchor));
        assert!(!errors.contains(MessageKind::AssetLink));
        assert_eq!(MessageKindSet::at_least(Severity::Info), all);

        let mut set: MessageKindSet = [MessageKind::DeadLink, MessageKind::UsedTags]
            .into_iter()
            .collect();
        set.remove(MessageKind::UsedTags);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![MessageKind::DeadLink]);
        assert_eq!(set.intersection(errors), set);
    }

    #[test]
    fn message_display() {
        let msg = Message {
            kind: MessageKind::DeadLink,
            severity: Severity::Error,
            node: Index::new().root(),
            address: "a/x".into(),
            info: "a/y".into(),
        };
        let line = msg.to_string();
        assert!(line.starts_with("error"));
        assert!(line.contains("DeadLink"));
        assert!(line.ends_with("a/x: a/y"));
    }
}

use serde::{Deserialize, Serialize};

use crate::message::{MessageKind, MessageKindSet, Severity};

/// Which messages a verification run reports and how.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Kinds to report; empty means every kind.
    pub enabled: Vec<MessageKind>,
    /// Drop kinds below this severity.
    pub min_severity: Severity,
    /// Group messages by `(kind, info)` instead of listing each one.
    pub aggregate: bool,
}

impl VerifyConfig {
    /// The kinds that survive both the explicit list and the severity floor.
    pub fn enabled_set(&self) -> MessageKindSet {
        let listed = if self.enabled.is_empty() {
            MessageKindSet::all()
        } else {
            self.enabled.iter().copied().collect()
        };
        listed.intersection(MessageKindSet::at_least(self.min_severity))
    }
}

use serde::{Deserialize, Serialize};

/// Where the current request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    /// Nothing has been sent yet
    #[default]
    Idle,
    /// Request sent, no reply content yet
    Submitted,
    /// Reply content is arriving
    Streaming,
    /// Last reply completed or was stopped
    Done,
    /// Last reply failed
    Failed,
}

impl ChatStatus {
    /// A request is in flight; new submissions are disabled
    pub fn is_busy(self) -> bool {
        matches!(self, ChatStatus::Submitted | ChatStatus::Streaming)
    }
}

use crate::store::Turn;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Incremental update from a streaming chat backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// A new assistant turn begins
    Start { turn_id: String },
    /// More text for the turn in progress
    TextDelta { text: String },
    /// The reply completed normally
    Finish,
    /// The reply failed; no further events follow
    Error { message: String },
}

/// Streaming chat backend trait
///
/// Transport is up to the implementation:
/// - `ScriptedBackend`: canned or echoed replies (demo/testing)
/// - network-backed model providers live outside this crate
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the conversation so far and start streaming a reply
    ///
    /// Returns a channel receiver that yields the reply's events. The reply
    /// is over when `Finish` or `Error` arrives or the sender is dropped.
    async fn send(&self, history: &[Turn]) -> Result<mpsc::Receiver<StreamEvent>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

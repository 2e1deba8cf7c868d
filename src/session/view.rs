use crate::chat::ChatStatus;
use crate::store::{DurationMap, Turn};
use serde::{Deserialize, Serialize};

/// What a UI needs to render the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    /// Current transcript
    pub messages: Vec<Turn>,

    /// Status of the latest request
    pub status: ChatStatus,

    /// Generation time per turn id
    pub durations: DurationMap,

    /// Whether a new message may be submitted right now
    pub can_submit: bool,

    /// Error from the latest failed request, if any
    pub error: Option<String>,
}

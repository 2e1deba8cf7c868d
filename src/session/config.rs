use serde::{Deserialize, Serialize};

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hi! I'm your AI sidekick. Ask me anything and I'll help you work through it.";

/// Configuration for a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Text of the greeting inserted when there is no history
    pub welcome_message: String,

    /// Record submit-to-finish time for each reply automatically
    pub track_generation_time: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            track_generation_time: true,
        }
    }
}

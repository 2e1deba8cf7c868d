use crate::session::ChatSession;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The conversation served by this process
    pub session: Arc<ChatSession>,

    /// Acknowledgement text returned after a reset
    pub clear_chat_text: String,
}

impl AppState {
    pub fn new(session: Arc<ChatSession>, clear_chat_text: impl Into<String>) -> Self {
        Self {
            session,
            clear_chat_text: clear_chat_text.into(),
        }
    }
}

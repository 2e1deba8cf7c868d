use super::backend::StreamEvent;
use super::status::ChatStatus;
use crate::store::Turn;
use tracing::{debug, warn};

/// Live turn list and request status for one conversation
///
/// Applies backend events as they arrive. Turn ids stay unique: a `Start`
/// reusing an existing id is ignored along with the deltas that follow it.
#[derive(Debug, Default)]
pub struct ChatStream {
    messages: Vec<Turn>,
    status: ChatStatus,
    /// Index of the assistant turn receiving deltas
    active: Option<usize>,
    /// Deltas are dropped until the next `Start`
    rejecting: bool,
    last_error: Option<String>,
}

impl ChatStream {
    pub fn new(messages: Vec<Turn>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Id of the assistant turn currently being streamed
    pub fn active_turn_id(&self) -> Option<&str> {
        self.active
            .and_then(|idx| self.messages.get(idx))
            .map(|turn| turn.id.as_str())
    }

    /// Replace the turn list wholesale (hydration, welcome)
    pub fn set_messages(&mut self, messages: Vec<Turn>) {
        self.messages = messages;
        self.active = None;
        self.rejecting = false;
    }

    /// Append a user turn and mark the request as sent
    pub fn push_user(&mut self, text: &str) -> &Turn {
        self.messages.push(Turn::user(text));
        self.status = ChatStatus::Submitted;
        self.active = None;
        self.rejecting = false;
        self.last_error = None;
        &self.messages[self.messages.len() - 1]
    }

    /// Apply one backend event; returns true if the turn list changed
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Start { turn_id } => {
                if self.messages.iter().any(|turn| turn.id == turn_id) {
                    warn!("Ignoring reply with duplicate turn id: {}", turn_id);
                    self.active = None;
                    self.rejecting = true;
                    return false;
                }
                self.messages.push(Turn::assistant(turn_id));
                self.active = Some(self.messages.len() - 1);
                self.rejecting = false;
                self.status = ChatStatus::Streaming;
                true
            }
            StreamEvent::TextDelta { text } => {
                if self.rejecting {
                    return false;
                }
                let idx = match self.active {
                    Some(idx) => idx,
                    None => {
                        let turn = Turn::assistant(uuid::Uuid::new_v4().to_string());
                        debug!("Delta without start, opening turn {}", turn.id);
                        self.messages.push(turn);
                        self.messages.len() - 1
                    }
                };
                self.active = Some(idx);
                self.status = ChatStatus::Streaming;
                self.messages[idx].push_text(&text);
                true
            }
            StreamEvent::Finish => {
                self.status = ChatStatus::Done;
                false
            }
            StreamEvent::Error { message } => {
                // Partial content stays; the error itself is never content
                self.fail(message);
                false
            }
        }
    }

    /// Halt the current reply, keeping whatever already arrived
    pub fn stop(&mut self) {
        if self.status.is_busy() {
            self.status = ChatStatus::Done;
        }
        self.active = None;
        self.rejecting = false;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ChatStatus::Failed;
        self.last_error = Some(message.into());
    }

    /// Drop every turn and return to idle
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Reset `active`/`rejecting` after a terminal event
    pub fn settle(&mut self) {
        if !self.status.is_busy() {
            self.active = None;
            self.rejecting = false;
        }
    }
}

use super::backend::{ChatBackend, StreamEvent};
use crate::store::{Role, Turn};
use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How a scripted reply is produced
#[derive(Debug, Clone)]
enum Reply {
    /// Repeat the latest user message
    Echo,
    Text(String),
    /// Stream `partial`, then fail with `message`
    Fail { partial: String, message: String },
    /// Refuse to start at all
    Refuse(String),
}

/// Chat backend that replays scripted replies
///
/// Replies are split into `chunk_chars`-sized deltas, each optionally
/// delayed, so streaming behaviour (incremental persistence, stop,
/// failures) can be exercised without a network provider.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    chunk_chars: usize,
    chunk_delay: Duration,
}

impl ScriptedBackend {
    /// Backend that answers every message by echoing it
    pub fn echo() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Reply::Echo,
            chunk_chars: 8,
            chunk_delay: Duration::ZERO,
        }
    }

    /// Backend that answers with `replies` in order, then echoes
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::echo();
        {
            let mut queue = backend.queue();
            queue.extend(replies.into_iter().map(|r| Reply::Text(r.into())));
        }
        backend
    }

    pub fn chunk_chars(mut self, chars: usize) -> Self {
        self.chunk_chars = chars.max(1);
        self
    }

    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Queue a reply that streams `partial` and then fails
    pub fn push_failure(&self, partial: impl Into<String>, message: impl Into<String>) {
        self.queue().push_back(Reply::Fail {
            partial: partial.into(),
            message: message.into(),
        });
    }

    /// Queue a send that is refused before any streaming starts
    pub fn push_refusal(&self, message: impl Into<String>) {
        self.queue().push_back(Reply::Refuse(message.into()));
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Reply>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

#[async_trait::async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(&self, history: &[Turn]) -> Result<mpsc::Receiver<StreamEvent>> {
        let reply = self.queue().pop_front().unwrap_or_else(|| self.fallback.clone());

        let (text, failure) = match reply {
            Reply::Echo => {
                let last = history
                    .iter()
                    .rev()
                    .find(|turn| turn.role == Role::User)
                    .map(Turn::text)
                    .unwrap_or_default();
                (format!("You said: {}", last), None)
            }
            Reply::Text(text) => (text, None),
            Reply::Fail { partial, message } => (partial, Some(message)),
            Reply::Refuse(message) => bail!("{}", message),
        };

        let chunks = self.split(&text);
        let delay = self.chunk_delay;
        let turn_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(chunks.len() + 2);

        info!(
            "Scripted reply {} ({} chunks, history={})",
            turn_id,
            chunks.len(),
            history.len()
        );

        tokio::spawn(async move {
            if tx.send(StreamEvent::Start { turn_id }).await.is_err() {
                return;
            }

            for text in chunks {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(StreamEvent::TextDelta { text }).await.is_err() {
                    debug!("Scripted reply receiver dropped");
                    return;
                }
            }

            let last = match failure {
                Some(message) => StreamEvent::Error { message },
                None => StreamEvent::Finish,
            };
            let _ = tx.send(last).await;
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_echo_reply_is_chunked() {
        let backend = ScriptedBackend::echo().chunk_chars(4);
        let history = vec![Turn::user("ping")];

        let events = collect(backend.send(&history).await.unwrap()).await;

        assert!(matches!(events.first(), Some(StreamEvent::Start { .. })));
        assert_eq!(events.last(), Some(&StreamEvent::Finish));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "You said: ping");
        // "You said: ping" is 14 chars -> 4 chunks of at most 4
        assert_eq!(events.len(), 1 + 4 + 1);
    }

    #[tokio::test]
    async fn test_queued_replies_then_echo() {
        let backend = ScriptedBackend::with_replies(["first"]);
        let history = vec![Turn::user("x")];

        let first = collect(backend.send(&history).await.unwrap()).await;
        assert!(first.contains(&StreamEvent::TextDelta {
            text: "first".to_string()
        }));

        let second = collect(backend.send(&history).await.unwrap()).await;
        assert!(second.contains(&StreamEvent::TextDelta {
            text: "You said".to_string()
        }));
    }

    #[tokio::test]
    async fn test_failure_and_refusal() {
        let backend = ScriptedBackend::echo();
        backend.push_failure("par", "upstream closed");
        backend.push_refusal("offline");

        let events = collect(backend.send(&[]).await.unwrap()).await;
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Error {
                message: "upstream closed".to_string()
            })
        );

        assert!(backend.send(&[]).await.is_err());
    }
}

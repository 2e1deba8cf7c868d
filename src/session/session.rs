use super::config::SessionConfig;
use super::timing::TimingRecorder;
use super::view::SessionView;
use crate::chat::{ChatBackend, ChatStatus, ChatStream, StreamEvent};
use crate::store::{DurationMap, Snapshot, SnapshotStore, Turn};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why a message could not be submitted
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("session has not been bootstrapped yet")]
    NotHydrated,

    #[error("a reply is still in progress")]
    Busy,

    #[error("chat backend failed: {0}")]
    Backend(String),
}

/// Mutable conversation state, guarded by one lock
#[derive(Debug, Default)]
struct SessionState {
    chat: ChatStream,
    timing: TimingRecorder,

    /// Set once stored state has been loaded; nothing is saved before that
    hydrated: bool,

    /// Sticky: set on the first bootstrap, whether or not a welcome turn
    /// was inserted, so a later bootstrap never adds one
    welcome_decided: bool,

    /// Bumped on every submit/stop/reset; stream tasks from older
    /// generations discard their events
    generation: u64,

    /// When the in-flight request was submitted
    request_started: Option<Instant>,
}

impl SessionState {
    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.chat.messages().to_vec(), self.timing.durations().clone())
    }

    fn view(&self) -> SessionView {
        let status = self.chat.status();
        SessionView {
            messages: self.chat.messages().to_vec(),
            status,
            durations: self.timing.durations().clone(),
            can_submit: self.hydrated && !status.is_busy(),
            error: match status {
                ChatStatus::Failed => self.chat.last_error().map(str::to_owned),
                _ => None,
            },
        }
    }
}

/// Write the current state through to storage, once hydrated
fn reconcile(store: &SnapshotStore, state: &SessionState) {
    if !state.hydrated {
        debug!("Skipping save before hydration");
        return;
    }
    store.save(&state.snapshot());
}

/// A conversation kept in sync with durable storage
///
/// Owns the live transcript, the duration map and the request status.
/// Every change is written through to the `SnapshotStore` as a full
/// snapshot, but only after `bootstrap` has loaded what was stored.
pub struct ChatSession {
    /// Session configuration
    config: SessionConfig,

    /// Durable snapshot storage
    store: Arc<SnapshotStore>,

    /// Streams assistant replies
    backend: Arc<dyn ChatBackend>,

    /// Transcript, durations and flags
    state: Arc<Mutex<SessionState>>,

    /// Handle for the reply streaming task
    stream_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ChatSession {
    /// Create a session; call `bootstrap` before using it
    pub fn new(
        config: SessionConfig,
        store: Arc<SnapshotStore>,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        info!(
            "Creating chat session (store key '{}', backend {})",
            store.key(),
            backend.name()
        );

        Self {
            config,
            store,
            backend,
            state: Arc::new(Mutex::new(SessionState::default())),
            stream_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Load stored state and seed the session
    ///
    /// Stored state is loaded once; later calls keep the live state. The
    /// welcome decision is made on the first call only: with no stored
    /// history a welcome turn is inserted and saved, and no later call
    /// (after a reset, say) inserts another.
    pub async fn bootstrap(&self) -> SessionView {
        let mut state = self.state.lock().await;

        if state.hydrated {
            debug!("Session already hydrated");
        } else {
            let snapshot = self.store.load();
            info!(
                "Hydrating session: {} turns, {} durations",
                snapshot.messages.len(),
                snapshot.durations.len()
            );

            state.chat.set_messages(snapshot.messages);
            state.timing.seed(snapshot.durations);
            state.hydrated = true;
        }

        if !state.welcome_decided {
            state.welcome_decided = true;
            if state.chat.messages().is_empty() {
                let welcome = Turn::welcome(&self.config.welcome_message);
                info!("No history, inserting welcome turn {}", welcome.id);
                state.chat.set_messages(vec![welcome]);
                reconcile(&self.store, &state);
            }
        }

        state.view()
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state.lock().await.hydrated
    }

    /// Append a user message and start streaming the reply
    ///
    /// Returns once the reply has started; the reply itself is applied by a
    /// background task. Use `wait_for_stream` to wait for it.
    pub async fn submit(&self, text: &str) -> Result<(), SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }

        let (history, generation) = {
            let mut state = self.state.lock().await;

            if !state.hydrated {
                return Err(SubmitError::NotHydrated);
            }
            if state.chat.status().is_busy() {
                warn!("Submit rejected, reply still in progress");
                return Err(SubmitError::Busy);
            }

            let turn_id = state.chat.push_user(text).id.clone();
            state.generation += 1;
            state.request_started = Some(Instant::now());
            reconcile(&self.store, &state);

            info!("Submitted turn {} (generation {})", turn_id, state.generation);

            (state.chat.messages().to_vec(), state.generation)
        };

        let reply_rx = match self.backend.send(&history).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Backend {} failed to start reply: {:#}", self.backend.name(), e);
                let mut state = self.state.lock().await;
                if state.generation == generation {
                    state.request_started = None;
                    state.chat.fail(format!("{:#}", e));
                }
                return Err(SubmitError::Backend(format!("{:#}", e)));
            }
        };

        let task = tokio::spawn(pump_reply(
            reply_rx,
            Arc::clone(&self.state),
            Arc::clone(&self.store),
            generation,
            self.config.track_generation_time,
        ));

        {
            let mut handle = self.stream_task.lock().await;
            *handle = Some(task);
        }

        Ok(())
    }

    /// Halt the reply in progress, keeping content that already arrived
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            if !state.chat.status().is_busy() {
                debug!("No reply in progress");
                return;
            }

            info!("Stopping reply (generation {})", state.generation);
            state.generation += 1;
            state.request_started = None;
            state.chat.stop();
            reconcile(&self.store, &state);
        }

        self.abort_stream().await;
    }

    /// Record how long a turn took to generate; last value wins
    ///
    /// Non-finite values are ignored and nothing is saved.
    pub async fn record_duration(&self, turn_id: &str, duration_ms: f64) {
        let mut state = self.state.lock().await;
        if !state.timing.record(turn_id, duration_ms) {
            return;
        }
        debug!("Recorded duration for {}: {}ms", turn_id, duration_ms);
        reconcile(&self.store, &state);
    }

    /// Clear transcript and durations, in memory and in storage
    ///
    /// Halts any reply in progress. Never re-inserts the welcome turn.
    /// Before bootstrap only memory is cleared; storage is left as is.
    pub async fn reset(&self) {
        {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.request_started = None;
            state.chat.clear();
            state.timing.clear();
            reconcile(&self.store, &state);
            info!("Conversation cleared");
        }

        self.abort_stream().await;
    }

    /// Wait for the current reply (if any) to finish streaming
    pub async fn wait_for_stream(&self) {
        let task = self.stream_task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Reply task panicked: {}", e);
                }
            }
        }
    }

    pub async fn view(&self) -> SessionView {
        self.state.lock().await.view()
    }

    pub async fn messages(&self) -> Vec<Turn> {
        self.state.lock().await.chat.messages().to_vec()
    }

    pub async fn durations(&self) -> DurationMap {
        self.state.lock().await.timing.durations().clone()
    }

    pub async fn status(&self) -> ChatStatus {
        self.state.lock().await.chat.status()
    }

    async fn abort_stream(&self) {
        let task = self.stream_task.lock().await.take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Apply reply events to the session, saving after each change
async fn pump_reply(
    mut reply_rx: mpsc::Receiver<StreamEvent>,
    state: Arc<Mutex<SessionState>>,
    store: Arc<SnapshotStore>,
    generation: u64,
    track_generation_time: bool,
) {
    debug!("Reply task started (generation {})", generation);

    while let Some(event) = reply_rx.recv().await {
        let mut guard = state.lock().await;

        if guard.generation != generation {
            debug!("Discarding event from superseded reply");
            return;
        }

        let active_turn = guard.chat.active_turn_id().map(str::to_owned);
        let finished = matches!(event, StreamEvent::Finish);
        let mut changed = guard.chat.apply(event);

        if finished && track_generation_time {
            if let (Some(turn_id), Some(started)) = (active_turn, guard.request_started.take()) {
                let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0).round();
                changed |= guard.timing.record(&turn_id, elapsed_ms);
            }
        }

        if changed {
            reconcile(&store, &guard);
        }

        if !guard.chat.status().is_busy() {
            guard.chat.settle();
            guard.request_started = None;
            info!("Reply ended with status {:?}", guard.chat.status());
            return;
        }
    }

    let mut guard = state.lock().await;
    if guard.generation == generation && guard.chat.status().is_busy() {
        warn!("Reply stream closed before completion");
        guard.chat.fail("reply stream closed before completion");
        guard.chat.settle();
        guard.request_started = None;
    }
}

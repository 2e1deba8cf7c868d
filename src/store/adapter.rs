use super::backend::{KeyValueStore, StoreError};
use super::snapshot::{Snapshot, SnapshotError};
use tracing::{debug, warn};

/// Fixed key the conversation snapshot lives under
pub const DEFAULT_STORAGE_KEY: &str = "chat-messages";

/// Reads and writes the single conversation snapshot
///
/// `load` and `save` never fail: unreadable data degrades to an empty
/// snapshot and failed writes are dropped, leaving in-memory state
/// authoritative for the rest of the session.
pub struct SnapshotStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl SnapshotStore {
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn with_default_key(backend: Box<dyn KeyValueStore>) -> Self {
        Self::new(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Load the stored snapshot, or an empty one if absent or unreadable
    pub fn load(&self) -> Snapshot {
        if !self.backend.is_available() {
            debug!("{} backend unavailable, starting empty", self.backend.name());
            return Snapshot::default();
        }

        match self.try_load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No stored snapshot under '{}'", self.key);
                Snapshot::default()
            }
            Err(LoadError::Store(e)) => {
                warn!("Failed to read snapshot '{}': {}", self.key, e);
                Snapshot::default()
            }
            Err(LoadError::Snapshot(e)) => {
                warn!("Discarding unreadable snapshot '{}': {}", self.key, e);
                Snapshot::default()
            }
        }
    }

    /// Load with errors surfaced; `Ok(None)` means nothing is stored
    pub fn try_load(&self) -> Result<Option<Snapshot>, LoadError> {
        match self.backend.get(&self.key)? {
            Some(raw) => Ok(Some(Snapshot::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the stored snapshot; failures are logged and dropped
    pub fn save(&self, snapshot: &Snapshot) {
        if !self.backend.is_available() {
            debug!("{} backend unavailable, skipping save", self.backend.name());
            return;
        }

        if let Err(e) = self.try_save(snapshot) {
            warn!("Failed to save snapshot '{}': {}", self.key, e);
        }
    }

    /// Overwrite the stored snapshot with errors surfaced
    pub fn try_save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = snapshot.to_json()?;
        self.backend.set(&self.key, &json)?;
        debug!(
            "Saved snapshot '{}' ({} turns, {} durations)",
            self.key,
            snapshot.messages.len(),
            snapshot.durations.len()
        );
        Ok(())
    }
}

/// Why `try_load` failed
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

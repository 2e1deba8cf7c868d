//! Durable conversation storage
//!
//! The whole conversation (transcript + per-turn durations) is stored as one
//! versioned JSON blob under a fixed key. Every save replaces the blob
//! wholesale; there are no incremental writes.

mod adapter;
mod backend;
mod snapshot;

pub use adapter::{LoadError, SnapshotStore, DEFAULT_STORAGE_KEY};
pub use backend::{FileStore, KeyValueStore, MemoryStore, NullStore, StoreError};
pub use snapshot::{DurationMap, Part, Role, Snapshot, SnapshotError, Turn, SCHEMA_VERSION};

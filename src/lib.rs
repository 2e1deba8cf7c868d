pub mod chat;
pub mod config;
pub mod http;
pub mod session;
pub mod store;

pub use chat::{ChatBackend, ChatStatus, ChatStream, ScriptedBackend, StreamEvent};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{ChatSession, SessionConfig, SessionView, SubmitError, TimingRecorder};
pub use store::{
    DurationMap, FileStore, KeyValueStore, MemoryStore, NullStore, Part, Role, Snapshot,
    SnapshotStore, StoreError, Turn,
};

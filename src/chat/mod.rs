//! Streaming chat facade
//!
//! A `ChatBackend` streams replies as `StreamEvent`s; `ChatStream` folds
//! those events into the live turn list and tracks the request status.

pub mod backend;
pub mod scripted;
pub mod status;
pub mod stream;

pub use backend::{ChatBackend, StreamEvent};
pub use scripted::ScriptedBackend;
pub use status::ChatStatus;
pub use stream::ChatStream;

//! Chat session management
//!
//! This module provides the `ChatSession` abstraction that manages:
//! - One-time hydration from durable storage (with a welcome turn for new users)
//! - Submitting messages and streaming replies from a `ChatBackend`
//! - Writing every transcript/duration change back to storage
//! - Per-turn generation timing
//! - Clearing the conversation

mod config;
mod session;
mod timing;
mod view;

pub use config::{SessionConfig, DEFAULT_WELCOME_MESSAGE};
pub use session::{ChatSession, SubmitError};
pub use timing::TimingRecorder;
pub use view::SessionView;

use crate::session::{SessionConfig, DEFAULT_WELCOME_MESSAGE};
use crate::store::DEFAULT_STORAGE_KEY;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the snapshot file
    pub directory: String,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatConfig {
    pub ai_name: String,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    #[serde(default = "default_clear_chat_text")]
    pub clear_chat_text: String,
    #[serde(default = "default_true")]
    pub track_generation_time: bool,
    /// Delay between chunks of the scripted reply backend
    #[serde(default)]
    pub reply_chunk_delay_ms: u64,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

fn default_clear_chat_text() -> String {
    "New chat".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load `path` (any format `config` understands), overridden by
    /// `SIDEKICK`-prefixed environment variables (`__` between nested keys)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SIDEKICK").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            welcome_message: self.chat.welcome_message.clone(),
            track_generation_time: self.chat.track_generation_time,
        }
    }

    pub fn reply_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chat.reply_chunk_delay_ms)
    }
}

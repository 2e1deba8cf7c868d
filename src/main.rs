use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sidekick_chat::{
    create_router, AppState, ChatSession, Config, FileStore, Role, ScriptedBackend, SnapshotStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sidekick-chat", about = "Persistent chat session manager")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/sidekick-chat")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the stored conversation
    Show,
    /// Send a message and wait for the reply
    Send { text: String },
    /// Record a turn's generation time in milliseconds
    Record { turn_id: String, duration_ms: f64 },
    /// Clear the conversation
    Reset,
    /// Serve the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Storage: {}/{}.json", cfg.storage.directory, cfg.storage.key);

    let backend = FileStore::new(&cfg.storage.directory)
        .with_context(|| format!("Failed to open storage at {}", cfg.storage.directory))?;
    let store = Arc::new(SnapshotStore::new(Box::new(backend), cfg.storage.key.clone()));
    let replies = Arc::new(ScriptedBackend::echo().chunk_delay(cfg.reply_chunk_delay()));
    let session = Arc::new(ChatSession::new(cfg.session(), store, replies));

    session.bootstrap().await;

    match cli.command {
        Command::Show => print_transcript(&session, &cfg.chat.ai_name).await,
        Command::Send { text } => {
            session.submit(&text).await?;
            session.wait_for_stream().await;
            print_transcript(&session, &cfg.chat.ai_name).await;
        }
        Command::Record {
            turn_id,
            duration_ms,
        } => {
            session.record_duration(&turn_id, duration_ms).await;
            info!("Recorded {}ms for {}", duration_ms, turn_id);
        }
        Command::Reset => {
            session.reset().await;
            println!("{}", cfg.chat.clear_chat_text);
        }
        Command::Serve => {
            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let app = create_router(AppState::new(session, cfg.chat.clear_chat_text.clone()));
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("HTTP API listening on {}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn print_transcript(session: &ChatSession, ai_name: &str) {
    let view = session.view().await;

    for turn in &view.messages {
        let who = match turn.role {
            Role::User => "You",
            Role::Assistant => ai_name,
        };
        match view.durations.get(&turn.id) {
            Some(ms) => println!("{} ({:.1}s): {}", who, ms / 1000.0, turn.text()),
            None => println!("{}: {}", who, turn.text()),
        }
    }

    if let Some(error) = view.error {
        println!("[error] {}", error);
    }
}

mod chat;
mod config;
mod repl;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colloquy_agent::{Conversation, ModelClient, TurnRequest};
use colloquy_core::{mime_from_extension, ImageAttachment, Tone};
use colloquy_session::{
    restore_or_empty, FileSessionStore, FileTranscriptStore, Session, SessionManager, SessionStore,
};
use config::{active_session, set_active_session, ColloquyConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "colloquy", about = "Colloquy: persistent conversations with a remote model")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "colloquy.toml")]
    config: PathBuf,

    /// Session to use instead of the active one
    #[arg(short, long)]
    session: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        text: String,
        /// Image to attach
        #[arg(long)]
        image: Option<PathBuf>,
        /// Response tone (overrides config)
        #[arg(long)]
        tone: Option<Tone>,
    },
    /// Interactive conversation
    Chat,
    /// Print the turns of the session
    History,
    /// Clear the session
    Reset,
    /// List stored sessions
    Sessions,
    /// Start a fresh session and make it active
    New,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = ColloquyConfig::load(&cli.config).await?;
    let store = Arc::new(FileSessionStore::open(config.sessions_dir()).await?);

    let session_id = match (&cli.command, cli.session) {
        (Commands::New, _) => {
            let id = Uuid::new_v4();
            set_active_session(&config.data_dir, id).await?;
            println!("{id}");
            return Ok(());
        }
        (_, Some(id)) => id,
        (_, None) => active_session(&config.data_dir).await?,
    };

    match cli.command {
        Commands::Sessions => {
            for id in store.list().await? {
                let marker = if id == session_id { "*" } else { " " };
                let turns = restore_or_empty(store.as_ref(), id).await.turn_count();
                println!("{marker} {id}  {turns} turns");
            }
        }
        Commands::History => {
            let session = restore_or_empty(store.as_ref(), session_id).await;
            print_history(&session);
        }
        Commands::Reset => {
            let conversation = build_conversation(&config, store.clone()).await?;
            let mut session = conversation.restore(session_id).await;
            conversation.reset(&mut session).await?;
            println!("Session {session_id} cleared.");
        }
        Commands::Ask { text, image, tone } => {
            let conversation = build_conversation(&config, store.clone()).await?;
            let mut session = conversation.restore(session_id).await;
            let mut request = TurnRequest::new(text).with_tone(tone.unwrap_or(config.default_tone));
            if let Some(path) = image {
                request = request.with_image(read_image(&path).await?);
            }
            let turn = conversation.send(&mut session, request).await?;
            println!("{}", turn.response());
        }
        Commands::Chat => {
            let conversation = build_conversation(&config, store.clone()).await?;
            chat::run(&conversation, SessionManager::new(store), session_id, config.default_tone)
                .await?;
        }
        Commands::New => {}
    }
    Ok(())
}

async fn build_conversation(
    config: &ColloquyConfig,
    store: Arc<FileSessionStore>,
) -> anyhow::Result<Conversation<FileSessionStore>> {
    let client = ModelClient::new(config.model.clone());
    let mut conversation = Conversation::new(client, store).with_window(config.context);
    if config.transcript {
        let transcripts = FileTranscriptStore::new(config.transcripts_dir()).await?;
        conversation = conversation.with_transcript(Arc::new(transcripts));
    }
    info!(model = %conversation.model_id(), "Conversation ready");
    Ok(conversation)
}

async fn read_image(path: &Path) -> anyhow::Result<ImageAttachment> {
    let mime = mime_from_extension(path).with_context(|| {
        format!(
            "Unsupported image type '{}' (png, jpg, gif, webp)",
            path.display()
        )
    })?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image '{}'", path.display()))?;
    Ok(ImageAttachment::new(mime, bytes))
}

fn print_history(session: &Session) {
    if session.is_empty() {
        println!("(no turns yet)");
        return;
    }
    for (i, turn) in session.turns.iter().enumerate() {
        let image = if turn.attached_image.is_some() { " [image]" } else { "" };
        println!(
            "#{} {} ({})",
            i + 1,
            turn.created_at.format("%Y-%m-%d %H:%M:%S"),
            turn.tone
        );
        println!("  you{image}: {}", turn.user_input);
        println!("  {}: {}", turn.model_identifier, turn.response());
    }
}

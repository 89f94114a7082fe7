//! `colloquy.toml` loading and the active-session pointer.

use anyhow::Context as _;
use colloquy_agent::ModelConfig;
use colloquy_core::Tone;
use colloquy_session::blob::write_atomic;
use colloquy_session::ContextWindow;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Environment variable consulted when `model.api_key` is empty.
pub const API_KEY_ENV: &str = "COLLOQUY_API_KEY";

const ACTIVE_SESSION_FILE: &str = "active_session";

#[derive(Debug, Deserialize)]
pub struct ColloquyConfig {
    pub model: ModelConfig,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub default_tone: Tone,
    /// Write a JSONL transcript next to each session.
    #[serde(default = "default_transcript")]
    pub transcript: bool,
    /// An absent `[context]` table gets the default bounds; keys omitted
    /// inside a present table mean "no bound".
    #[serde(default = "default_context")]
    pub context: ContextWindow,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_transcript() -> bool {
    true
}
fn default_context() -> ContextWindow {
    ContextWindow::new(Some(20), Some(32_000))
}

impl ColloquyConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.model.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;
        config.apply_env_key(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Fills an empty `api_key` from the environment value, if any.
    pub fn apply_env_key(&mut self, env_key: Option<String>) {
        if !self.model.api_key.is_empty() {
            return;
        }
        match env_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => self.model.api_key = key,
            None => warn!("No API key configured; set model.api_key or {API_KEY_ENV}"),
        }
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir.join("transcripts")
    }
}

/// Id stored in `<data_dir>/active_session`, creating a fresh one when the
/// pointer is missing or unreadable.
pub async fn active_session(data_dir: &Path) -> anyhow::Result<Uuid> {
    let path = data_dir.join(ACTIVE_SESSION_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => match text.trim().parse::<Uuid>() {
            Ok(id) => return Ok(id),
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring malformed active session id"),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let id = Uuid::new_v4();
    set_active_session(data_dir, id).await?;
    Ok(id)
}

pub async fn set_active_session(data_dir: &Path, id: Uuid) -> anyhow::Result<()> {
    write_atomic(&data_dir.join(ACTIVE_SESSION_FILE), id.to_string().as_bytes()).await?;
    info!(session_id = %id, "Active session set");
    Ok(())
}

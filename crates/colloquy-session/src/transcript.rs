use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colloquy_core::{ColloquyError, ColloquyResult, Tone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Something that happened in a session, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranscriptEvent {
    UserInput {
        content: String,
        tone: Tone,
        has_image: bool,
    },
    ModelResponse {
        model: String,
        content: String,
    },
    /// The remote call failed; no turn was appended to the session.
    RemoteFailure {
        model: String,
        error: String,
    },
    SessionCleared {
        dropped_turns: usize,
    },
}

/// One line of a transcript file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Position of the turn this event concerns within the session's log at
    /// the time it was written. Restarts at 0 after a clear.
    pub turn: usize,
    pub event: TranscriptEvent,
}

impl TranscriptEntry {
    pub fn new(session_id: Uuid, turn: usize, event: TranscriptEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            timestamp: Utc::now(),
            turn,
            event,
        }
    }
}

/// Append-only event log per session. Unlike the session itself it also
/// records exchanges that failed.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, entry: TranscriptEntry) -> ColloquyResult<()>;
    /// Every entry of the session, in the order it was appended.
    async fn read(&self, session_id: Uuid) -> ColloquyResult<Vec<TranscriptEntry>>;
}

/// One `<uuid>.transcript.jsonl` file per session.
pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub async fn new(dir: PathBuf) -> ColloquyResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}.transcript.jsonl"))
    }
}

fn parse_lines(session_id: Uuid, data: &str) -> ColloquyResult<Vec<TranscriptEntry>> {
    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                ColloquyError::Session(format!(
                    "transcript {session_id} line {}: {e}",
                    n + 1
                ))
            })
        })
        .collect()
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn append(&self, entry: TranscriptEntry) -> ColloquyResult<()> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(entry.session_id))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, session_id: Uuid) -> ColloquyResult<Vec<TranscriptEntry>> {
        match tokio::fs::read_to_string(self.path_for(session_id)).await {
            Ok(data) => parse_lines(session_id, &data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

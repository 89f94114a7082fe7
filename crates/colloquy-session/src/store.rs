use crate::blob::{write_atomic, BlobStore, FileBlobStore};
use crate::session::Session;
use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists the whole turn log, replacing any earlier copy.
    async fn save(&self, session: &Session) -> ColloquyResult<()>;
    /// Restores a session. An id that was never saved yields an empty
    /// session with that id, not an error.
    async fn load(&self, id: Uuid) -> ColloquyResult<Session>;
    async fn exists(&self, id: Uuid) -> ColloquyResult<bool>;
    async fn delete(&self, id: Uuid) -> ColloquyResult<()>;
    async fn list(&self) -> ColloquyResult<Vec<Uuid>>;
}

/// Sessions stored as `<uuid>.json` blobs.
pub struct BlobSessionStore<B> {
    blobs: B,
}

/// File-based session store (JSON files on disk).
pub type FileSessionStore = BlobSessionStore<FileBlobStore>;

impl<B: BlobStore> BlobSessionStore<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    fn key(id: Uuid) -> String {
        format!("{id}.json")
    }
}

impl FileSessionStore {
    /// Opens (creating if needed) a session directory.
    pub async fn open(dir: PathBuf) -> ColloquyResult<Self> {
        Ok(Self::new(FileBlobStore::new(dir).await?))
    }
}

fn decode(bytes: &[u8]) -> ColloquyResult<Session> {
    serde_json::from_slice(bytes)
        .map_err(|e| ColloquyError::Session(format!("Failed to parse session: {e}")))
}

#[async_trait]
impl<B: BlobStore> SessionStore for BlobSessionStore<B> {
    async fn save(&self, session: &Session) -> ColloquyResult<()> {
        let json = serde_json::to_vec_pretty(session)?;
        self.blobs.write(&Self::key(session.id), &json).await?;
        debug!(session_id = %session.id, turns = session.turn_count(), "Session saved");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> ColloquyResult<Session> {
        match self.blobs.read(&Self::key(id)).await? {
            Some(bytes) => {
                let session = decode(&bytes)?;
                if session.id != id {
                    return Err(ColloquyError::Session(format!(
                        "stored session {} does not match requested id {id}",
                        session.id
                    )));
                }
                Ok(session)
            }
            None => Ok(Session::with_id(id)),
        }
    }

    async fn exists(&self, id: Uuid) -> ColloquyResult<bool> {
        Ok(self.blobs.read(&Self::key(id)).await?.is_some())
    }

    async fn delete(&self, id: Uuid) -> ColloquyResult<()> {
        self.blobs.delete(&Self::key(id)).await
    }

    async fn list(&self) -> ColloquyResult<Vec<Uuid>> {
        let ids = self
            .blobs
            .keys()
            .await?
            .iter()
            .filter_map(|k| k.strip_suffix(".json"))
            .filter_map(|stem| Uuid::parse_str(stem).ok())
            .collect();
        Ok(ids)
    }
}

/// Loads `id`, downgrading any storage error to a fresh empty session.
///
/// Used on process start and first access, where a damaged or unreadable
/// copy must not keep the conversation from starting.
pub async fn restore_or_empty<S: SessionStore + ?Sized>(store: &S, id: Uuid) -> Session {
    match store.load(id).await {
        Ok(session) => session,
        Err(e) => {
            warn!(session_id = %id, error = %e, "Failed to restore session, starting empty");
            Session::with_id(id)
        }
    }
}

/// Serializes `session` to `destination`, atomically replacing prior content.
pub async fn save_session(session: &Session, destination: &Path) -> ColloquyResult<()> {
    let json = serde_json::to_vec_pretty(session)?;
    write_atomic(destination, &json).await
}

/// Reads a session saved with [`save_session`]. A missing `source` yields a
/// new empty session.
pub async fn load_session(source: &Path) -> ColloquyResult<Session> {
    match tokio::fs::read(source).await {
        Ok(bytes) => decode(&bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::new()),
        Err(e) => Err(e.into()),
    }
}

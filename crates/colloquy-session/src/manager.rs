use crate::session::Session;
use crate::store::{restore_or_empty, SessionStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Shared handle to one live session. Holding the lock is what makes a
/// caller the session's single writer.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Hands out one [`SessionHandle`] per session id.
///
/// Callers working on the same id queue on that handle's mutex, while
/// different ids never contend. Sessions are restored from the store on
/// first access.
pub struct SessionManager<S> {
    store: Arc<S>,
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the live handle for `id`, restoring it if needed.
    pub async fn handle(&self, id: Uuid) -> SessionHandle {
        let cached = self.sessions.lock().get(&id).cloned();
        if let Some(handle) = cached {
            return handle;
        }

        let restored = restore_or_empty(self.store.as_ref(), id).await;
        let turns = restored.turn_count();
        let mut sessions = self.sessions.lock();
        // Another caller may have restored the same id while we were loading.
        sessions
            .entry(id)
            .or_insert_with(|| {
                info!(session_id = %id, turns, "Session activated");
                Arc::new(tokio::sync::Mutex::new(restored))
            })
            .clone()
    }

    /// Creates a brand-new empty session and registers it.
    pub fn create(&self) -> SessionHandle {
        let session = Session::new();
        let id = session.id;
        let handle = Arc::new(tokio::sync::Mutex::new(session));
        self.sessions.lock().insert(id, handle.clone());
        handle
    }

    /// Forgets the cached handle; the next access restores from the store.
    /// Callers still holding the old handle keep working on their copy.
    pub fn evict(&self, id: Uuid) -> bool {
        self.sessions.lock().remove(&id).is_some()
    }

    pub fn active_ids(&self) -> Vec<Uuid> {
        self.sessions.lock().keys().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

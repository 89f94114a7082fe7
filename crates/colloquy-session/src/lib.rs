pub mod blob;
pub mod context;
pub mod manager;
pub mod session;
pub mod store;
pub mod transcript;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use context::{build_context, ContextWindow};
pub use manager::{SessionHandle, SessionManager};
pub use session::Session;
pub use store::{
    load_session, restore_or_empty, save_session, BlobSessionStore, FileSessionStore, SessionStore,
};
pub use transcript::{FileTranscriptStore, TranscriptEntry, TranscriptEvent, TranscriptStore};

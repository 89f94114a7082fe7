use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Key-addressed byte storage backing the session store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Replaces the value stored under `key`.
    async fn write(&self, key: &str, bytes: &[u8]) -> ColloquyResult<()>;
    /// Returns `None` when nothing was ever written under `key`.
    async fn read(&self, key: &str) -> ColloquyResult<Option<Vec<u8>>>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> ColloquyResult<()>;
    async fn keys(&self) -> ColloquyResult<Vec<String>>;
}

/// Keys are single path components: ASCII alphanumerics, `.`, `_`, `-`,
/// and no leading `.` (that prefix is reserved for temp files).
pub fn validate_key(key: &str) -> ColloquyResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ColloquyError::Session(format!("invalid storage key '{key}'")))
    }
}

/// Writes `bytes` to `path` so that readers see either the old or the new
/// content, never a partial file.
///
/// The data goes to a hidden sibling temp file, is fsynced, then renamed over
/// `path`, and the parent directory is fsynced. On any failure before the
/// rename the temp file is removed and `path` is untouched.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> ColloquyResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        ColloquyError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no file name",
        ))
    })?;
    tokio::fs::create_dir_all(parent).await?;

    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await?;
        sync_dir(parent).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// Flushes a directory entry so a completed rename survives a crash.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// One file per key inside a directory.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub async fn new(dir: PathBuf) -> ColloquyResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> ColloquyResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn write(&self, key: &str, bytes: &[u8]) -> ColloquyResult<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, bytes).await
    }

    async fn read(&self, key: &str) -> ColloquyResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> ColloquyResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> ColloquyResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_key(name).is_ok() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Process-local store, mainly for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(&self, key: &str, bytes: &[u8]) -> ColloquyResult<()> {
        validate_key(key)?;
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, key: &str) -> ColloquyResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.blobs.read().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> ColloquyResult<()> {
        validate_key(key)?;
        self.blobs.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> ColloquyResult<Vec<String>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }
}

//! Storage backends: where the store document lives.
//!
//! A backend reads and writes the whole document as bytes. `write` must be
//! atomic: after a crash the backend holds either the old or the new document.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Durable home for the store document.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// The current document, or `None` if nothing was ever written.
    async fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the document atomically.
    async fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Keeps the document in memory. For tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing document.
    pub fn with_document(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Mutex::new(Some(bytes.into())),
        }
    }

    /// Copy of the stored document.
    pub async fn document(&self) -> Option<Vec<u8>> {
        self.document.lock().await.clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.document.lock().await.clone())
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        *self.document.lock().await = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Keeps the document in a JSON file.
///
/// Writes go to a sibling temporary file which is synced and then renamed
/// over the target.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await?;
            }
        }

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp, &self.path).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.read().await.unwrap().is_none());
        backend.write(b"{}").await.unwrap();
        assert_eq!(backend.read().await.unwrap().unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_file_backend_missing_file_reads_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = FileBackend::new(temp_dir.path().join("store.json"));
        assert!(backend.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backend_replaces_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("store.json");
        let backend = FileBackend::new(&path);

        backend.write(b"first").await.unwrap();
        backend.write(b"second").await.unwrap();

        assert_eq!(backend.read().await.unwrap().unwrap(), b"second");
        assert!(!temp_dir.path().join("nested").join("store.json.tmp").exists());
    }
}

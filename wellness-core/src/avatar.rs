//! Avatar image storage.
//!
//! Images live as plain files in one directory. A user keeps only the
//! generated file name, never the bytes.

use crate::error::AvatarError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// File-name addressed blob store for avatar images.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `bytes` under a fresh name and return that name.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> Result<String, AvatarError> {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AvatarError::InvalidName(extension.to_string()));
        }

        let name = format!("avatar_{}.{}", Uuid::new_v4().simple(), extension.to_ascii_lowercase());
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.dir.join(&name), bytes).await?;
        debug!(file = %name, size = bytes.len(), "saved avatar");
        Ok(name)
    }

    pub async fn load(&self, name: &str) -> Result<Vec<u8>, AvatarError> {
        Ok(fs::read(self.path(name)?).await?)
    }

    /// Delete an avatar. Missing files are not an error.
    pub async fn remove(&self, name: &str) -> Result<(), AvatarError> {
        match fs::remove_file(self.path(name)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Full path of `name`. Names that could escape the directory are rejected.
    pub fn path(&self, name: &str) -> Result<PathBuf, AvatarError> {
        let invalid = name.is_empty()
            || name == "."
            || name.contains("..")
            || name.contains(['/', '\\'])
            || Path::new(name).is_absolute();
        if invalid {
            return Err(AvatarError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

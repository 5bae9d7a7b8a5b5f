//! Local filesystem storage backend implementation

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::{StorageBackend, LOCAL_REFERENCE_PREFIX};
use crate::error::{BookError, Result};

/// Local filesystem storage backend
pub struct LocalStorageBackend {
    upload_path: PathBuf,
}

impl LocalStorageBackend {
    /// Create a new local storage backend rooted at `upload_path`
    pub fn new(upload_path: impl Into<PathBuf>) -> Self {
        Self {
            upload_path: upload_path.into(),
        }
    }

    /// Path of the blob stored under `key`. Keys are flat file names; anything
    /// that could escape the upload directory is refused.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !key.contains('\\') => Ok(self.upload_path.join(key)),
            _ => Err(BookError::InvalidFileName(format!("'{}' is not a plain file name", key))),
        }
    }

    /// Reference recorded for a locally stored key
    pub fn reference_for(key: &str) -> String {
        format!("{}{}", LOCAL_REFERENCE_PREFIX, key)
    }
}

#[async_trait]
impl StorageBackend for LocalStorageBackend {
    async fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        let file_path = self.path_for(key)?;

        // Ensure the upload directory exists
        fs::create_dir_all(&self.upload_path).await?;

        // create_new: never overwrite a stored book
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BookError::AlreadyExists(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await
        {
            error!("Failed to write {}: {}", file_path.display(), e);
            let _ = fs::remove_file(&file_path).await;
            return Err(e.into());
        }

        info!("Stored book locally: {} ({} bytes)", file_path.display(), data.len());
        Ok(Self::reference_for(key))
    }

    async fn get(&self, key: &str, _reference: &str) -> Result<Vec<u8>> {
        let file_path = self.path_for(key)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BookError::NotFound(format!("Local file not found: {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let file_path = self.path_for(key)?;
        match fs::remove_file(&file_path).await {
            Ok(_) => {
                info!("Deleted file: {}", file_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("File already deleted: {}", file_path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let file_path = self.path_for(key)?;
        Ok(fs::try_exists(&file_path).await?)
    }

    fn owns_reference(&self, reference: &str) -> bool {
        reference.starts_with(LOCAL_REFERENCE_PREFIX)
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }

    async fn initialize(&self) -> Result<()> {
        if let Err(e) = fs::create_dir_all(&self.upload_path).await {
            error!("Failed to create upload directory {:?}: {}", self.upload_path, e);
            return Err(e.into());
        }
        info!("Ensured upload directory exists: {:?}", self.upload_path);
        Ok(())
    }
}

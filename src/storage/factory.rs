//! Factory for creating storage backends based on configuration

use std::sync::Arc;

use super::local::LocalStorageBackend;
use super::{StorageBackend, StorageConfig};
use crate::config::{Config, StorageMode};
use crate::error::Result;
use crate::services::cloudinary_service::CloudinaryService;

/// Create a storage backend based on the provided configuration
pub async fn create_storage_backend(config: StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::Local { upload_path } => {
            let backend = LocalStorageBackend::new(upload_path);
            backend.initialize().await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Cloudinary { cloudinary_config } => {
            let backend = CloudinaryService::new(cloudinary_config)?;
            backend.initialize().await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Create storage configuration from the loaded process configuration
pub fn storage_config_from_env(config: &Config) -> Result<StorageConfig> {
    match (&config.storage_mode, &config.cloudinary_config) {
        (StorageMode::Cloudinary, Some(cloudinary_config)) => Ok(StorageConfig::Cloudinary {
            cloudinary_config: cloudinary_config.clone(),
        }),
        (StorageMode::Cloudinary, None) => Err(anyhow::anyhow!(
            "Cloudinary storage requested but no Cloudinary credentials are configured"
        )
        .into()),
        (StorageMode::Local, _) => Ok(StorageConfig::Local {
            upload_path: config.upload_path.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_config, test_cloudinary_config};

    #[test]
    fn test_local_mode_uses_upload_path() {
        let mut config = create_test_config();
        config.upload_path = "/srv/books".to_string();

        match storage_config_from_env(&config).unwrap() {
            StorageConfig::Local { upload_path } => assert_eq!(upload_path, "/srv/books"),
            other => panic!("expected local storage, got {:?}", other),
        }
    }

    #[test]
    fn test_cloudinary_mode_requires_credentials() {
        let mut config = create_test_config();
        config.storage_mode = StorageMode::Cloudinary;
        assert!(storage_config_from_env(&config).is_err());

        config.cloudinary_config = Some(test_cloudinary_config("http://127.0.0.1:9"));
        assert!(matches!(
            storage_config_from_env(&config).unwrap(),
            StorageConfig::Cloudinary { .. }
        ));
    }

    #[tokio::test]
    async fn test_create_local_backend_initializes_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("uploads");

        let backend = create_storage_backend(StorageConfig::Local {
            upload_path: root.to_string_lossy().to_string(),
        })
        .await
        .unwrap();

        assert_eq!(backend.storage_type(), "local");
        assert!(root.is_dir());
    }
}

//! Move blobs written by the local backend to the active remote backend
//!
//! Records created while running in local mode keep a `/local-files/...`
//! reference, which a Cloudinary deployment cannot serve. This walks every
//! such record, re-uploads the file and rewrites its `download_url`.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::db::BookRecordStore;
use crate::storage::local::LocalStorageBackend;
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Only report what would be migrated
    pub dry_run: bool,
    /// Remove the local file once the record points at the remote copy
    pub delete_local: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub async fn migrate_local_to_remote(
    store: &dyn BookRecordStore,
    local: &LocalStorageBackend,
    remote: &dyn StorageBackend,
    options: MigrationOptions,
) -> Result<MigrationReport> {
    if remote.storage_type() == local.storage_type() {
        anyhow::bail!("The active storage backend is local; set STORAGE_MODE=cloudinary to migrate");
    }

    let books = store
        .list_all()
        .await
        .context("Failed to list books")?;

    let mut report = MigrationReport::default();
    let (pending, already_remote): (Vec<_>, Vec<_>) = books
        .into_iter()
        .partition(|book| local.owns_reference(&book.download_url));
    report.skipped = already_remote.len();

    info!(
        "📋 Found {} books with local references ({} already remote)",
        pending.len(),
        report.skipped
    );

    if options.dry_run {
        info!("🔍 DRY RUN - Would migrate the following files:");
        for book in &pending {
            info!("  - {} (book {})", book.file_name, book.id);
        }
        return Ok(report);
    }

    for book in pending {
        let data = match local.get(&book.file_name, &book.download_url).await {
            Ok(data) => data,
            Err(e) => {
                error!("❌ Cannot read {} for book {}: {}", book.file_name, book.id, e);
                report.failed += 1;
                continue;
            }
        };

        let reference = match remote.put(&book.file_name, &data).await {
            Ok(reference) => reference,
            Err(e) => {
                error!("❌ Upload of {} failed: {}", book.file_name, e);
                report.failed += 1;
                continue;
            }
        };

        match store.update_download_url(book.id, &reference).await {
            Ok(true) => {
                info!("✅ Migrated book {} -> {}", book.id, reference);
                report.migrated += 1;
            }
            Ok(false) => {
                warn!("Book {} was deleted during migration; remote copy {} is orphaned", book.id, reference);
                report.failed += 1;
                continue;
            }
            Err(e) => {
                error!("❌ Failed to update record for book {}: {}", book.id, e);
                report.failed += 1;
                continue;
            }
        }

        if options.delete_local {
            if let Err(e) = local.delete(&book.file_name).await {
                warn!("Could not remove local copy of {}: {}", book.file_name, e);
            }
        }
    }

    info!(
        "📊 Migration finished: {} migrated, {} skipped, {} failed",
        report.migrated, report.skipped, report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBookStore;
    use crate::error::BookError;
    use crate::models::NewBook;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Remote double that records what was uploaded
    #[derive(Default)]
    struct RecordingRemote {
        uploads: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl StorageBackend for RecordingRemote {
        async fn put(&self, key: &str, _data: &[u8]) -> crate::error::Result<String> {
            if self.fail {
                return Err(BookError::Upstream("unreachable".to_string()));
            }
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(format!("https://cdn.test/books/{}", key))
        }

        async fn get(&self, _key: &str, _reference: &str) -> crate::error::Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _key: &str) -> crate::error::Result<()> {
            Ok(())
        }

        async fn exists(&self, _key: &str) -> crate::error::Result<bool> {
            Ok(false)
        }

        fn owns_reference(&self, reference: &str) -> bool {
            reference.starts_with("https://")
        }

        fn storage_type(&self) -> &'static str {
            "remote-test"
        }

        async fn initialize(&self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    async fn seed(store: &MemoryBookStore, local: &LocalStorageBackend, name: &str) -> i64 {
        let reference = local.put(name, b"%PDF-1.4").await.unwrap();
        store
            .create(NewBook {
                title: name.to_string(),
                author: "a".to_string(),
                description: String::new(),
                file_name: name.to_string(),
                download_url: reference,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_migrates_local_records() {
        let dir = TempDir::new().unwrap();
        let local = LocalStorageBackend::new(dir.path());
        let store = MemoryBookStore::new();
        let id = seed(&store, &local, "a.pdf").await;
        store
            .create(NewBook {
                title: "remote".to_string(),
                author: "a".to_string(),
                description: String::new(),
                file_name: "b.pdf".to_string(),
                download_url: "https://cdn.test/books/b.pdf".to_string(),
            })
            .await
            .unwrap();
        let remote = RecordingRemote::default();

        let report = migrate_local_to_remote(&store, &local, &remote, MigrationOptions {
            dry_run: false,
            delete_local: true,
        })
        .await
        .unwrap();

        assert_eq!(report, MigrationReport { migrated: 1, skipped: 1, failed: 0 });
        assert_eq!(*remote.uploads.lock().unwrap(), vec!["a.pdf".to_string()]);
        let book = store.get(id).await.unwrap().unwrap();
        assert_eq!(book.download_url, "https://cdn.test/books/a.pdf");
        assert!(!dir.path().join("a.pdf").exists());
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let local = LocalStorageBackend::new(dir.path());
        let store = MemoryBookStore::new();
        let id = seed(&store, &local, "a.pdf").await;
        let remote = RecordingRemote::default();

        let options = MigrationOptions { dry_run: true, ..Default::default() };
        let report = migrate_local_to_remote(&store, &local, &remote, options).await.unwrap();

        assert_eq!(report.migrated, 0);
        assert!(remote.uploads.lock().unwrap().is_empty());
        assert_eq!(store.get(id).await.unwrap().unwrap().download_url, "/local-files/a.pdf");
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_local_reference() {
        let dir = TempDir::new().unwrap();
        let local = LocalStorageBackend::new(dir.path());
        let store = MemoryBookStore::new();
        let id = seed(&store, &local, "a.pdf").await;
        let remote = RecordingRemote { fail: true, ..Default::default() };

        let report = migrate_local_to_remote(&store, &local, &remote, MigrationOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(store.get(id).await.unwrap().unwrap().download_url, "/local-files/a.pdf");
        assert!(dir.path().join("a.pdf").exists());
    }

    #[tokio::test]
    async fn test_refuses_local_target() {
        let dir = TempDir::new().unwrap();
        let local = LocalStorageBackend::new(dir.path());
        let other = LocalStorageBackend::new(dir.path().join("other"));
        let store = MemoryBookStore::new();

        assert!(migrate_local_to_remote(&store, &local, &other, MigrationOptions::default())
            .await
            .is_err());
    }
}

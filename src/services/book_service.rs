/*!
 * Book Storage Service
 *
 * Orchestrates the file-name normalizer, the active storage backend and the
 * record store. Blob and metadata live in different systems with no shared
 * transaction, so every flow orders its steps to keep the metadata store the
 * source of truth and logs anything that needs manual reconciliation.
 */

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::BookRecordStore;
use crate::error::{BookError, Result};
use crate::models::{Book, ExtractedMetadata, NewBook};
use crate::services::pdf_metadata::{extract_pdf_metadata, UNKNOWN_AUTHOR, UNTITLED};
use crate::storage::StorageBackend;
use crate::utils::file_name::{extension_of, normalize_file_name};
use crate::utils::key_lock::KeyLocks;
use crate::utils::mime::{attachment_disposition, content_matches_name, resolve_content_type};

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Name as sent by the client, before normalization
    pub original_file_name: String,
    pub data: Vec<u8>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}

/// Blob plus the headers needed to serve it
#[derive(Debug, Clone)]
pub struct DownloadedBook {
    pub book: Book,
    pub data: Vec<u8>,
    pub content_type: String,
    pub content_disposition: String,
}

pub struct BookService {
    store: Arc<dyn BookRecordStore>,
    storage: Arc<dyn StorageBackend>,
    upload_locks: KeyLocks,
}

impl BookService {
    pub fn new(store: Arc<dyn BookRecordStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            store,
            storage,
            upload_locks: KeyLocks::new(),
        }
    }

    pub fn storage_type(&self) -> &'static str {
        self.storage.storage_type()
    }

    /// Validate, deduplicate, store the blob and persist the record.
    ///
    /// Nothing is written anywhere when the name is rejected. If persisting
    /// fails after the blob was stored, the blob is removed again.
    pub async fn upload(&self, request: UploadRequest) -> Result<Book> {
        let file_name = normalize_file_name(&request.original_file_name)?;

        if request.data.is_empty() {
            return Err(BookError::EmptyFile);
        }
        if !content_matches_name(&file_name, &request.data) {
            warn!("Content of {} does not look like its extension claims", file_name);
        }

        let UploadRequest {
            data,
            title,
            author,
            description,
            ..
        } = request;
        let data = Arc::new(data);
        let metadata = resolve_metadata(&file_name, title, author, description, &data).await;

        // Check-then-store must not interleave for the same key
        let _guard = self.upload_locks.lock(&file_name).await;

        if self.store.find_by_file_name(&file_name).await?.is_some() {
            info!("Rejected duplicate upload of {}", file_name);
            return Err(BookError::AlreadyExists(file_name));
        }

        let download_url = self.storage.put(&file_name, data.as_slice()).await?;

        let new_book = NewBook {
            title: metadata.title,
            author: metadata.author,
            description: metadata.description,
            file_name: file_name.clone(),
            download_url,
        };

        match self.store.create(new_book).await {
            Ok(book) => {
                info!(
                    "Uploaded book {} as {} ({} bytes, {} storage)",
                    book.id,
                    book.file_name,
                    data.len(),
                    self.storage.storage_type()
                );
                Ok(book)
            }
            Err(BookError::AlreadyExists(name)) => {
                // Another process won the race; the blob under this key is theirs now
                warn!(
                    "Reconciliation needed: record for {} was created concurrently by another writer; the stored blob may have been overwritten",
                    name
                );
                Err(BookError::AlreadyExists(name))
            }
            Err(e) => {
                error!("Failed to persist record for {}: {}", file_name, e);
                if let Err(cleanup) = self.storage.delete(&file_name).await {
                    error!(
                        "Reconciliation needed: orphaned blob {} could not be removed: {}",
                        file_name, cleanup
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| BookError::NotFound(format!("Book not found with ID: {}", id)))
    }

    /// Fetch the blob, resolve its headers and count the download.
    ///
    /// The counter moves only after the blob was read. A failed increment is
    /// logged and does not fail the download.
    pub async fn download(&self, id: i64) -> Result<DownloadedBook> {
        let mut book = self.get(id).await?;

        if !self.storage.owns_reference(&book.download_url) {
            warn!(
                "Book {} was stored by a different backend ({}); the active {} backend may not find it",
                book.id,
                book.download_url,
                self.storage.storage_type()
            );
        }

        let data = self.storage.get(&book.file_name, &book.download_url).await?;
        let content_type = resolve_content_type(&book.file_name);
        let content_disposition = attachment_disposition(&book.file_name);

        match self.store.increment_download_count(book.id).await {
            Ok(Some(count)) => book.download_count = count,
            Ok(None) => warn!("Book {} disappeared before its download was counted", book.id),
            Err(e) => error!("Failed to count download of book {}: {}", book.id, e),
        }

        info!("Serving book {} ({}, {} bytes)", book.id, content_type, data.len());
        Ok(DownloadedBook {
            book,
            data,
            content_type,
            content_disposition,
        })
    }

    /// Remove blob then record. A missing record is a no-op.
    ///
    /// If the blob cannot be removed the record is kept so the delete can be
    /// retried, and `PartialDelete` is returned.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let Some(book) = self.store.get(id).await? else {
            debug!("Delete of unknown book {} ignored", id);
            return Ok(());
        };

        if let Err(e) = self.storage.delete(&book.file_name).await {
            error!(
                "Reconciliation needed: blob {} for book {} could not be deleted, keeping record: {}",
                book.file_name, book.id, e
            );
            return Err(BookError::PartialDelete {
                file_name: book.file_name,
                reason: e.to_string(),
            });
        }

        if !self.store.delete(book.id).await? {
            debug!("Book {} was already removed by a concurrent delete", book.id);
        }
        info!("Deleted book {} ({})", book.id, book.file_name);
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Book>> {
        self.store.list_all().await
    }

    pub async fn search_by_author(&self, author: &str) -> Result<Vec<Book>> {
        self.store.search_by_author(author).await
    }

    pub async fn search_by_title(&self, title: &str) -> Result<Vec<Book>> {
        self.store.search_by_title(title).await
    }

    pub async fn sorted_by_title(&self) -> Result<Vec<Book>> {
        self.store.list_sorted_by_title().await
    }

    pub async fn sorted_by_latest(&self) -> Result<Vec<Book>> {
        self.store.list_sorted_by_latest().await
    }
}

/// Fill missing title/author/description, from the PDF itself where possible.
///
/// Parsing runs on the blocking pool; a parse that fails or panics just
/// leaves the defaults.
async fn resolve_metadata(
    file_name: &str,
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    data: &Arc<Vec<u8>>,
) -> ExtractedMetadata {
    fn provided(value: Option<String>) -> Option<String> {
        value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    let title = provided(title);
    let author = provided(author);
    let description = provided(description);

    let needs_extraction = title.is_none() || author.is_none() || description.is_none();
    let extracted = if needs_extraction && extension_of(file_name).as_deref() == Some("pdf") {
        let bytes = Arc::clone(data);
        match tokio::task::spawn_blocking(move || extract_pdf_metadata(bytes.as_slice())).await {
            Ok(Ok(found)) => Some(found),
            Ok(Err(e)) => {
                debug!("No embedded metadata for {}: {}", file_name, e);
                None
            }
            Err(e) => {
                warn!("Metadata extraction for {} did not complete: {}", file_name, e);
                None
            }
        }
    } else {
        None
    };
    let extracted = extracted.unwrap_or_default();

    let non_empty = |value: String| if value.trim().is_empty() { None } else { Some(value) };

    ExtractedMetadata {
        title: title
            .or_else(|| non_empty(extracted.title))
            .unwrap_or_else(|| UNTITLED.to_string()),
        author: author
            .or_else(|| non_empty(extracted.author))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        description: description.unwrap_or(extracted.description),
    }
}

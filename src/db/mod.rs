//! Metadata persistence for books
//!
//! [`BookRecordStore`] is the seam the service talks to. [`Database`] backs it
//! with PostgreSQL; [`memory::MemoryBookStore`] keeps everything in process.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{BookError, Result};
use crate::models::{Book, NewBook};

pub mod books;
pub mod memory;

pub use memory::MemoryBookStore;

/// CRUD and query façade over the metadata store
#[async_trait]
pub trait BookRecordStore: Send + Sync {
    /// Insert a record. A duplicate `file_name` fails with `AlreadyExists`.
    async fn create(&self, book: NewBook) -> Result<Book>;

    async fn get(&self, id: i64) -> Result<Option<Book>>;

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Book>>;

    /// Every record, in insertion order
    async fn list_all(&self) -> Result<Vec<Book>>;

    /// Case-insensitive substring match on author
    async fn search_by_author(&self, author: &str) -> Result<Vec<Book>>;

    /// Case-insensitive substring match on title
    async fn search_by_title(&self, title: &str) -> Result<Vec<Book>>;

    async fn list_sorted_by_title(&self) -> Result<Vec<Book>>;

    /// Newest first
    async fn list_sorted_by_latest(&self) -> Result<Vec<Book>>;

    /// Atomically add one to the download counter.
    /// Returns the new count, or `None` if the record is gone.
    async fn increment_download_count(&self, id: i64) -> Result<Option<i64>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Point a record at a new backend reference
    async fn update_download_url(&self, id: i64, download_url: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::new_with_pool_config(database_url, 20, 2).await
    }

    pub async fn new_with_pool_config(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Retry transient connection failures with exponential backoff.
    ///
    /// Only for idempotent statements: a retried insert could have committed
    /// the first time.
    pub(crate) async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        const MAX_RETRIES: u32 = 3;
        const BASE_DELAY_MS: u64 = 50;

        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < MAX_RETRIES && is_transient(&e) => {
                    let delay_ms = BASE_DELAY_MS * 2u64.pow(attempt);
                    attempt += 1;
                    warn!(
                        "Database operation failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt,
                        MAX_RETRIES + 1,
                        delay_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(error: &BookError) -> bool {
    matches!(
        error,
        BookError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
    )
}

/// Escape LIKE wildcards so user input only ever matches literally
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

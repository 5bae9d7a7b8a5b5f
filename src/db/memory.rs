//! In-process record store
//!
//! Same contract as the PostgreSQL store, including the unique file name
//! constraint. Used for tests and for running without a database
//! (`DATABASE_URL=memory://`); contents are lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::BookRecordStore;
use crate::error::{BookError, Result};
use crate::models::{Book, NewBook};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    books: BTreeMap<i64, Book>,
}

#[derive(Debug, Default)]
pub struct MemoryBookStore {
    state: RwLock<MemoryState>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.books.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn filter<P>(&self, predicate: P) -> Vec<Book>
    where
        P: Fn(&Book) -> bool,
    {
        self.state
            .read()
            .await
            .books
            .values()
            .filter(|book| predicate(book))
            .cloned()
            .collect()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl BookRecordStore for MemoryBookStore {
    async fn create(&self, book: NewBook) -> Result<Book> {
        let mut state = self.state.write().await;

        if state.books.values().any(|b| b.file_name == book.file_name) {
            return Err(BookError::AlreadyExists(book.file_name));
        }

        // Ids are never reused, even after deletes
        state.last_id += 1;
        let record = Book {
            id: state.last_id,
            title: book.title,
            author: book.author,
            description: book.description,
            file_name: book.file_name,
            download_url: book.download_url,
            download_count: 0,
            created_at: Utc::now(),
        };
        state.books.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Book>> {
        Ok(self.filter(|b| b.file_name == file_name).await.into_iter().next())
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        Ok(self.filter(|_| true).await)
    }

    async fn search_by_author(&self, author: &str) -> Result<Vec<Book>> {
        Ok(self.filter(|b| contains_ignore_case(&b.author, author)).await)
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<Book>> {
        Ok(self.filter(|b| contains_ignore_case(&b.title, title)).await)
    }

    async fn list_sorted_by_title(&self) -> Result<Vec<Book>> {
        let mut books = self.filter(|_| true).await;
        books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(books)
    }

    async fn list_sorted_by_latest(&self) -> Result<Vec<Book>> {
        let mut books = self.filter(|_| true).await;
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(books)
    }

    async fn increment_download_count(&self, id: i64) -> Result<Option<i64>> {
        let mut state = self.state.write().await;
        Ok(state.books.get_mut(&id).map(|book| {
            book.download_count += 1;
            book.download_count
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.state.write().await.books.remove(&id).is_some())
    }

    async fn update_download_url(&self, id: i64, download_url: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.books.get_mut(&id) {
            Some(book) => {
                book.download_url = download_url.to_string();
                true
            }
            None => false,
        })
    }
}

use async_trait::async_trait;

use super::{escape_like, BookRecordStore, Database};
use crate::error::{BookError, Result};
use crate::models::{Book, NewBook};

const BOOK_COLUMNS: &str =
    "id, title, author, description, file_name, download_url, download_count, created_at";

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl Database {
    async fn fetch_books(&self, sql: &str, bind: Option<&str>) -> Result<Vec<Book>> {
        self.with_retry(|| async {
            let mut query = sqlx::query_as::<_, Book>(sql);
            if let Some(value) = bind {
                query = query.bind(value);
            }
            Ok(query.fetch_all(&self.pool).await?)
        })
        .await
    }
}

#[async_trait]
impl BookRecordStore for Database {
    async fn create(&self, book: NewBook) -> Result<Book> {
        // Not retried: the unique index must see exactly one attempt
        let sql = format!(
            r#"INSERT INTO books (title, author, description, file_name, download_url)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {}"#,
            BOOK_COLUMNS
        );

        sqlx::query_as::<_, Book>(&sql)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.description)
            .bind(&book.file_name)
            .bind(&book.download_url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                    BookError::AlreadyExists(book.file_name.clone())
                }
                _ => BookError::Database(e),
            })
    }

    async fn get(&self, id: i64) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        self.with_retry(|| async {
            Ok(sqlx::query_as::<_, Book>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE file_name = $1", BOOK_COLUMNS);
        self.with_retry(|| async {
            Ok(sqlx::query_as::<_, Book>(&sql)
                .bind(file_name)
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        let sql = format!("SELECT {} FROM books ORDER BY id", BOOK_COLUMNS);
        self.fetch_books(&sql, None).await
    }

    async fn search_by_author(&self, author: &str) -> Result<Vec<Book>> {
        let sql = format!(
            r#"SELECT {} FROM books
               WHERE author ILIKE '%' || $1 || '%' ESCAPE '\'
               ORDER BY id"#,
            BOOK_COLUMNS
        );
        self.fetch_books(&sql, Some(&escape_like(author))).await
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<Book>> {
        let sql = format!(
            r#"SELECT {} FROM books
               WHERE title ILIKE '%' || $1 || '%' ESCAPE '\'
               ORDER BY id"#,
            BOOK_COLUMNS
        );
        self.fetch_books(&sql, Some(&escape_like(title))).await
    }

    async fn list_sorted_by_title(&self) -> Result<Vec<Book>> {
        let sql = format!("SELECT {} FROM books ORDER BY LOWER(title) ASC, id ASC", BOOK_COLUMNS);
        self.fetch_books(&sql, None).await
    }

    async fn list_sorted_by_latest(&self) -> Result<Vec<Book>> {
        let sql = format!("SELECT {} FROM books ORDER BY created_at DESC, id DESC", BOOK_COLUMNS);
        self.fetch_books(&sql, None).await
    }

    async fn increment_download_count(&self, id: i64) -> Result<Option<i64>> {
        // Single statement so concurrent downloads never lose an increment
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE books SET download_count = download_count + 1 WHERE id = $1 RETURNING download_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.with_retry(|| async {
            let result = sqlx::query("DELETE FROM books WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn update_download_url(&self, id: i64, download_url: &str) -> Result<bool> {
        self.with_retry(|| async {
            let result = sqlx::query("UPDATE books SET download_url = $2 WHERE id = $1")
                .bind(id)
                .bind(download_url)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }
}

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{debug, info};

use crate::{
    error::{BookError, ErrorResponse, Result},
    models::{clean_search_term, ApiResponse, AuthorSearchQuery, Book, TitleSearchQuery},
    services::book_service::UploadRequest,
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_books))
        .route("/upload", post(upload_book))
        .route("/{id}", get(get_book))
        .route("/delete/{book_id}", delete(delete_book))
        .route("/download/{id}", get(download_book))
        .route("/search/author", get(search_by_author))
        .route("/search/title", get(search_by_title))
        .route("/sorted/title", get(sorted_by_title))
        .route("/sorted/latest", get(sorted_by_latest))
}

fn multipart_error(e: MultipartError) -> BookError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BookError::PayloadTooLarge
    } else {
        BookError::MalformedUpload(e.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/api/books/upload",
    tag = "books",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Parts: `file` (required), `title`, `author`, `description`"
    ),
    responses(
        (status = 201, description = "Book stored; the record is returned under `data`", body = Book),
        (status = 400, description = "Disallowed extension, invalid name or empty file", body = ErrorResponse),
        (status = 409, description = "A book with the same file name already exists", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    )
)]
pub async fn upload_book(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Book>>)> {
    let mut request = UploadRequest::default();
    let mut has_file = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                request.original_file_name = field.file_name().unwrap_or_default().to_string();
                request.data = field.bytes().await.map_err(multipart_error)?.to_vec();
                has_file = true;
            }
            "title" => request.title = Some(field.text().await.map_err(multipart_error)?),
            "author" => request.author = Some(field.text().await.map_err(multipart_error)?),
            "description" => {
                request.description = Some(field.text().await.map_err(multipart_error)?)
            }
            other => debug!("Ignoring unexpected multipart field '{}'", other),
        }
    }

    if !has_file {
        return Err(BookError::MalformedUpload("missing 'file' part".to_string()));
    }

    info!(
        "Upload request for '{}' ({} bytes)",
        request.original_file_name,
        request.data.len()
    );
    let book = state.book_service.upload(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED.as_u16(),
            "Book uploaded successfully!",
            book,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "The book record", body = Book),
        (status = 404, description = "No book with this ID", body = ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Book>> {
    Ok(Json(state.book_service.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<Book>),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.book_service.list_all().await?))
}

#[utoipa::path(
    delete,
    path = "/api/books/delete/{book_id}",
    tag = "books",
    params(("book_id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted, or there was nothing to delete"),
        (status = 500, description = "Stored file or record could not be deleted", body = ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<i64>,
) -> Result<Json<ApiResponse<String>>> {
    state.book_service.delete(book_id).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.as_u16(),
        "Book deleted successfully",
        format!("Book with ID {} has been deleted", book_id),
    )))
}

#[utoipa::path(
    get,
    path = "/api/books/download/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "File contents served as an attachment", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "No book with this ID, or its file is missing", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn download_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let downloaded = state.book_service.download(id).await?;
    let length = downloaded.data.len();

    Ok((
        [
            (header::CONTENT_TYPE, downloaded.content_type),
            (header::CONTENT_DISPOSITION, downloaded.content_disposition),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from(downloaded.data),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/books/search/author",
    tag = "books",
    params(AuthorSearchQuery),
    responses(
        (status = 200, description = "Books whose author contains the term, ignoring case", body = Vec<Book>)
    )
)]
pub async fn search_by_author(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthorSearchQuery>,
) -> Result<Json<Vec<Book>>> {
    let term = clean_search_term(&query.author);
    Ok(Json(state.book_service.search_by_author(&term).await?))
}

#[utoipa::path(
    get,
    path = "/api/books/search/title",
    tag = "books",
    params(TitleSearchQuery),
    responses(
        (status = 200, description = "Books whose title contains the term, ignoring case", body = Vec<Book>)
    )
)]
pub async fn search_by_title(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TitleSearchQuery>,
) -> Result<Json<Vec<Book>>> {
    let term = clean_search_term(&query.title);
    Ok(Json(state.book_service.search_by_title(&term).await?))
}

#[utoipa::path(
    get,
    path = "/api/books/sorted/title",
    tag = "books",
    responses((status = 200, description = "Books ordered by title", body = Vec<Book>))
)]
pub async fn sorted_by_title(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.book_service.sorted_by_title().await?))
}

#[utoipa::path(
    get,
    path = "/api/books/sorted/latest",
    tag = "books",
    responses((status = 200, description = "Books ordered newest first", body = Vec<Book>))
)]
pub async fn sorted_by_latest(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.book_service.sorted_by_latest().await?))
}

pub mod books;
pub mod health;

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::models::{Book, ExtractedMetadata, HealthResponse};

#[derive(OpenApi)]
#[openapi(
    info(title = "Bookvault API", description = "Book upload, download and search"),
    paths(
        books::upload_book,
        books::get_book,
        books::list_books,
        books::delete_book,
        books::download_book,
        books::search_by_author,
        books::search_by_title,
        books::sorted_by_title,
        books::sorted_by_latest,
        health::health_check,
    ),
    components(schemas(Book, ErrorResponse, ExtractedMetadata, HealthResponse)),
    tags(
        (name = "books", description = "Book storage and retrieval"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

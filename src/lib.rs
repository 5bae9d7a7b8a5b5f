pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod utils;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};
use utoipa::OpenApi;

use config::Config;
use services::book_service::BookService;
use storage::LOCAL_REFERENCE_PREFIX;

/// Room for multipart boundaries and the text fields on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every request handler
pub struct AppState {
    pub config: Config,
    pub book_service: Arc<BookService>,
}

/// Build the full HTTP application around the given state.
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config
        .max_file_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut app = Router::new()
        .nest("/api/books", routes::books::router())
        // Nesting only registers the bare prefix; existing clients call the slash form
        .route("/api/books/", get(routes::books::list_books))
        .nest("/api", routes::health::router())
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(routes::ApiDoc::openapi()) }),
        );

    if state.book_service.storage_type() == "local" {
        let local_files = LOCAL_REFERENCE_PREFIX.trim_end_matches('/');
        app = app.nest_service(local_files, ServeDir::new(&state.config.upload_path));
    }

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

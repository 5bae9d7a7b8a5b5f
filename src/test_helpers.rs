/*!
 * Test Helpers and Utilities
 *
 * Builders for configurations, services and app state with sensible test
 * defaults. Everything runs against the in-memory record store and a local
 * upload directory unless a test asks otherwise.
 */

use crate::{
    config::{CloudinaryConfig, Config, StorageMode, MEMORY_DATABASE_URL},
    db::MemoryBookStore,
    services::book_service::BookService,
    storage::{factory::create_storage_backend, StorageConfig},
    AppState,
};
use std::sync::Arc;

/// Creates a test configuration with sensible defaults
/// All fields are populated to avoid compilation errors when new fields are added
pub fn create_test_config() -> Config {
    Config {
        database_url: MEMORY_DATABASE_URL.to_string(),
        server_address: "127.0.0.1:0".to_string(),
        storage_mode: StorageMode::Local,
        upload_path: "/tmp/test_uploads".to_string(),
        max_file_size_mb: 50,
        // Cloudinary disabled by default
        cloudinary_config: None,
    }
}

/// Cloudinary credentials pointed at a mock API root
pub fn test_cloudinary_config(api_base: &str) -> CloudinaryConfig {
    CloudinaryConfig {
        cloud_name: "demo-cloud".to_string(),
        api_key: "123456789".to_string(),
        api_secret: "test-secret".to_string(),
        api_base: api_base.to_string(),
        fetch_timeout_seconds: 5,
    }
}

/// Creates a BookService over an in-memory store and local storage
pub async fn create_test_book_service(upload_path: &str) -> (Arc<BookService>, Arc<MemoryBookStore>) {
    let store = Arc::new(MemoryBookStore::new());
    let storage = create_storage_backend(StorageConfig::Local {
        upload_path: upload_path.to_string(),
    })
    .await
    .expect("Failed to create test storage backend");

    (Arc::new(BookService::new(store.clone(), storage)), store)
}

/// Creates a test AppState with custom upload path
pub async fn create_test_app_state_with_upload_path(upload_path: &str) -> Arc<AppState> {
    let mut config = create_test_config();
    config.upload_path = upload_path.to_string();
    create_test_app_state_with_config(config).await
}

/// Creates a test AppState with a custom configuration
pub async fn create_test_app_state_with_config(config: Config) -> Arc<AppState> {
    let (book_service, _) = create_test_book_service(&config.upload_path).await;
    Arc::new(AppState { config, book_service })
}

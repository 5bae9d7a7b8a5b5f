pub mod extract_metadata;
pub mod migrate_storage;

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::ExtractedMetadata;
use crate::services::pdf_metadata::extract_pdf_metadata;

/// Read a PDF from disk and pull out title, author and description.
pub async fn extract_metadata_from_file(path: &Path) -> Result<ExtractedMetadata> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    extract_pdf_metadata(&data)
        .with_context(|| format!("Failed to extract metadata from {}", path.display()))
}

/// Print the extracted metadata as pretty JSON on stdout
pub async fn print_metadata(path: &Path) -> Result<()> {
    let metadata = extract_metadata_from_file(path).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

//! Best-effort title/author/description extraction from PDF uploads
//!
//! Reads the document Info dictionary first; whatever is blank there is
//! guessed from the text of page 1. Nothing here is on the correctness path:
//! callers treat any error as "no metadata".

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::error::{BookError, Result};
use crate::models::ExtractedMetadata;

pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Characters of page-1 text kept as a description
const SUMMARY_CHARS: usize = 300;

pub fn extract_pdf_metadata(data: &[u8]) -> Result<ExtractedMetadata> {
    let doc = Document::load_mem(data)
        .map_err(|e| BookError::Unexpected(anyhow::anyhow!("Not a readable PDF: {}", e)))?;

    let mut metadata = ExtractedMetadata::default();
    if let Some(info) = info_dictionary(&doc) {
        metadata.title = dict_text(info, b"Title").unwrap_or_default();
        metadata.author = dict_text(info, b"Author").unwrap_or_default();
        metadata.description = dict_text(info, b"Subject").unwrap_or_default();
    }

    if metadata.title.trim().is_empty()
        || metadata.author.trim().is_empty()
        || metadata.description.trim().is_empty()
    {
        let first_page = first_page_text(&doc).unwrap_or_default();
        if metadata.title.trim().is_empty() {
            metadata.title = guess_title(&first_page);
        }
        if metadata.author.trim().is_empty() {
            metadata.author = UNKNOWN_AUTHOR.to_string();
        }
        if metadata.description.trim().is_empty() {
            metadata.description = summarize(&first_page);
        }
    }

    debug!("Extracted PDF metadata: {:?}", metadata);
    Ok(metadata)
}

/// The trailer's Info entry is usually an indirect reference
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    match info.as_reference() {
        Ok(id) => doc.get_dictionary(id).ok(),
        Err(_) => info.as_dict().ok(),
    }
}

fn dict_text(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let text = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_pdf_text(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// PDF text strings are UTF-16BE when they start with a BOM, otherwise
/// single-byte (close enough to Latin-1 for titles).
fn decode_pdf_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn first_page_text(doc: &Document) -> Option<String> {
    let first = *doc.get_pages().keys().next()?;
    doc.extract_text(&[first]).ok().map(|text| text.trim().to_string())
}

fn guess_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(UNTITLED)
        .to_string()
}

fn summarize(text: &str) -> String {
    if text.chars().count() > SUMMARY_CHARS {
        let cut: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

//! Canonical file names for uploaded documents
//!
//! The canonical name doubles as the dedup key and the storage identifier in
//! every backend, so it must be stable: normalizing an already normalized
//! name returns it unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BookError, Result};

/// Extensions accepted for upload
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "epub", "docx"];

/// Upper bound on a canonical name, in bytes (common filesystem limit)
pub const MAX_FILE_NAME_LEN: usize = 255;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._]").expect("valid charset regex"));

/// Lowercased extension of `name`, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || (stem.is_empty() && !name.starts_with('.')) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Turn a client-supplied file name into its canonical storage key.
///
/// Directory components are dropped, runs of whitespace become `_`, every
/// character outside `[a-zA-Z0-9._]` is removed and the result is lowercased.
///
/// # Errors
/// * `InvalidFileType` when the extension is not pdf, epub or docx
/// * `InvalidFileName` when nothing usable remains or the result is too long
pub fn normalize_file_name(raw: &str) -> Result<String> {
    // Browsers on Windows may send the full client path
    let base = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(raw)
        .trim();

    let ext = extension_of(base).unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(BookError::InvalidFileType(ext));
    }

    let underscored = WHITESPACE_RUN.replace_all(base, "_");
    let canonical = DISALLOWED_CHARS.replace_all(&underscored, "").to_lowercase();

    let stem = canonical.rsplit_once('.').map(|(stem, _)| stem).unwrap_or("");
    if stem.trim_matches(|c| c == '.' || c == '_').is_empty() {
        return Err(BookError::InvalidFileName(format!(
            "'{}' has no usable name before the extension",
            raw
        )));
    }

    if canonical.len() > MAX_FILE_NAME_LEN {
        return Err(BookError::InvalidFileName(format!(
            "file name too long ({} bytes, max {})",
            canonical.len(),
            MAX_FILE_NAME_LEN
        )));
    }

    Ok(canonical)
}

//! Content-type resolution for stored documents

use crate::utils::file_name::extension_of;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Types we always answer ourselves rather than trusting the platform table
const KNOWN_TYPES: [(&str, &str); 4] = [
    ("pdf", "application/pdf"),
    ("epub", "application/epub+zip"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("txt", "text/plain"),
];

/// Resolve the content type for a canonical key. Never fails.
///
/// Lookup order: the static table above, then a probe by file name, then
/// `application/octet-stream`.
pub fn resolve_content_type(key: &str) -> String {
    if let Some(ext) = extension_of(key) {
        if let Some((_, mime)) = KNOWN_TYPES.iter().find(|(known, _)| *known == ext) {
            return (*mime).to_string();
        }
    }

    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Content type detected from the leading bytes, if recognizable.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// Whether sniffed content plausibly matches what the name claims.
///
/// EPUB and DOCX are both ZIP containers and are often sniffed as plain zip.
pub fn content_matches_name(key: &str, data: &[u8]) -> bool {
    let Some(sniffed) = sniff_content_type(data) else {
        return true;
    };
    let expected = resolve_content_type(key);
    sniffed == expected || (sniffed == "application/zip" && matches!(extension_of(key).as_deref(), Some("epub" | "docx")))
}

/// `Content-Disposition` value forcing a download with the given name.
pub fn attachment_disposition(file_name: &str) -> String {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_table_wins() {
        assert_eq!(resolve_content_type("book.pdf"), "application/pdf");
        assert_eq!(resolve_content_type("novel.epub"), "application/epub+zip");
        assert_eq!(
            resolve_content_type("paper.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(resolve_content_type("notes.txt"), "text/plain");
    }

    #[test]
    fn test_extension_lookup_ignores_case() {
        assert_eq!(resolve_content_type("BOOK.PDF"), "application/pdf");
    }

    #[test]
    fn test_falls_back_to_name_probe() {
        assert_eq!(resolve_content_type("cover.png"), "image/png");
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        assert_eq!(resolve_content_type("x.unknownext"), OCTET_STREAM);
        assert_eq!(resolve_content_type("no_extension"), OCTET_STREAM);
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(sniff_content_type(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n"), Some("application/pdf"));
        assert!(content_matches_name("a.pdf", b"%PDF-1.4\n"));
        assert!(!content_matches_name("a.pdf", b"PK\x03\x04rest-of-zip"));
        assert!(content_matches_name("a.epub", b"PK\x03\x04rest-of-zip"));
        // unrecognized bytes are given the benefit of the doubt
        assert!(content_matches_name("a.pdf", b"hello"));
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(attachment_disposition("report.pdf"), "attachment; filename=\"report.pdf\"");
    }
}

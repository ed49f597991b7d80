use std::path::Path;
use std::sync::LazyLock;

use lopdf::Document;
use regex::bytes::Regex;

use super::sanitize::sanitize_extracted_text;
use super::types::{ExtractedDocument, PageText, TextExtractor};
use super::ExtractionError;

/// `/Encrypt` key followed by a PDF delimiter (excludes `/EncryptMetadata`).
static ENCRYPT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/Encrypt(?:[\s<\[/]|\d)").unwrap());

/// A classic `trailer` dictionary, up to its closing `>>`.
static TRAILER_DICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)trailer\s*<<(?:[^>]|>[^>])*>>").unwrap());

/// A cross-reference stream dictionary (PDF 1.5+), which replaces the trailer.
static XREF_STREAM_DICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)<<(?:[^>]|>[^>])*/Type\s*/XRef\b(?:[^>]|>[^>])*>>").unwrap()
});

/// PDF text extractor using lopdf.
/// Handles digital PDFs with embedded text layers; blank pages are skipped.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read PDF");
            ExtractionError::read(path, e)
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let document = extract_from_bytes(&name, &bytes).map_err(|e| match e {
            ExtractionError::EncryptedDocument(_) => ExtractionError::EncryptedDocument(path.into()),
            ExtractionError::DocumentRead { reason, .. } => ExtractionError::read(path, reason),
        })?;

        tracing::info!(
            file = %name,
            pages = document.page_count,
            non_blank_pages = document.pages.len(),
            chars = document.char_count(),
            "PDF text extracted"
        );
        Ok(document)
    }
}

/// Extract page text from in-memory PDF bytes.
///
/// Errors carry `name` as their path; [`PdfTextExtractor`] replaces it with
/// the real file path.
pub fn extract_from_bytes(name: &str, bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    if has_encryption_marker(bytes) {
        tracing::warn!(file = %name, "Encrypted PDF rejected");
        return Err(ExtractionError::EncryptedDocument(name.into()));
    }

    let doc = Document::load_mem(bytes).map_err(|e| map_load_error(name, e))?;
    if doc.is_encrypted() || doc.trailer.get(b"Encrypt").is_ok() {
        tracing::warn!(file = %name, "Encrypted PDF rejected");
        return Err(ExtractionError::EncryptedDocument(name.into()));
    }

    let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();
    let page_count = page_numbers.len() as u32;

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        let raw = doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractionError::read(name, format!("page {page_number}: {e}")))?;
        let text = sanitize_extracted_text(&raw);
        if text.is_empty() {
            tracing::debug!(file = %name, page = page_number, "Skipping blank page");
            continue;
        }
        pages.push(PageText { page_number, text });
    }

    Ok(ExtractedDocument {
        name: name.to_string(),
        pages,
        page_count,
    })
}

/// Cheap pre-parse check so encrypted files fail before any page is read.
///
/// Only trailer and cross-reference stream dictionaries are inspected; an
/// `/Encrypt` name inside page content or metadata does not count.
pub fn has_encryption_marker(bytes: &[u8]) -> bool {
    TRAILER_DICT
        .find_iter(bytes)
        .chain(XREF_STREAM_DICT.find_iter(bytes))
        .any(|dict| ENCRYPT_KEY.is_match(dict.as_bytes()))
}

fn map_load_error(name: &str, e: lopdf::Error) -> ExtractionError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") || lower.contains("decrypt") {
        ExtractionError::EncryptedDocument(name.into())
    } else {
        ExtractionError::read(name, format!("Failed to load PDF: {msg}"))
    }
}

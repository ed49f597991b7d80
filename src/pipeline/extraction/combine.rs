use std::path::Path;

use super::pdf::PdfTextExtractor;
use super::types::{ExtractedDocument, TextExtractor};
use super::ExtractionError;

const SUPPORTED_EXTENSION: &str = ".pdf";

/// All documents of a session, in combination order, plus the joined text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedCorpus {
    pub documents: Vec<ExtractedDocument>,
    pub text: String,
}

impl CombinedCorpus {
    pub fn from_documents(documents: Vec<ExtractedDocument>) -> Self {
        let text = documents
            .iter()
            .map(|d| format!("Document: {}\n{}", d.name, d.text()))
            .collect::<Vec<_>>()
            .join("\n\n");
        Self { documents, text }
    }

    /// True when no document yielded any page text.
    pub fn is_empty(&self) -> bool {
        self.documents.iter().all(ExtractedDocument::is_empty)
    }

    /// Largest page count among the documents.
    pub fn max_page_count(&self) -> u32 {
        self.documents.iter().map(|d| d.page_count).max().unwrap_or(0)
    }
}

/// Reads every PDF in a session directory into one corpus.
pub struct DocumentCombiner {
    extractor: Box<dyn TextExtractor + Send + Sync>,
}

impl Default for DocumentCombiner {
    fn default() -> Self {
        Self::new(Box::new(PdfTextExtractor))
    }
}

impl DocumentCombiner {
    pub fn new(extractor: Box<dyn TextExtractor + Send + Sync>) -> Self {
        Self { extractor }
    }

    /// Combine the session's PDFs in lexicographic file-name order.
    /// An empty session yields an empty corpus.
    pub fn combine(&self, session_path: &Path) -> Result<CombinedCorpus, ExtractionError> {
        let _span = tracing::info_span!("combine", session = %session_path.display()).entered();

        let entries = std::fs::read_dir(session_path).map_err(|e| {
            tracing::error!(error = %e, "Failed to list session directory");
            ExtractionError::read(session_path, e)
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ExtractionError::read(session_path, e))?.path();
            let is_pdf = path.is_file()
                && path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().ends_with(SUPPORTED_EXTENSION))
                    .unwrap_or(false);
            if is_pdf {
                files.push(path);
            }
        }
        files.sort();

        let documents = files
            .iter()
            .map(|path| self.extractor.extract(path))
            .collect::<Result<Vec<_>, _>>()?;

        let corpus = CombinedCorpus::from_documents(documents);
        tracing::info!(
            documents = corpus.documents.len(),
            chars = corpus.text.len(),
            "Documents combined"
        );
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::test_support::{make_encrypted_pdf, make_test_pdf};
    use crate::pipeline::extraction::PageText;

    #[test]
    fn empty_session_yields_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = DocumentCombiner::default().combine(dir.path()).unwrap();
        assert!(corpus.is_empty());
        assert!(corpus.text.is_empty());
        assert!(corpus.documents.is_empty());
        assert_eq!(corpus.max_page_count(), 0);
    }

    #[test]
    fn missing_session_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DocumentCombiner::default().combine(&dir.path().join("gone"));
        assert!(matches!(result, Err(ExtractionError::DocumentRead { .. })));
    }

    #[test]
    fn documents_combined_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_lease.pdf"), make_test_pdf(&["Lease text"])).unwrap();
        std::fs::write(
            dir.path().join("a_rental.PDF"),
            make_test_pdf(&["Rental text", "Second page"]),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a pdf").unwrap();

        let corpus = DocumentCombiner::default().combine(dir.path()).unwrap();

        assert_eq!(corpus.documents.len(), 2);
        assert_eq!(corpus.documents[0].name, "a_rental.PDF");
        assert_eq!(corpus.documents[1].name, "b_lease.pdf");
        assert_eq!(corpus.max_page_count(), 2);

        let first = corpus.text.find("Document: a_rental.PDF").unwrap();
        let second = corpus.text.find("Document: b_lease.pdf").unwrap();
        assert!(first < second);
        assert!(corpus.text.contains("\n\nDocument: b_lease.pdf\n"));
    }

    #[test]
    fn encrypted_member_fails_combination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), make_test_pdf(&["Open"])).unwrap();
        std::fs::write(dir.path().join("b.pdf"), make_encrypted_pdf()).unwrap();

        let result = DocumentCombiner::default().combine(dir.path());
        assert!(matches!(result, Err(ExtractionError::EncryptedDocument(_))));
    }

    #[test]
    fn from_documents_formats_headers() {
        let corpus = CombinedCorpus::from_documents(vec![
            ExtractedDocument {
                name: "one.pdf".into(),
                pages: vec![PageText { page_number: 1, text: "A".into() }],
                page_count: 1,
            },
            ExtractedDocument {
                name: "two.pdf".into(),
                pages: vec![PageText { page_number: 1, text: "B".into() }],
                page_count: 1,
            },
        ]);
        assert_eq!(
            corpus.text,
            "Document: one.pdf\n\n--- Page 1 ---\nA\n\nDocument: two.pdf\n\n--- Page 1 ---\nB"
        );
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Text of one non-blank page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number in the source PDF.
    pub page_number: u32,
    pub text: String,
}

/// Text extracted from a single document.
///
/// `pages` is ordered by strictly increasing `page_number`. Blank pages are
/// not represented; `page_count` still counts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub name: String,
    pub pages: Vec<PageText>,
    pub page_count: u32,
}

impl ExtractedDocument {
    /// Page blocks joined into the text handed to the model.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| format!("\n--- Page {} ---\n{}", p.page_number, p.text))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Document text extraction (allows mocking)
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_renders_page_markers() {
        let doc = ExtractedDocument {
            name: "lease.pdf".into(),
            pages: vec![
                PageText { page_number: 1, text: "Parties".into() },
                PageText { page_number: 3, text: "Rent".into() },
            ],
            page_count: 3,
        };
        assert_eq!(doc.text(), "\n--- Page 1 ---\nParties\n--- Page 3 ---\nRent");
        assert_eq!(doc.char_count(), 11);
        assert!(!doc.is_empty());
    }
}

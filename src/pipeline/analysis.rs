//! Single-document analysis: extracted text in, structured metadata out.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::extraction::{ExtractionError, PdfTextExtractor, TextExtractor};
use crate::pipeline::llm::LlmClient;
use crate::pipeline::prompt_templates::{PromptId, PromptRegistry};
use crate::pipeline::structuring::{Metadata, StructuredParser, StructuringError};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Document has no extractable text: {0}")]
    EmptyDocument(PathBuf),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),
}

/// Extracts estate metadata and a summary from one document.
pub struct DocumentAnalyzer {
    model: Box<dyn LlmClient + Send + Sync>,
    extractor: Box<dyn TextExtractor + Send + Sync>,
    prompts: PromptRegistry,
    parser: StructuredParser<Metadata>,
}

impl DocumentAnalyzer {
    pub fn new(model: Box<dyn LlmClient + Send + Sync>) -> Self {
        tracing::info!(model = %model.describe(), "Document analyzer initialized");
        Self {
            model,
            extractor: Box::new(PdfTextExtractor),
            prompts: PromptRegistry::new(),
            parser: StructuredParser::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor + Send + Sync>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Analyze already-extracted document text.
    pub fn analyze(&self, document_text: &str) -> Result<Metadata, AnalysisError> {
        let _span = tracing::info_span!("analyze_document", chars = document_text.len()).entered();

        let instructions = self.parser.format_instructions();
        let prompt = self
            .prompts
            .template(PromptId::EstateDocumentAnalysis)
            .render(&[
                ("format_instructions", instructions.as_str()),
                ("document_text", document_text),
            ])
            .map_err(StructuringError::from)?;

        let response = self.model.invoke(&prompt).map_err(|e| {
            tracing::error!(error = %e, "Analysis model call failed");
            StructuringError::from(e)
        })?;

        let metadata = self
            .parser
            .parse_with_repair(&response, self.model.as_ref(), &self.prompts)?;

        tracing::info!(
            title = %metadata.title,
            summary_points = metadata.summary.len(),
            "Metadata extraction successful"
        );
        Ok(metadata)
    }

    /// Extract text from `path`, then analyze it.
    pub fn analyze_file(&self, path: &Path) -> Result<Metadata, AnalysisError> {
        let document = self.extractor.extract(path)?;
        if document.is_empty() {
            tracing::warn!(path = %path.display(), "Document has no extractable text");
            return Err(AnalysisError::EmptyDocument(path.to_path_buf()));
        }
        self.analyze(&document.text())
    }
}

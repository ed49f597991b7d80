//! Document comparison: combine a session's PDFs, ask the model for
//! page-level differences, and parse them into a `ComparisonResult`.
//!
//! The operation is all-or-nothing: either a complete result is returned
//! or an error propagates.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::extraction::{CombinedCorpus, DocumentCombiner, ExtractionError};
use crate::pipeline::llm::LlmClient;
use crate::pipeline::prompt_templates::{PromptId, PromptRegistry};
use crate::pipeline::structuring::{
    page_coverage_validator, ChangeRecord, ComparisonResult, StructuredParser, StructuringError,
};

#[derive(Error, Debug)]
pub enum ComparisonError {
    #[error("No text could be extracted from the documents in {0}")]
    EmptyCorpus(PathBuf),

    #[error("No document text to compare")]
    EmptyText,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),
}

/// Behavior switches for a comparison run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonOptions {
    /// Require a record for every page of the longest document.
    pub enforce_page_coverage: bool,
}

pub struct ComparisonPipeline {
    model: Box<dyn LlmClient + Send + Sync>,
    combiner: DocumentCombiner,
    prompts: PromptRegistry,
    options: ComparisonOptions,
}

impl ComparisonPipeline {
    pub fn new(model: Box<dyn LlmClient + Send + Sync>) -> Self {
        tracing::info!(model = %model.describe(), "Comparison pipeline initialized");
        Self {
            model,
            combiner: DocumentCombiner::default(),
            prompts: PromptRegistry::new(),
            options: ComparisonOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ComparisonOptions) -> Self {
        self.options = options;
        self
    }

    /// Compare every PDF stored in `session_path`.
    pub fn compare(&self, session_path: &Path) -> Result<ComparisonResult, ComparisonError> {
        let _span = tracing::info_span!("compare_documents", session = %session_path.display()).entered();

        // Step 1: Combine the session's documents
        let corpus = self.combiner.combine(session_path)?;
        if corpus.is_empty() {
            tracing::warn!(session = %session_path.display(), "Comparison corpus is empty");
            return Err(ComparisonError::EmptyCorpus(session_path.to_path_buf()));
        }

        tracing::info!(max_pages = corpus.max_page_count(), "Comparison corpus ready");

        // Step 2: Prompt, invoke, parse
        self.compare_corpus(&corpus)
    }

    /// Compare an already-combined corpus text.
    pub fn compare_text(&self, combined_docs: &str) -> Result<ComparisonResult, ComparisonError> {
        if combined_docs.trim().is_empty() {
            return Err(ComparisonError::EmptyText);
        }
        self.run(combined_docs, None)
    }

    /// Compare an in-memory corpus, honoring the page coverage option.
    pub fn compare_corpus(&self, corpus: &CombinedCorpus) -> Result<ComparisonResult, ComparisonError> {
        if corpus.is_empty() {
            return Err(ComparisonError::EmptyText);
        }
        let expected_pages = self
            .options
            .enforce_page_coverage
            .then(|| corpus.max_page_count());
        self.run(&corpus.text, expected_pages)
    }

    fn run(&self, combined_docs: &str, expected_pages: Option<u32>) -> Result<ComparisonResult, ComparisonError> {
        let mut parser = StructuredParser::<Vec<ChangeRecord>>::new();
        if let Some(pages) = expected_pages {
            parser = parser.with_validator(page_coverage_validator(pages));
        }

        let instructions = parser.format_instructions();
        let prompt = self
            .prompts
            .template(PromptId::EstateDocumentComparison)
            .render(&[
                ("combined_docs", combined_docs),
                ("format_instruction", instructions.as_str()),
            ])
            .map_err(StructuringError::from)?;

        tracing::info!("Invoking document comparison");
        let response = self.model.invoke(&prompt).map_err(|e| {
            tracing::error!(error = %e, "Comparison model call failed");
            StructuringError::from(e)
        })?;

        let records = parser.parse_with_repair(&response, self.model.as_ref(), &self.prompts)?;
        let result = ComparisonResult::new(records);

        tracing::info!(
            records = result.len(),
            unchanged = result.unchanged_pages().len(),
            "Comparison completed"
        );
        Ok(result)
    }
}

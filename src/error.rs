//! Crate-level error and its caller-facing classification.

use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::logging::LoggingError;
use crate::pipeline::analysis::AnalysisError;
use crate::pipeline::comparison::ComparisonError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::ingestion::IngestionError;
use crate::pipeline::llm::LlmError;
use crate::pipeline::prompt_templates::PromptError;
use crate::pipeline::structuring::StructuringError;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fix configuration or credentials before retrying.
    Configuration,
    /// The upload or document itself is unusable.
    Input,
    /// Network or model-output problem; resubmitting may succeed.
    Transient,
}

#[derive(Error, Debug)]
pub enum EstateError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

impl EstateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization(_)
            | Self::Config(_)
            | Self::Credential(_)
            | Self::Logging(_)
            | Self::Prompt(_) => ErrorKind::Configuration,
            Self::Ingestion(e) => match e {
                IngestionError::Io { .. } => ErrorKind::Transient,
                _ => ErrorKind::Input,
            },
            Self::Extraction(_) => ErrorKind::Input,
            Self::Llm(e) => llm_kind(e),
            Self::Structuring(e) => structuring_kind(e),
            Self::Analysis(e) => match e {
                AnalysisError::EmptyDocument(_) | AnalysisError::Extraction(_) => ErrorKind::Input,
                AnalysisError::Structuring(e) => structuring_kind(e),
            },
            Self::Comparison(e) => match e {
                ComparisonError::EmptyCorpus(_)
                | ComparisonError::EmptyText
                | ComparisonError::Extraction(_) => ErrorKind::Input,
                ComparisonError::Structuring(e) => structuring_kind(e),
            },
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

fn llm_kind(e: &LlmError) -> ErrorKind {
    if e.is_transient() {
        ErrorKind::Transient
    } else {
        ErrorKind::Configuration
    }
}

fn structuring_kind(e: &StructuringError) -> ErrorKind {
    match e {
        StructuringError::SchemaParse { .. } => ErrorKind::Transient,
        StructuringError::Model(e) => llm_kind(e),
        StructuringError::Prompt(_) => ErrorKind::Configuration,
    }
}

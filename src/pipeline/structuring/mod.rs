pub mod types;
pub mod schema;
pub mod parser;

pub use types::*;
pub use schema::*;
pub use parser::*;

use thiserror::Error;

use crate::pipeline::llm::LlmError;
use crate::pipeline::prompt_templates::PromptError;

#[derive(Error, Debug)]
pub enum StructuringError {
    /// The response (and its single repair attempt, if any) did not match the schema.
    #[error("Model response does not match the expected schema: {reason}")]
    SchemaParse {
        reason: String,
        raw: String,
        repair_raw: Option<String>,
    },

    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
}

impl StructuringError {
    /// Whether resubmitting the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SchemaParse { .. } => true,
            Self::Model(e) => e.is_transient(),
            Self::Prompt(_) => false,
        }
    }
}

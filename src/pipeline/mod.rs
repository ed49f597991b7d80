pub mod ingestion;
pub mod extraction;
pub mod prompt_templates;
pub mod llm;
pub mod model_router; // Provider key → ready model handle
pub mod structuring;
pub mod analysis;
pub mod comparison;

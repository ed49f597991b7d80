pub mod types;
pub mod sanitize;
pub mod pdf;
pub mod combine;

#[cfg(test)]
pub(crate) mod test_support;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use combine::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF is password-protected: {0}")]
    EncryptedDocument(PathBuf),

    #[error("Could not read document {path}: {reason}")]
    DocumentRead { path: PathBuf, reason: String },
}

impl ExtractionError {
    pub(crate) fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DocumentRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

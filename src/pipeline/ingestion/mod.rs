pub mod session;
pub mod upload;

pub use session::*;
pub use upload::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Invalid file type '{file_name}': only {allowed} files are allowed")]
    InvalidFileType { file_name: String, allowed: String },

    #[error("Invalid file name: '{0}'")]
    InvalidFileName(String),

    #[error("Duplicate file name '{0}' in one upload batch")]
    DuplicateFileName(String),

    #[error("Invalid session id: '{0}'")]
    InvalidSessionId(String),

    #[error("Could not read upload '{file_name}': {source}")]
    UploadRead {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem error in session '{session_id}' at {path}: {source}")]
    Io {
        session_id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

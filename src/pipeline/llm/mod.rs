pub mod types;
pub mod http;
pub mod google;
pub mod groq;

#[cfg(test)]
pub(crate) mod mock;

pub use types::*;
pub use google::*;
pub use groq::*;

use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::CredentialError;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("Provider '{0}' has no model_name configured")]
    MissingModelName(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(String),

    #[error("{provider} is unreachable at {url}")]
    Connection { provider: String, url: String },

    #[error("{provider} request timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("{provider} returned error (status {status}): {body}")]
    ProviderError {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Malformed {provider} response: {reason}")]
    ResponseParsing { provider: String, reason: String },
}

impl LlmError {
    /// Network or provider-side failures that may succeed on resubmission.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. }
            | Self::Timeout { .. }
            | Self::HttpClient(_)
            | Self::ResponseParsing { .. } => true,
            Self::ProviderError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

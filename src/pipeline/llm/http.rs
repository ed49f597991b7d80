//! Shared blocking HTTP plumbing for the provider clients.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use super::types::GenerationSettings;
use super::LlmError;

/// Build a blocking client. A `None` timeout means requests never time out.
pub fn build_client(settings: &GenerationSettings) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(|e| LlmError::ClientInit(e.to_string()))
}

/// Map a transport failure into an `LlmError`.
pub fn map_send_error(
    provider: &str,
    base_url: &str,
    settings: &GenerationSettings,
    e: reqwest::Error,
) -> LlmError {
    if e.is_connect() {
        LlmError::Connection {
            provider: provider.to_string(),
            url: base_url.to_string(),
        }
    } else if e.is_timeout() {
        LlmError::Timeout {
            provider: provider.to_string(),
            secs: settings.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }
    } else {
        LlmError::HttpClient(e.to_string())
    }
}

/// Reject non-2xx responses, then decode the JSON body.
pub fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::error!(provider, status = status.as_u16(), "Provider returned an error");
        return Err(LlmError::ProviderError {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response.json().map_err(|e| LlmError::ResponseParsing {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

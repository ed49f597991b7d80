use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::LlmError;

/// Model backends the gateway can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Groq,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Groq => "groq",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "groq" => Ok(Self::Groq),
            _ => Err(LlmError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Resolved per-model generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model_name: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// `None` disables the request timeout.
    pub timeout: Option<Duration>,
    pub base_url: Option<String>,
}

/// Chat/completion model abstraction (allows mocking).
pub trait LlmClient {
    /// Send one prompt and return the raw response text.
    fn invoke(&self, prompt: &str) -> Result<String, LlmError>;

    /// `<provider>:<model>` label for logs.
    fn describe(&self) -> String;
}

/// Text embedding abstraction.
pub trait EmbeddingClient {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// A loaded chat model, as returned by the model gateway.
pub struct ModelHandle {
    provider_key: String,
    provider: ProviderKind,
    settings: GenerationSettings,
    client: Box<dyn LlmClient + Send + Sync>,
}

impl ModelHandle {
    pub fn new(
        provider_key: impl Into<String>,
        provider: ProviderKind,
        settings: GenerationSettings,
        client: Box<dyn LlmClient + Send + Sync>,
    ) -> Self {
        Self {
            provider_key: provider_key.into(),
            provider,
            settings,
            client,
        }
    }

    pub fn provider_key(&self) -> &str {
        &self.provider_key
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("provider_key", &self.provider_key)
            .field("provider", &self.provider)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LlmClient for ModelHandle {
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        self.client.invoke(prompt)
    }

    fn describe(&self) -> String {
        self.client.describe()
    }
}

/// A loaded embedding model.
pub struct EmbeddingHandle {
    model_name: String,
    client: Box<dyn EmbeddingClient + Send + Sync>,
}

impl EmbeddingHandle {
    pub fn new(model_name: impl Into<String>, client: Box<dyn EmbeddingClient + Send + Sync>) -> Self {
        Self {
            model_name: model_name.into(),
            client,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl fmt::Debug for EmbeddingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingHandle")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl EmbeddingClient for EmbeddingHandle {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.client.embed_query(text)
    }
}

//! Model gateway: resolves a provider key from configuration into a
//! ready-to-call chat model or embedding model.
//!
//! Resolution order for the provider key:
//! 1. Explicit argument
//! 2. `LLM_PROVIDER` (captured in `AppConfig`)
//! 3. `google`
//!
//! Loading never touches the network; the first request happens on `invoke`.

use std::time::Duration;

use crate::config::{AppConfig, ModelConfig};
use crate::credentials::{ApiKeyManager, GOOGLE_API_KEY, GROQ_API_KEY};
use crate::pipeline::llm::{
    EmbeddingHandle, GenerationSettings, GoogleChatClient, GoogleEmbeddingClient, GroqChatClient,
    LlmClient, LlmError, ModelHandle, ProviderKind,
};

// ──────────────────────────────────────────────
// Gateway
// ──────────────────────────────────────────────

/// Builds model handles from immutable config and credentials.
#[derive(Debug)]
pub struct ModelGateway {
    config: ModelConfig,
    default_provider: String,
    keys: ApiKeyManager,
}

impl ModelGateway {
    pub fn new(config: ModelConfig, app: &AppConfig, keys: ApiKeyManager) -> Self {
        Self {
            config,
            default_provider: app.default_provider.clone(),
            keys,
        }
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Resolve the generation settings for a provider key without
    /// constructing a client.
    pub fn resolve(&self, provider_key: Option<&str>) -> Result<(String, ProviderKind, GenerationSettings), LlmError> {
        let key = provider_key.unwrap_or(&self.default_provider);

        let block = self.config.provider(key).ok_or_else(|| {
            tracing::error!(provider_key = key, "Provider key not found in configuration");
            LlmError::UnsupportedProvider(key.to_string())
        })?;

        let provider: ProviderKind = block
            .provider
            .as_deref()
            .ok_or_else(|| LlmError::UnsupportedProvider(format!("{key} (no provider set)")))?
            .parse()?;

        let model_name = block
            .model_name
            .clone()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LlmError::MissingModelName(key.to_string()))?;

        let settings = GenerationSettings {
            model_name,
            temperature: block.temperature(),
            max_output_tokens: block.max_output_tokens(),
            timeout: block.request_timeout_secs.map(Duration::from_secs),
            base_url: block.base_url.clone(),
        };

        Ok((key.to_string(), provider, settings))
    }

    /// Load the chat model for `provider_key` (or the default provider).
    pub fn load_model(&self, provider_key: Option<&str>) -> Result<ModelHandle, LlmError> {
        let (key, provider, settings) = self.resolve(provider_key)?;

        tracing::info!(
            provider_key = %key,
            provider = %provider,
            model = %settings.model_name,
            temperature = settings.temperature,
            max_output_tokens = settings.max_output_tokens,
            "Initializing LLM"
        );

        let client: Box<dyn LlmClient + Send + Sync> = match provider {
            ProviderKind::Google => Box::new(GoogleChatClient::new(
                self.keys.get(GOOGLE_API_KEY)?,
                settings.clone(),
            )?),
            ProviderKind::Groq => Box::new(GroqChatClient::new(
                self.keys.get(GROQ_API_KEY)?,
                settings.clone(),
            )?),
        };

        Ok(ModelHandle::new(key, provider, settings, client))
    }

    /// Load the configured Google embedding model.
    pub fn load_embeddings(&self) -> Result<EmbeddingHandle, LlmError> {
        let model_name = self.config.embedding_model_name()?;
        tracing::info!(model = model_name, "Initializing embedding model");

        let settings = GenerationSettings {
            model_name: model_name.to_string(),
            temperature: 0.0,
            max_output_tokens: 0,
            timeout: None,
            base_url: self
                .config
                .provider(ProviderKind::Google.as_str())
                .and_then(|p| p.base_url.clone()),
        };
        let client = GoogleEmbeddingClient::new(self.keys.get(GOOGLE_API_KEY)?, model_name, settings)?;

        Ok(EmbeddingHandle::new(client.model_name().to_string(), Box::new(client)))
    }
}

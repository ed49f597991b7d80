use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::http::{build_client, map_send_error, read_json};
use super::types::{EmbeddingClient, GenerationSettings, LlmClient};
use super::LlmError;

pub const GOOGLE_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const PROVIDER: &str = "google";

/// Gemini chat client (generateContent endpoint).
pub struct GoogleChatClient {
    base_url: String,
    api_key: Zeroizing<String>,
    settings: GenerationSettings,
    client: reqwest::blocking::Client,
}

impl GoogleChatClient {
    pub fn new(api_key: &str, settings: GenerationSettings) -> Result<Self, LlmError> {
        let client = build_client(&settings)?;
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(GOOGLE_DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            base_url,
            api_key: Zeroizing::new(api_key.to_string()),
            settings,
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.settings.model_name
        )
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        Some(text)
    }
}

impl LlmClient for GoogleChatClient {
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .map_err(|e| map_send_error(PROVIDER, &self.base_url, &self.settings, e))?;

        let parsed: GenerateContentResponse = read_json(PROVIDER, response)?;
        parsed.into_text().ok_or_else(|| LlmError::ResponseParsing {
            provider: PROVIDER.into(),
            reason: "response contained no candidates".into(),
        })
    }

    fn describe(&self) -> String {
        format!("{PROVIDER}:{}", self.settings.model_name)
    }
}

/// Gemini embedding client (embedContent endpoint).
pub struct GoogleEmbeddingClient {
    base_url: String,
    api_key: Zeroizing<String>,
    model_name: String,
    settings: GenerationSettings,
    client: reqwest::blocking::Client,
}

impl GoogleEmbeddingClient {
    /// `model_name` is accepted with or without the `models/` prefix.
    pub fn new(api_key: &str, model_name: &str, settings: GenerationSettings) -> Result<Self, LlmError> {
        let client = build_client(&settings)?;
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(GOOGLE_DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let model_name = if model_name.starts_with("models/") {
            model_name.to_string()
        } else {
            format!("models/{model_name}")
        };

        Ok(Self {
            base_url,
            api_key: Zeroizing::new(api_key.to_string()),
            model_name,
            settings,
            client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/{}:embedContent", self.base_url, self.model_name)
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Embedding,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

impl EmbeddingClient for GoogleEmbeddingClient {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbedContentRequest {
            model: &self.model_name,
            content: Content {
                role: "user",
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .map_err(|e| map_send_error(PROVIDER, &self.base_url, &self.settings, e))?;

        let parsed: EmbedContentResponse = read_json(PROVIDER, response)?;
        Ok(parsed.embedding.values)
    }
}

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::http::{build_client, map_send_error, read_json};
use super::types::{GenerationSettings, LlmClient};
use super::LlmError;

pub const GROQ_DEFAULT_BASE_URL: &str = "https://api.groq.com";

const PROVIDER: &str = "groq";

/// Groq chat client (OpenAI-compatible chat completions).
pub struct GroqChatClient {
    base_url: String,
    api_key: Zeroizing<String>,
    settings: GenerationSettings,
    client: reqwest::blocking::Client,
}

impl GroqChatClient {
    pub fn new(api_key: &str, settings: GenerationSettings) -> Result<Self, LlmError> {
        let client = build_client(&settings)?;
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(GROQ_DEFAULT_BASE_URL)
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
        format!("{}/openai/v1/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient for GroqChatClient {
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.settings.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_output_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .map_err(|e| map_send_error(PROVIDER, &self.base_url, &self.settings, e))?;

        let parsed: ChatCompletionResponse = read_json(PROVIDER, response)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ResponseParsing {
                provider: PROVIDER.into(),
                reason: "response contained no choices".into(),
            })
    }

    fn describe(&self) -> String {
        format!("{PROVIDER}:{}", self.settings.model_name)
    }
}

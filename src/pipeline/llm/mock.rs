//! Scripted LLM client for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::types::LlmClient;
use super::LlmError;

enum Reply {
    Text(String),
    Status(u16),
}

/// Returns scripted replies in order; the last one repeats. Records prompts.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_sequence(&[response])
    }

    pub fn with_sequence(responses: &[&str]) -> Self {
        Self::from_replies(responses.iter().map(|r| Reply::Text(r.to_string())).collect())
    }

    /// Every call fails with a provider error carrying `status`.
    pub fn failing(status: u16) -> Self {
        Self::from_replies(VecDeque::from([Reply::Status(status)]))
    }

    fn from_replies(replies: VecDeque<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmClient for MockLlmClient {
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().map(|r| match r {
                Reply::Text(t) => Reply::Text(t.clone()),
                Reply::Status(s) => Reply::Status(*s),
            })
        };

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Status(status)) => Err(LlmError::ProviderError {
                provider: "mock".into(),
                status,
                body: "scripted failure".into(),
            }),
            None => Ok(String::new()),
        }
    }

    fn describe(&self) -> String {
        "mock:scripted".into()
    }
}

/// Lets a test keep a handle on the mock after boxing it into a pipeline.
impl LlmClient for Arc<MockLlmClient> {
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        self.as_ref().invoke(prompt)
    }

    fn describe(&self) -> String {
        self.as_ref().describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        assert_eq!(client.invoke("prompt").unwrap(), "test response");
        assert_eq!(client.invoke("again").unwrap(), "test response");
        assert_eq!(client.calls(), 2);
    }

    #[test]
    fn sequence_replays_in_order_then_repeats_last() {
        let client = MockLlmClient::with_sequence(&["first", "second"]);
        assert_eq!(client.invoke("a").unwrap(), "first");
        assert_eq!(client.invoke("b").unwrap(), "second");
        assert_eq!(client.invoke("c").unwrap(), "second");
        assert_eq!(client.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_client_reports_status() {
        let client = MockLlmClient::failing(503);
        let err = client.invoke("x").unwrap_err();
        assert!(matches!(err, LlmError::ProviderError { status: 503, .. }));
        assert!(err.is_transient());
    }
}

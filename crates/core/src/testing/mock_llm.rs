//! Mock LLM client for testing.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

/// Mock implementation of the LlmClient trait.
///
/// Answers every request with a canned response text.
#[derive(Debug)]
pub struct MockLlmClient {
    response: Mutex<String>,
    requests: Mutex<Vec<CompletionRequest>>,
    /// If set, the next call fails with this error.
    next_error: Mutex<Option<LlmError>>,
    delay: Mutex<Duration>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Mutex::new(response.to_string()),
            requests: Mutex::new(Vec::new()),
            next_error: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Replace the canned response.
    pub fn set_response(&self, response: &str) {
        *self.response.lock().unwrap() = response.to_string();
    }

    /// Configure the next call to fail with the given error.
    pub fn set_next_error(&self, error: LlmError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Set the simulated latency of each call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Requests received so far.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        let text = self.response.lock().unwrap().clone();
        Ok(CompletionResponse {
            usage: LlmUsage {
                input_tokens: 100,
                output_tokens: (text.len() / 4) as u32,
            },
            text,
            model: "mock-model".to_string(),
        })
    }
}

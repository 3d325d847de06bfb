//! Mock LLM provider for testing
//!
//! Every request is answered by a responder closure that sees the request and
//! the zero-based call number, so tests can echo prompts, fail on a given
//! call, or return canned content. All requests are recorded.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

type Responder = Box<dyn Fn(&LlmRequest, usize) -> Result<String> + Send + Sync>;

pub struct MockProvider {
    responder: Responder,
    call_count: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
    name: &'static str,
}

impl MockProvider {
    /// Create a provider answering with `responder(request, call_number)`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest, usize) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            name: "mock",
        }
    }

    /// A provider that returns each prompt unchanged
    pub fn echo() -> Self {
        Self::new(|request, _| Ok(request.prompt.clone()))
    }

    /// A provider that always returns `response`
    pub fn always_succeeds(response: &str) -> Self {
        let response = response.to_string();
        Self::new(move |_, _| Ok(response.clone()))
    }

    /// A provider that always fails with an HTTP 500 carrying `message`
    pub fn always_fails(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_, _| {
            Err(LlmError::Status {
                status: 500,
                message: message.clone(),
            })
        })
    }

    /// A provider that echoes prompts but fails on call number `n` (zero-based)
    pub fn fails_on_call(n: usize) -> Self {
        Self::new(move |request, call| {
            if call == n {
                Err(LlmError::ServerOverloaded {
                    message: format!("mock failure on call {}", call),
                })
            } else {
                Ok(request.prompt.clone())
            }
        })
    }

    /// Get the number of times complete() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Set a custom provider name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let content = (self.responder)(&request, call_num)?;

        Ok(LlmResponse {
            content,
            model: "mock-model".to_string(),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let provider = MockProvider::echo();
        let result = provider.complete(LlmRequest::new("ping")).await.unwrap();

        assert_eq!(result.content, "ping");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.requests()[0].prompt, "ping");
    }

    #[tokio::test]
    async fn test_always_fails() {
        let provider = MockProvider::always_fails("boom");

        for _ in 0..3 {
            let result = provider.complete(LlmRequest::new("test")).await;
            assert!(matches!(result, Err(LlmError::Status { status: 500, .. })));
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fails_on_call() {
        let provider = MockProvider::fails_on_call(1);

        assert!(provider.complete(LlmRequest::new("a")).await.is_ok());
        assert!(provider.complete(LlmRequest::new("b")).await.is_err());
        assert_eq!(provider.complete(LlmRequest::new("c")).await.unwrap().content, "c");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_succeeds_with_name() {
        let provider = MockProvider::always_succeeds("fixed").with_name("canned");
        assert_eq!(provider.name(), "canned");
        assert_eq!(
            provider.complete(LlmRequest::new("x")).await.unwrap().content,
            "fixed"
        );
    }
}

//! OpenAI-compatible API provider
//!
//! Used for any server implementing the OpenAI chat completions API
//! (OpenAI itself, OpenRouter, local llama.cpp / Ollama servers, ...).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::chat::{ChatCompletionRequest, ChatCompletionResponse, error_from_response};
use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

const PROVIDER_NAME: &str = "OpenAI-compatible";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider for OpenAI-compatible APIs
pub struct OpenAICompatibleProvider {
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider
    ///
    /// `api_key` may be omitted for local servers that do not authenticate.
    pub fn new(
        model: &str,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmProvider for OpenAICompatibleProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let chat_request = ChatCompletionRequest::from_request(&self.model, &request);
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self.client.post(&url).json(&chat_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| LlmError::Transport {
            provider: PROVIDER_NAME,
            source: e,
        })?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let chat_response: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::MalformedResponse {
                provider: PROVIDER_NAME,
                message: e.to_string(),
            })?;

        let (content, usage) = chat_response.into_parts();
        let content = content.ok_or(LlmError::EmptyResponse(PROVIDER_NAME))?;

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            usage,
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(LlmError::ProviderUnavailable(
                format!("{} base URL must be http(s), got '{}'", PROVIDER_NAME, self.base_url),
            ));
        }
        Ok(())
    }
}

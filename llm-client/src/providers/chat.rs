//! Wire types shared by providers speaking the chat completions protocol
//!
//! GigaChat and OpenAI-compatible servers accept the same request body and
//! return the same `choices[].message.content` shape.

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmRequest, TokenUsage};

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    pub fn from_request(model: &str, request: &LlmRequest) -> Self {
        let mut messages = Vec::with_capacity(2);

        if let Some(system) = &request.system_prompt {
            messages.push(Message {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        Self {
            model: model.to_string(),
            messages,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    pub fn into_parts(self) -> (Option<String>, Option<TokenUsage>) {
        let content = self
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content);

        let usage = self.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        (content, usage)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// OpenAI servers nest the message under `error`, GigaChat returns it flat.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Nested { error: ErrorBody },
    Flat { message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a failed HTTP status and its body to an `LlmError`
pub(crate) fn error_from_status(
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> LlmError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse::Nested { error }) => error.message,
        Ok(ErrorResponse::Flat { message }) => message,
        Err(_) => body.to_string(),
    };

    match status.as_u16() {
        status @ (401 | 403) => LlmError::Unauthorized { status, message },
        429 => LlmError::RateLimited { retry_after },
        503 => LlmError::ServerOverloaded { message },
        status => LlmError::Status { status, message },
    }
}

/// Consume a non-success response into an `LlmError`
pub(crate) async fn error_from_response(response: Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let body = response.text().await.unwrap_or_default();

    error_from_status(status, &body, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_includes_system_message_first() {
        let request = LlmRequest::new("translate me").with_system_prompt("you translate");
        let body = serde_json::to_value(ChatCompletionRequest::from_request("GigaChat", &request))
            .unwrap();

        assert_eq!(body["model"], "GigaChat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "translate me");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_response_into_parts() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Hola"}, "index": 0}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let (content, usage) = response.into_parts();

        assert_eq!(content.as_deref(), Some("Hola"));
        assert_eq!(
            usage,
            Some(TokenUsage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn test_error_from_status() {
        let err = error_from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "bad model"}}"#,
            None,
        );
        assert!(matches!(
            err,
            LlmError::Status { status: 400, ref message } if message == "bad model"
        ));

        let err = error_from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"status": 401, "message": "Token has expired"}"#,
            None,
        );
        assert!(matches!(
            err,
            LlmError::Unauthorized { status: 401, ref message } if message == "Token has expired"
        ));

        let err = error_from_status(StatusCode::TOO_MANY_REQUESTS, "", Some(30));
        assert!(matches!(err, LlmError::RateLimited { retry_after: Some(30) }));

        let err = error_from_status(StatusCode::SERVICE_UNAVAILABLE, "busy", None);
        assert!(matches!(err, LlmError::ServerOverloaded { ref message } if message == "busy"));
    }
}

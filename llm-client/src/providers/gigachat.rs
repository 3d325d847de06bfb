//! GigaChat API provider
//!
//! The authorization key is exchanged for a short-lived bearer token at the
//! OAuth endpoint; chat requests then go to the chat completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use super::chat::{ChatCompletionRequest, ChatCompletionResponse, error_from_response};
use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

pub const GIGACHAT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const GIGACHAT_API_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

const PROVIDER_NAME: &str = "GigaChat";

/// Tokens are refreshed this long before they actually expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Endpoints and credentials for a GigaChat provider
#[derive(Debug, Clone)]
pub struct GigaChatSettings {
    pub model: String,
    pub credentials: String,
    pub scope: String,
    pub auth_url: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GigaChatSettings {
    pub fn new(model: &str, credentials: String) -> Self {
        Self {
            model: model.to_string(),
            credentials,
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: GIGACHAT_AUTH_URL.to_string(),
            base_url: GIGACHAT_API_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Any HTTP failure at the OAuth endpoint is a token exchange failure
fn token_exchange_error(err: LlmError) -> LlmError {
    match err {
        LlmError::Unauthorized { status, message } | LlmError::Status { status, message } => {
            LlmError::TokenExchange {
                provider: PROVIDER_NAME,
                message,
                status: Some(status),
            }
        }
        other => other,
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: SystemTime,
}

impl AccessToken {
    fn is_fresh(&self, now: SystemTime) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Milliseconds since the Unix epoch
    expires_at: u64,
}

/// Provider for the GigaChat chat completions API
pub struct GigaChatProvider {
    settings: GigaChatSettings,
    client: Client,
    token: Mutex<Option<AccessToken>>,
}

impl GigaChatProvider {
    pub fn new(mut settings: GigaChatSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        settings.base_url = settings.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            settings,
            client,
            token: Mutex::new(None),
        })
    }

    /// Return a cached access token, fetching a new one when it is close to expiry
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(SystemTime::now())) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        log::debug!("requesting GigaChat access token (scope {})", self.settings.scope);

        let response = self
            .client
            .post(&self.settings.auth_url)
            .header("Authorization", format!("Basic {}", self.settings.credentials))
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("scope={}", self.settings.scope))
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                provider: PROVIDER_NAME,
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(token_exchange_error(error_from_response(response).await));
        }

        let token: TokenResponse = response.json().await.map_err(|e| LlmError::TokenExchange {
            provider: PROVIDER_NAME,
            message: format!("malformed token response: {}", e),
            status: None,
        })?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: UNIX_EPOCH + Duration::from_millis(token.expires_at),
        })
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl LlmProvider for GigaChatProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let token = self.access_token().await?;
        let chat_request = ChatCompletionRequest::from_request(&self.settings.model, &request);
        let url = format!("{}/chat/completions", self.settings.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                provider: PROVIDER_NAME,
                source: e,
            })?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            if matches!(err, LlmError::Unauthorized { .. }) {
                // Next call starts with a fresh token.
                self.invalidate_token().await;
            }
            return Err(err);
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
            model: self.settings.model.clone(),
            usage,
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> Result<()> {
        if self.settings.credentials.trim().is_empty() {
            return Err(LlmError::MissingCredentials {
                provider: PROVIDER_NAME.to_string(),
                env_var: super::GIGACHAT_AUTH_KEY_ENV.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness() {
        let now = SystemTime::now();
        let fresh = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::from_secs(30 * 60),
        };
        let stale = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::from_secs(10),
        };

        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }

    #[test]
    fn test_parse_token_response() {
        let json = r#"{"access_token": "eyJhbGci", "expires_at": 1706026848841}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "eyJhbGci");
        assert_eq!(token.expires_at, 1_706_026_848_841);
    }

    #[test]
    fn test_blank_credentials_unavailable() {
        let provider = GigaChatProvider::new(GigaChatSettings::new("GigaChat", "  ".into())).unwrap();
        assert!(matches!(
            provider.is_available(),
            Err(LlmError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn test_oauth_rejection_is_token_exchange_error() {
        let err = token_exchange_error(LlmError::Unauthorized {
            status: 401,
            message: "Invalid credentials".to_string(),
        });
        assert!(matches!(
            err,
            LlmError::TokenExchange { status: Some(401), ref message, .. } if message == "Invalid credentials"
        ));

        let err = token_exchange_error(LlmError::RateLimited { retry_after: Some(5) });
        assert!(matches!(err, LlmError::RateLimited { retry_after: Some(5) }));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = GigaChatSettings::new("GigaChat", "key".into());
        assert_eq!(settings.scope, DEFAULT_SCOPE);
        assert_eq!(settings.base_url, GIGACHAT_API_URL);
        assert_eq!(settings.auth_url, GIGACHAT_AUTH_URL);
    }
}

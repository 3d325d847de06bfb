//! LLM provider implementations

mod chat;
mod gigachat;
pub mod mock;
mod openai_compatible;

pub use gigachat::{GigaChatProvider, GigaChatSettings};
pub use mock::MockProvider;
pub use openai_compatible::OpenAICompatibleProvider;

use std::str::FromStr;
use std::time::Duration;

use crate::config::{ModelPreset, ProviderConfig};
use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

pub const GIGACHAT_AUTH_KEY_ENV: &str = "GIGA_CHAT_AUTH_KEY";
pub const GIGACHAT_SCOPE_ENV: &str = "GIGA_CHAT_SCOPE";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GigaChat,
    OpenAICompatible,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gigachat" | "giga-chat" | "giga_chat" => Ok(Self::GigaChat),
            "openai-compatible" | "openai_compatible" | "openai" => Ok(Self::OpenAICompatible),
            "mock" | "echo" => Ok(Self::Mock),
            _ => Err(LlmError::ConfigError(format!("Unknown provider: {}", s))),
        }
    }
}

impl ProviderKind {
    /// Human-readable provider name for messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::GigaChat => "GigaChat",
            Self::OpenAICompatible => "OpenAI-compatible",
            Self::Mock => "mock",
        }
    }

    /// Get the environment variable name for this provider's credentials
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::GigaChat => Some(GIGACHAT_AUTH_KEY_ENV),
            Self::OpenAICompatible => Some(OPENAI_API_KEY_ENV),
            Self::Mock => None,
        }
    }
}

/// Create a provider instance from a preset and optional config
///
/// The provider is checked with `is_available` before it is returned.
pub fn get_provider(
    preset: &ModelPreset,
    provider_config: Option<&ProviderConfig>,
    timeout: Duration,
) -> Result<Box<dyn LlmProvider>> {
    let kind: ProviderKind = preset.provider.parse()?;

    let provider: Box<dyn LlmProvider> = match kind {
        ProviderKind::GigaChat => {
            let credentials = get_api_key(provider_config, kind)?;

            let mut settings = GigaChatSettings::new(&preset.model, credentials);
            settings.timeout = timeout;
            if let Some(scope) = provider_config
                .and_then(|c| c.scope.clone())
                .or_else(|| std::env::var(GIGACHAT_SCOPE_ENV).ok())
            {
                settings.scope = scope;
            }
            if let Some(url) = provider_config.and_then(|c| c.base_url.clone()) {
                settings.base_url = url;
            }
            if let Some(url) = provider_config.and_then(|c| c.auth_url.clone()) {
                settings.auth_url = url;
            }

            Box::new(GigaChatProvider::new(settings)?)
        }
        ProviderKind::OpenAICompatible => {
            // Local servers often run without a key.
            let api_key = get_api_key(provider_config, kind).ok();
            let base_url = provider_config
                .and_then(|c| c.base_url.as_deref())
                .unwrap_or(openai_compatible::DEFAULT_BASE_URL);

            Box::new(OpenAICompatibleProvider::new(
                &preset.model,
                base_url,
                api_key,
                timeout,
            )?)
        }
        ProviderKind::Mock => Box::new(MockProvider::echo()),
    };

    provider.is_available()?;
    Ok(provider)
}

/// Get the provider's credential from config, falling back to its environment variable
fn get_api_key(config: Option<&ProviderConfig>, kind: ProviderKind) -> Result<String> {
    if let Some(key) = config.and_then(|c| c.api_key.clone()) {
        return Ok(key);
    }

    let env_var = kind
        .env_var()
        .ok_or_else(|| LlmError::ConfigError(format!("{} takes no credentials", kind.label())))?;

    lookup_env(env_var, kind)
}

fn lookup_env(env_var: &str, kind: ProviderKind) -> Result<String> {
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LlmError::MissingCredentials {
            provider: kind.label().to_string(),
            env_var: env_var.to_string(),
        })
}

//! Failures along a chat request: credentials, token exchange, transport,
//! HTTP status, response body, and local configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error(
        "Credentials not found for {provider}. Set {env_var} environment variable or add to config."
    )]
    MissingCredentials { provider: String, env_var: String },

    /// The OAuth endpoint refused or mangled the authorization key exchange
    #[error("Could not obtain {provider} access token{}: {message}", status.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    TokenExchange {
        provider: &'static str,
        message: String,
        status: Option<u16>,
    },

    /// 401/403 on a chat call; a cached bearer token is no longer valid
    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rate limit exceeded{}", .retry_after.map(|s| format!(". Retry after {} seconds", s)).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    #[error("Server overloaded (HTTP 503): {message}")]
    ServerOverloaded { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    #[error("Provider not available: {0}")]
    ProviderUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid model preset: {0}")]
    InvalidPreset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl LlmError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::TokenExchange { status, .. } => *status,
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::ServerOverloaded { .. } => Some(503),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

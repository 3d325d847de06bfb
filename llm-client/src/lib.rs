//! Chat-completion client library for the sci-translate workspace
//!
//! Provides a unified interface over the backends the translator can talk to:
//! - GigaChat (OAuth token exchange + chat completions)
//! - Any OpenAI-compatible chat completions endpoint
//! - An in-process mock for tests and offline runs

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{Config, ModelPreset, ProviderConfig};
pub use error::{LlmError, Result};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use providers::{MockProvider, ProviderKind, get_provider};

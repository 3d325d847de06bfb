//! sci-translate configuration: chunking, dispatch and defaults.

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::languages::DEFAULT_LANGUAGE;
use crate::text::DEFAULT_CHUNK_SIZE;

const DEFAULT_MIN_TEXT_LEN: usize = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// How chunk requests are issued to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPolicy {
    /// One chunk at a time; chunk N+1 waits for chunk N
    #[default]
    Sequential,
    /// All chunks in flight together (optionally capped by `max_in_flight`)
    Concurrent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Shortest text accepted for translation, in characters
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    #[serde(default)]
    pub dispatch: DispatchPolicy,

    /// Cap on concurrent backend calls when dispatch is concurrent. None means no cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,

    /// Target language used when --lang is not given
    #[serde(default = "default_language")]
    pub default_language: String,

    /// HTTP timeout for each backend request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_min_text_len() -> usize {
    DEFAULT_MIN_TEXT_LEN
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            min_text_len: default_min_text_len(),
            dispatch: DispatchPolicy::default(),
            max_in_flight: None,
            default_language: default_language(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TranslatorConfig {
    /// Get the config file path: ~/.config/sci-translate/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("sci-translate")
            .join("config.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::parse(&content).with_context(|| format!("Invalid config at {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let config: TranslatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or flood the backend
    pub fn validate(&self) -> Result<()> {
        ensure!(self.chunk_size > 0, "chunk_size must be greater than zero");
        ensure!(
            self.max_in_flight != Some(0),
            "max_in_flight must be greater than zero when set"
        );
        ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be greater than zero"
        );
        Ok(())
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

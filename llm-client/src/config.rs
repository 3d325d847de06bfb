use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{LlmError, Result};
use crate::providers::ProviderKind;

/// Overrides the model of the default GigaChat preset
pub const GIGACHAT_MODEL_ENV: &str = "GIGA_CHAT_MODEL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preset used when neither `--model` nor a per-command default applies
    #[serde(default = "default_preset")]
    pub default_preset: String,

    /// Per-command default presets (command name -> preset name)
    #[serde(default)]
    pub defaults: HashMap<String, String>,

    /// Named model presets for quick access
    #[serde(default)]
    pub presets: HashMap<String, ModelPreset>,

    /// Provider-specific configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_preset() -> String {
    "gigachat".to_string()
}

/// A named model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPreset {
    /// Provider identifier (gigachat, openai-compatible, mock)
    pub provider: String,

    /// Model name/identifier for the provider
    pub model: String,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key or GigaChat authorization key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// GigaChat OAuth scope (GIGACHAT_API_PERS, GIGACHAT_API_CORP, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Custom base URL of the chat completions API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Custom OAuth endpoint (GigaChat only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home =
            std::env::var("HOME").map_err(|_| LlmError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/sci-translate/llm.toml"))
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Result<&ModelPreset> {
        self.presets
            .get(name)
            .ok_or_else(|| LlmError::InvalidPreset(name.to_string()))
    }

    /// Get the default preset name for a command (`translate`, `improve`)
    ///
    /// Falls back to `default_preset` if no command-specific default is set.
    pub fn get_default_for_command(&self, command: &str) -> &str {
        self.defaults
            .get(command)
            .map(String::as_str)
            .unwrap_or(&self.default_preset)
    }

    /// Resolve the preset for a command, honouring an explicit override first
    ///
    /// Without an explicit preset, `GIGA_CHAT_MODEL` replaces the model of a
    /// GigaChat default; an explicit `--model` always wins.
    pub fn resolve_preset(&self, explicit: Option<&str>, command: &str) -> Result<ModelPreset> {
        let env_model = std::env::var(GIGACHAT_MODEL_ENV)
            .ok()
            .filter(|m| !m.trim().is_empty());
        self.resolve_preset_with(explicit, command, env_model)
    }

    fn resolve_preset_with(
        &self,
        explicit: Option<&str>,
        command: &str,
        env_model: Option<String>,
    ) -> Result<ModelPreset> {
        if let Some(name) = explicit {
            return self.get_preset(name).cloned();
        }

        let mut preset = self.get_preset(self.get_default_for_command(command))?.clone();
        if let Some(model) = env_model {
            if preset.provider.parse::<ProviderKind>().ok() == Some(ProviderKind::GigaChat) {
                preset.model = model;
            }
        }
        Ok(preset)
    }

    /// Get provider config by provider name
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut presets = HashMap::new();

        presets.insert(
            "gigachat".to_string(),
            ModelPreset {
                provider: "gigachat".to_string(),
                model: "GigaChat".to_string(),
            },
        );
        presets.insert(
            "gigachat-pro".to_string(),
            ModelPreset {
                provider: "gigachat".to_string(),
                model: "GigaChat-Pro".to_string(),
            },
        );
        presets.insert(
            "mock".to_string(),
            ModelPreset {
                provider: "mock".to_string(),
                model: "echo".to_string(),
            },
        );

        Self {
            default_preset: default_preset(),
            defaults: HashMap::new(),
            presets,
            providers: HashMap::new(),
        }
    }
}

use std::{env, fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::{
    assets::get_config_dir,
    mode::Mode,
    model::{self, ENV_SCAN_ORDER, Provider},
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Effective configuration, persisted as a single JSON document.
///
/// Loaded values win over defaults for overlapping keys; the API key of the
/// currently configured provider is refreshed from the environment on every
/// load. Exactly one provider/model pair is active at a time.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_provider: Provider,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub mode: Mode,
    pub workspace_path: PathBuf,
    pub is_vision_enabled: bool,
    pub check_mcp_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        let provider = Provider::Anthropic;
        Self {
            api_provider: provider,
            api_key: String::new(),
            model: provider.default_model().to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            mode: Mode::Assistant,
            workspace_path: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            is_vision_enabled: true,
            check_mcp_on_start: false,
        }
    }
}

impl Config {
    /// Applies a single `key=value` update. Unknown keys and unparsable
    /// values are rejected without any state change.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "apiProvider" | "provider" => {
                let provider: Provider = value.parse().map_err(ConfigError::Config)?;
                if provider != self.api_provider {
                    self.api_provider = provider;
                    self.model = provider.default_model().to_string();
                    self.is_vision_enabled = self.model_supports_vision();
                    self.api_key = env::var(provider.env_var()).unwrap_or_default();
                }
            }
            "model" => {
                self.model = value.to_string();
                self.is_vision_enabled = self.model_supports_vision();
            }
            "apiKey" => self.api_key = value.to_string(),
            "temperature" => {
                let temperature: f32 = value
                    .parse()
                    .map_err(|_| ConfigError::Config(format!("Invalid temperature: {value}")))?;
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(ConfigError::Config(format!(
                        "Temperature must be between 0.0 and 2.0, got {value}"
                    )));
                }
                self.temperature = temperature;
            }
            "maxTokens" => {
                let max_tokens: u32 = value
                    .parse()
                    .map_err(|_| ConfigError::Config(format!("Invalid maxTokens: {value}")))?;
                if max_tokens == 0 {
                    return Err(ConfigError::Config("maxTokens must be positive".to_string()));
                }
                self.max_tokens = max_tokens;
            }
            "mode" => {
                self.mode = value.parse().map_err(ConfigError::Config)?;
            }
            "workspacePath" => {
                let path = PathBuf::from(value);
                if !path.is_dir() {
                    return Err(ConfigError::Config(format!(
                        "Path does not exist: {value}"
                    )));
                }
                self.workspace_path = path;
            }
            "isVisionEnabled" => {
                self.is_vision_enabled = value
                    .parse()
                    .map_err(|_| ConfigError::Config(format!("Invalid boolean: {value}")))?;
            }
            "checkMcpOnStart" => {
                self.check_mcp_on_start = value
                    .parse()
                    .map_err(|_| ConfigError::Config(format!("Invalid boolean: {value}")))?;
            }
            other => {
                return Err(ConfigError::Config(format!("Unknown config key: {other}")));
            }
        }
        Ok(())
    }

    /// Restores every field to its default and re-runs first-run provider
    /// selection against the environment.
    pub fn reset(&mut self) {
        *self = select_provider_from_env(Config::default());
    }

    fn model_supports_vision(&self) -> bool {
        model::model_info(self.api_provider, &self.model)
            .map(|m| m.supports_vision)
            .unwrap_or(false)
    }
}

fn config_file_path(config_path: Option<PathBuf>) -> PathBuf {
    config_path.unwrap_or_else(|| get_config_dir().join("pilot.json"))
}

/// Scans provider API-key variables in fixed priority order and activates
/// the first provider whose key is present.
fn select_provider_from_env(mut config: Config) -> Config {
    for provider in ENV_SCAN_ORDER {
        if let Ok(key) = env::var(provider.env_var())
            && !key.is_empty()
        {
            config.api_provider = *provider;
            config.api_key = key;
            config.model = provider.default_model().to_string();
            config.is_vision_enabled = config.model_supports_vision();
            break;
        }
    }
    config
}

/// Persists the configuration, rewriting the file wholesale.
#[instrument(skip(config, config_path))]
pub fn save_config(config: &Config, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
    let path = config_file_path(config_path);
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

/// Produces the effective configuration from the persisted file (possibly
/// absent) and the process environment.
///
/// First run seeds defaults, selects a provider from the environment and
/// writes the file; a write failure there is the only fatal outcome.
/// Malformed JSON on a later load falls back to defaults with a warning.
#[instrument(skip(config_path))]
pub fn load_config(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let path = config_file_path(config_path);

    if !path.exists() {
        let config = select_provider_from_env(Config::default());
        save_config(&config, Some(path))?;
        return Ok(config);
    }

    let content = fs::read_to_string(&path)?;
    let mut config: Config = match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Malformed config file {}: {e}. Using defaults.", path.display());
            Config::default()
        }
    };

    // Legacy model ids are rewritten before anything consumes them, and the
    // rewrite is persisted so a second load is a no-op.
    if let Some(current) = model::migrate_model_id(config.api_provider, &config.model) {
        warn!(
            "Model '{}' has been retired; migrating to '{current}'",
            config.model
        );
        config.model = current.to_string();
        config.is_vision_enabled = config.model_supports_vision();
        save_config(&config, Some(path))?;
    }

    // The environment overrides the stored key only for the currently
    // configured provider.
    if let Ok(key) = env::var(config.api_provider.env_var())
        && !key.is_empty()
    {
        config.api_key = key;
    }

    Ok(config)
}

use anyhow::{Result, Context as AnyhowContext};
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant. Follow the instructions in the composed prompt below.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ComposerConfig {
    pub storage: StorageConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: String,
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: "composer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub system_instruction: String,
    pub timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            timeout_secs: 60,
        }
    }
}

impl ComposerConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to deserialize config")
    }

    /// Read `path` if given (defaults otherwise), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file from {}", p.display()))?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Invalid config file {}", p.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `COMPOSER_REDIS_URL` also switches the backend to Redis.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("COMPOSER_REDIS_URL") {
            self.storage.redis_url = url;
            self.storage.backend = StorageBackend::Redis;
        }
        if let Some(endpoint) = lookup("COMPOSER_ENDPOINT") {
            self.execution.endpoint = endpoint;
        }
        if let Some(model) = lookup("COMPOSER_MODEL") {
            self.execution.model = model;
        }
    }
}

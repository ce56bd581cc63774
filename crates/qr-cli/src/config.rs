use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use qr_research::ResearchConfig;

/// Environment variable holding the model credential.
pub const MODEL_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variables holding the search credential, in lookup order.
pub const SEARCH_KEY_ENVS: &[&str] = &["BRAVE_API_KEY", "BRAVE_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfigEntry,

    #[serde(default)]
    pub search: SearchConfigEntry,

    #[serde(default)]
    pub research: ResearchConfig,
}

/// Language-model service settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfigEntry {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub default_model: Option<String>,
}

/// Search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfigEntry {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override the search endpoint (e.g. for a proxy)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_timeout_secs() -> u64 {
    20
}

impl Default for SearchConfigEntry {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the config file.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else if required {
            anyhow::bail!("Config file not found: {}", config_path.display())
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("qr").join("config.toml"))
    }

    /// Model credential: config file first, then the environment.
    pub fn model_api_key(&self) -> Option<String> {
        self.model_api_key_from(|key| std::env::var(key).ok())
    }

    /// Search credential: config file first, then the environment.
    pub fn search_api_key(&self) -> Option<String> {
        self.search_api_key_from(|key| std::env::var(key).ok())
    }

    fn model_api_key_from(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_empty(self.provider.api_key.clone()).or_else(|| non_empty(env(MODEL_KEY_ENV)))
    }

    fn search_api_key_from(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_empty(self.search.api_key.clone())
            .or_else(|| SEARCH_KEY_ENVS.iter().find_map(|key| non_empty(env(key))))
    }

    /// Apply a model given on the command line to both generative stages.
    pub fn with_model_override(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model {
            self.research = self.research.with_model(model);
        }
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Mask a credential for display, keeping the last four characters.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 4 => "****".to_string(),
        Some(s) => {
            let tail: String = s.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("****{}", tail)
        }
    }
}

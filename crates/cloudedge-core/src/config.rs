use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::provider::Provider;

/// Older deployments only exported a bare `API_KEY` for Gemini
const LEGACY_GEMINI_ENV: &str = "API_KEY";
const PROVIDER_ENV: &str = "CLOUDEDGE_PROVIDER";
const MODEL_ENV: &str = "CLOUDEDGE_MODEL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

/// Settings after environment overrides, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub provider: Provider,
    pub model: String,
    /// `None` when no usable credential exists for `provider`
    pub api_key: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    /// Persist a provider switch. The stored model belongs to the old
    /// provider, so it is cleared.
    pub fn save_provider(provider: Provider) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.provider = Some(provider.as_str().to_string());
        config.default_model = None;
        config.save()
    }

    pub fn api_key_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::Claude => self.claude_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }

    /// Apply process environment overrides
    pub fn resolve(&self) -> ResolvedConfig {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_for(&self, provider: Provider) -> ResolvedConfig {
        self.resolve_provider_with(provider, |name| std::env::var(name).ok())
    }

    /// Environment values win over the file; empty strings count as unset.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> ResolvedConfig {
        let provider = non_empty(env(PROVIDER_ENV))
            .or_else(|| self.provider.clone())
            .and_then(|p| Provider::from_str(&p))
            .unwrap_or_default();
        self.resolve_provider_with(provider, env)
    }

    fn resolve_provider_with(
        &self,
        provider: Provider,
        env: impl Fn(&str) -> Option<String>,
    ) -> ResolvedConfig {
        let model = non_empty(env(MODEL_ENV))
            .or_else(|| non_empty(self.default_model.clone()))
            .unwrap_or_else(|| provider.default_model().to_string());

        let mut api_key = non_empty(env(provider.env_var()));
        if api_key.is_none() && provider == Provider::Gemini {
            api_key = non_empty(env(LEGACY_GEMINI_ENV));
        }
        let api_key = api_key.or_else(|| non_empty(self.api_key_for(provider).map(str::to_string)));

        ResolvedConfig {
            provider,
            model,
            api_key,
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.json"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cloudedge"))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

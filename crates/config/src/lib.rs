//! Configuration loading, validation, and management for Themeloom.
//!
//! Loads configuration from `~/.themeloom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use themeloom_core::{GenerationConfig, PreferenceProfile, ProviderKind};

/// The root configuration structure.
///
/// Maps directly to `~/.themeloom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the OpenAI-compatible runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Base URL for the OpenAI-compatible API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// GGUF file for local inference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// Directory scanned by `themeloom models`
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub generation: GenerationSettings,

    /// The default preference profile
    #[serde(default)]
    pub preferences: PreferenceProfile,
}

fn default_provider() -> String {
    "none".into()
}
fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}
fn default_temperature() -> f32 {
    0.6
}
fn default_max_tokens() -> u32 {
    800
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("base_url", &self.base_url)
            .field("model_path", &self.model_path)
            .field("models_dir", &self.models_dir)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("generation", &self.generation)
            .field("preferences", &self.preferences)
            .finish()
    }
}

/// Limits and defaults for the generation agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Upper bound for themes per request; larger counts are clamped
    #[serde(default = "default_max_theme_count")]
    pub max_theme_count: usize,

    /// Regeneration attempts for a theme whose tag set collides
    #[serde(default = "default_dedup_retries")]
    pub dedup_retries: u32,

    /// Per-call model timeout
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// Trending tags fetched per theme request
    #[serde(default = "default_trend_limit")]
    pub trend_limit: usize,

    /// Caption length cap for X, in characters
    #[serde(default = "default_x_caption_limit")]
    pub x_caption_limit: usize,

    #[serde(default = "default_trend_category")]
    pub trend_category: String,
}

fn default_max_theme_count() -> usize {
    10
}
fn default_dedup_retries() -> u32 {
    1
}
fn default_model_timeout_secs() -> u64 {
    30
}
fn default_trend_limit() -> usize {
    30
}
fn default_x_caption_limit() -> usize {
    260
}
fn default_trend_category() -> String {
    "anime".into()
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_theme_count: default_max_theme_count(),
            dedup_retries: default_dedup_retries(),
            model_timeout_secs: default_model_timeout_secs(),
            trend_limit: default_trend_limit(),
            x_caption_limit: default_x_caption_limit(),
            trend_category: default_trend_category(),
        }
    }
}

impl GenerationSettings {
    pub fn model_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.model_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.themeloom/config.toml).
    ///
    /// Environment variables override file values:
    /// - `THEMELOOM_API_KEY`, then `OPENAI_API_KEY`
    /// - `THEMELOOM_PROVIDER`, `THEMELOOM_MODEL`, `THEMELOOM_BASE_URL`
    /// - `LLAMA_CPP_MODEL_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("THEMELOOM_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(provider) = get("THEMELOOM_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = get("THEMELOOM_MODEL") {
            self.default_model = model;
        }
        if let Some(url) = get("THEMELOOM_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(path) = get("LLAMA_CPP_MODEL_PATH") {
            self.model_path = Some(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".themeloom")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.generation.max_theme_count == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_theme_count must be at least 1".into(),
            ));
        }

        if self.generation.model_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.model_timeout_secs must be at least 1".into(),
            ));
        }

        if let Err(e) = self.default_provider.parse::<ProviderKind>() {
            return Err(ConfigError::ValidationError(format!("default_provider: {e}")));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The configured provider kind. Unknown names count as `none`.
    pub fn provider_kind(&self) -> ProviderKind {
        self.default_provider.parse().unwrap_or_default()
    }

    /// Generation settings a request inherits when it names no `llm` block.
    pub fn default_generation(&self) -> GenerationConfig {
        GenerationConfig {
            provider: self.provider_kind(),
            model: Some(self.default_model.clone()),
            base_url: self.base_url.clone(),
            model_path: self.model_path.clone(),
            api_key: None,
            timeout_secs: Some(self.generation.model_timeout_secs),
        }
    }

    /// Generate a default config TOML string (for `config --init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            base_url: None,
            model_path: None,
            models_dir: default_models_dir(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            generation: GenerationSettings::default(),
            preferences: PreferenceProfile::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for themeloom_core::Error {
    fn from(e: ConfigError) -> Self {
        themeloom_core::Error::Config {
            message: e.to_string(),
        }
    }
}

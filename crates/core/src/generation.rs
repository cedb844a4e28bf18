//! Per-request generation settings (`llm_config`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which generation backend a request asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ProviderKind {
    /// No backend: template composition only; the runner is never invoked.
    #[default]
    None,
    /// Explicit request for the rule-based path.
    Rule,
    /// Remote OpenAI-compatible API.
    Api,
    /// Local inference.
    Local,
}

impl ProviderKind {
    /// Whether this kind needs a Model Runner call.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Api | Self::Local)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rule => "rule",
            Self::Api => "api",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "rule" | "rules" | "template" => Ok(Self::Rule),
            "api" | "openai" | "vllm" => Ok(Self::Api),
            "local" | "llama_cpp" | "llamacpp" | "llama.cpp" => Ok(Self::Local),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Settings that select and parameterize a Model Runner for one request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Passed through opaquely to the local runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("model_path", &self.model_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GenerationConfig {
    /// Config that never calls a runner.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    pub fn is_live(&self) -> bool {
        self.provider.is_live()
    }

    /// The per-call timeout: the request's own value, else `default`.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

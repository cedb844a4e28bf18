pub mod config_cmd;
pub mod doctor;
pub mod models;
pub mod post;
pub mod theme;

use clap::Args;
use themeloom_config::AppConfig;
use themeloom_core::GenerationConfig;

/// Runner selection flags shared by `theme` and `post`.
#[derive(Args, Debug, Clone, Default)]
pub struct LlmArgs {
    /// Generation provider: none, rule, api or local
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name passed to the runner
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// GGUF file for local inference
    #[arg(long)]
    pub model_path: Option<String>,
}

impl LlmArgs {
    /// The config defaults with any flags layered on top.
    pub fn generation(&self, config: &AppConfig) -> themeloom_core::Result<GenerationConfig> {
        let mut generation = config.default_generation();
        if let Some(provider) = &self.provider {
            generation.provider = provider.parse()?;
        }
        if let Some(model) = &self.model {
            generation.model = Some(model.clone());
        }
        if let Some(url) = &self.base_url {
            generation.base_url = Some(url.clone());
        }
        if let Some(path) = &self.model_path {
            generation.model_path = Some(path.clone());
        }
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use themeloom_core::ProviderKind;

    #[test]
    fn flags_override_config_defaults() {
        let config = AppConfig::default();
        let args = LlmArgs {
            provider: Some("openai".into()),
            model: Some("qwen2.5".into()),
            ..LlmArgs::default()
        };

        let generation = args.generation(&config).unwrap();
        assert_eq!(generation.provider, ProviderKind::Api);
        assert_eq!(generation.model.as_deref(), Some("qwen2.5"));
        assert_eq!(
            generation.timeout_secs,
            Some(config.generation.model_timeout_secs)
        );
    }

    #[test]
    fn no_flags_keeps_config_provider() {
        let config = AppConfig::default();
        let generation = LlmArgs::default().generation(&config).unwrap();
        assert_eq!(generation.provider, ProviderKind::None);
        assert_eq!(generation.model.as_deref(), Some("gpt-4.1-mini"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let args = LlmArgs {
            provider: Some("mystery".into()),
            ..LlmArgs::default()
        };
        assert!(args.generation(&AppConfig::default()).is_err());
    }
}

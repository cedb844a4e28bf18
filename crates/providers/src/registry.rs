//! Runner registry: selects the Model Runner for a request's provider kind.
//!
//! The table is fixed at startup. Non-live kinds (`none`, `rule`) never
//! resolve to a runner; a live kind with nothing registered is reported as
//! `ModelUnavailable(NotConfigured)` rather than silently ignored.

use crate::noop::NoopRunner;
use crate::openai_compat::{ApiRunner, OPENAI_BASE_URL};
use std::collections::HashMap;
use std::sync::Arc;
use themeloom_config::AppConfig;
use themeloom_core::{GenerationConfig, ModelRunner, ModelUnavailable, ProviderKind};
use tracing::debug;

/// Sampling parameters shared by runners built from config.
#[derive(Debug, Clone, Copy)]
struct Sampling {
    temperature: f32,
    max_tokens: u32,
}

/// Routes provider kinds to runners.
pub struct RunnerRegistry {
    runners: HashMap<ProviderKind, Arc<dyn ModelRunner>>,
    sampling: Sampling,
    default_model: String,
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            runners: HashMap::new(),
            sampling: Sampling {
                temperature: 0.6,
                max_tokens: 800,
            },
            default_model: "gpt-4.1-mini".into(),
        }
    }

    /// Register a runner under its own kind.
    pub fn register(&mut self, runner: Arc<dyn ModelRunner>) {
        self.runners.insert(runner.kind(), runner);
    }

    /// Get the runner registered for a kind.
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ModelRunner>> {
        self.runners.get(&kind).cloned()
    }

    /// Resolve the runner for a request.
    ///
    /// `Ok(None)` means the request must not call a model at all. A request
    /// that brings its own API key gets a runner built for it, like a
    /// one-off endpoint.
    pub fn resolve(
        &self,
        config: &GenerationConfig,
    ) -> Result<Option<Arc<dyn ModelRunner>>, ModelUnavailable> {
        if !config.is_live() {
            return Ok(None);
        }

        if config.provider == ProviderKind::Api && config.api_key.is_some() {
            debug!("Request carries its own API key; using an ad-hoc runner");
            let runner = ApiRunner::new("api", OPENAI_BASE_URL, None)
                .with_default_model(&self.default_model)
                .with_sampling(self.sampling.temperature, self.sampling.max_tokens);
            return Ok(Some(Arc::new(runner)));
        }

        match self.get(config.provider) {
            Some(runner) => {
                debug!(kind = %config.provider, runner = runner.name(), "Runner resolved");
                Ok(Some(runner))
            }
            None => Err(ModelUnavailable::not_configured(format!(
                "no runner registered for provider '{}'",
                config.provider
            ))),
        }
    }

    /// List registered runners as `(kind, name)`, sorted by kind.
    pub fn list(&self) -> Vec<(ProviderKind, &str)> {
        let mut entries: Vec<_> = self
            .runners
            .iter()
            .map(|(kind, runner)| (*kind, runner.name()))
            .collect();
        entries.sort_by_key(|(kind, _)| kind.as_str());
        entries
    }
}

/// Build the runner table from configuration.
pub fn build_from_config(config: &AppConfig) -> RunnerRegistry {
    let mut registry = RunnerRegistry::new();
    registry.sampling = Sampling {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    registry.default_model = config.default_model.clone();

    // Remote API: needs a key unless a custom endpoint (vLLM, Ollama) is set.
    let api: Arc<dyn ModelRunner> = match (&config.api_key, &config.base_url) {
        (None, None) => Arc::new(NoopRunner::new(
            ProviderKind::Api,
            "no API key configured (set THEMELOOM_API_KEY or OPENAI_API_KEY)",
        )),
        (key, url) => Arc::new(
            ApiRunner::new(
                "openai",
                url.as_deref().unwrap_or(OPENAI_BASE_URL),
                key.clone(),
            )
            .with_default_model(&config.default_model)
            .with_sampling(config.temperature, config.max_tokens),
        ),
    };
    registry.register(api);

    registry.register(local_runner(config));

    registry
}

#[cfg(feature = "local")]
fn local_runner(config: &AppConfig) -> Arc<dyn ModelRunner> {
    Arc::new(
        crate::local::LocalRunner::new(config.model_path.clone())
            .with_sampling(config.temperature, config.max_tokens),
    )
}

/// Without in-process inference, `local` talks to a llama.cpp server.
#[cfg(not(feature = "local"))]
fn local_runner(config: &AppConfig) -> Arc<dyn ModelRunner> {
    Arc::new(ApiRunner::llama_cpp(None).with_sampling(config.temperature, config.max_tokens))
}

//! A runner that is never available.
//!
//! Registered in place of a live runner whose backend is not configured, so
//! agents see an ordinary `ModelUnavailable` and take the rule-based path.

use async_trait::async_trait;
use themeloom_core::{GenerationConfig, ModelRunner, ModelUnavailable, ProviderKind};

pub struct NoopRunner {
    kind: ProviderKind,
    reason: String,
}

impl NoopRunner {
    pub fn new(kind: ProviderKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ModelRunner for NoopRunner {
    fn name(&self) -> &str {
        "noop"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn run(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable> {
        Err(ModelUnavailable::not_configured(self.reason.clone()))
    }

    async fn health_check(&self) -> std::result::Result<bool, ModelUnavailable> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use themeloom_core::FailureCause;

    #[tokio::test]
    async fn always_not_configured() {
        let runner = NoopRunner::new(ProviderKind::Api, "no API key configured");
        let err = runner
            .run("anything", &GenerationConfig::with_provider(ProviderKind::Api))
            .await
            .unwrap_err();
        assert_eq!(err.cause, FailureCause::NotConfigured);
        assert!(err.message.contains("API key"));
        assert!(!runner.health_check().await.unwrap());
    }
}

//! Model Runner trait: the abstraction over text-generation backends.
//!
//! A runner turns a prompt into text. Implementations: remote OpenAI-compatible
//! API, local GGUF inference, and a no-op that is never available.
//!
//! Runners do not retry and do not enforce timeouts on their own; the caller
//! wraps each call in a bounded timeout and decides what to do on failure.

use crate::error::ModelUnavailable;
use crate::generation::{GenerationConfig, ProviderKind};
use async_trait::async_trait;

#[async_trait]
pub trait ModelRunner: Send + Sync {
    /// A human-readable name for this runner (e.g., "openai", "llama.cpp").
    fn name(&self) -> &str;

    /// The provider kind this runner serves.
    fn kind(&self) -> ProviderKind;

    /// Generate text for `prompt`.
    ///
    /// Every failure is reported as [`ModelUnavailable`].
    async fn run(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, ModelUnavailable> {
        Ok(true)
    }
}

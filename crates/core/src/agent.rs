//! Agent seams the orchestrator dispatches to.

use crate::error::Result;
use crate::request::{PostBatch, PostRequest, ThemeBatch, ThemeRequest};
use async_trait::async_trait;

/// Produces illustration themes.
#[async_trait]
pub trait ThemeGenerator: Send + Sync {
    /// Generate `min(count, max)` themes. Item-level failures degrade to the
    /// rule-based path; only an unrecoverable failure returns `Err`.
    async fn generate_themes(&self, request: &ThemeRequest) -> Result<ThemeBatch>;
}

/// Produces per-language captions.
#[async_trait]
pub trait PostGenerator: Send + Sync {
    /// Generate one caption per requested language. Languages without a
    /// template are skipped and noted in the batch.
    async fn generate_posts(&self, request: &PostRequest) -> Result<PostBatch>;
}

//! The single entry point: validate the envelope, pick an agent, delegate.

use std::sync::Arc;
use themeloom_core::{
    PostGenerator, PostRequest, Request, RequestKind, Response, Result, ThemeGenerator,
    ThemeRequest,
};
use tracing::{debug, warn};

/// Routes requests to the theme or post agent.
///
/// The orchestrator does no generation itself. Unknown kinds and malformed
/// payloads are rejected before any agent runs; agent results are returned
/// unchanged.
pub struct Orchestrator {
    themes: Arc<dyn ThemeGenerator>,
    posts: Arc<dyn PostGenerator>,
}

impl Orchestrator {
    pub fn new(themes: Arc<dyn ThemeGenerator>, posts: Arc<dyn PostGenerator>) -> Self {
        Self { themes, posts }
    }

    pub async fn handle(&self, request: &Request) -> Result<Response> {
        let kind = request.kind().inspect_err(|e| {
            warn!(kind = %request.kind, error = %e, "Rejected request");
        })?;

        match kind {
            RequestKind::Theme => {
                let theme_request = ThemeRequest::from_payload(&request.payload)
                    .inspect_err(|e| warn!(kind = %kind, error = %e, "Invalid payload"))?;
                debug!(
                    platform = %theme_request.platform,
                    count = theme_request.count,
                    provider = %theme_request.llm.provider,
                    "Dispatching to theme agent"
                );
                self.themes
                    .generate_themes(&theme_request)
                    .await
                    .map(Response::Themes)
            }
            RequestKind::Post => {
                let post_request = PostRequest::from_payload(&request.payload)
                    .inspect_err(|e| warn!(kind = %kind, error = %e, "Invalid payload"))?;
                debug!(
                    platform = %post_request.platform,
                    languages = post_request.languages.len(),
                    provider = %post_request.llm.provider,
                    "Dispatching to post agent"
                );
                self.posts
                    .generate_posts(&post_request)
                    .await
                    .map(Response::Posts)
            }
        }
    }
}

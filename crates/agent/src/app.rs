//! Application wiring: build the orchestrator and its agents from config.

use std::sync::Arc;
use themeloom_config::AppConfig;
use themeloom_providers::{build_from_config, RunnerRegistry};
use themeloom_skills::{
    CaptionLibrary, DefaultHashtagGenerator, StaticPreferenceStore, StaticTrendSource,
    TemplateLibrary,
};
use tracing::info;

use crate::orchestrator::Orchestrator;
use crate::post_writer::{PostSettings, PostWriterAgent};
use crate::theme::{ThemeAgent, ThemeSettings};

/// Both agents, built from the same skills and runner table.
pub struct Agents {
    pub themes: Arc<ThemeAgent>,
    pub posts: Arc<PostWriterAgent>,
}

/// Build the agents with the default skills and the configured runners.
pub fn build_agents(config: &AppConfig, runners: Arc<RunnerRegistry>) -> Agents {
    let preferences = Arc::new(StaticPreferenceStore::new(config.preferences.clone()));

    let themes = ThemeAgent::new(
        Arc::new(TemplateLibrary::default()),
        preferences.clone(),
        Arc::new(StaticTrendSource::new()),
        runners.clone(),
    )
    .with_settings(ThemeSettings::from(&config.generation));

    let posts = PostWriterAgent::new(
        Arc::new(CaptionLibrary::default()),
        preferences,
        Arc::new(DefaultHashtagGenerator),
        runners,
    )
    .with_settings(PostSettings::from(&config.generation));

    Agents {
        themes: Arc::new(themes),
        posts: Arc::new(posts),
    }
}

/// The full stack for a config: runners, skills, agents, orchestrator.
pub fn build_orchestrator(config: &AppConfig) -> Orchestrator {
    let runners = Arc::new(build_from_config(config));
    info!(
        runners = ?runners.list(),
        default_provider = %config.default_provider,
        "Orchestrator ready"
    );
    let agents = build_agents(config, runners);
    Orchestrator::new(agents.themes, agents.posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use themeloom_core::{Request, Response};

    #[tokio::test]
    async fn default_config_serves_both_kinds() {
        let config = AppConfig::default();
        let orchestrator = build_orchestrator(&config);

        let response = orchestrator
            .handle(&Request::new(
                "theme",
                json!({"season": "winter", "platform": "x", "count": 2}),
            ))
            .await
            .unwrap();
        let Response::Themes(batch) = response else {
            panic!("expected themes");
        };
        assert_eq!(batch.themes.len(), 2);

        let response = orchestrator
            .handle(&Request::new(
                "post",
                json!({"platform": "x", "languages": ["ja"], "artwork_meta": {"title": "Snow"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.posts().unwrap().posts.len(), 1);
    }

    #[tokio::test]
    async fn generation_settings_flow_into_agents() {
        let mut config = AppConfig::default();
        config.generation.max_theme_count = 2;
        let orchestrator = build_orchestrator(&config);

        let response = orchestrator
            .handle(&Request::new("theme", json!({"platform": "x", "count": 9})))
            .await
            .unwrap();
        assert_eq!(response.themes().unwrap().produced, 2);
    }
}

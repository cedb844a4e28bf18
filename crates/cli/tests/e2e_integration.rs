//! End-to-end tests for the Themeloom generation pipeline.
//!
//! These drive the `Orchestrator` from a request envelope through the agents,
//! skills and runner registry, then store the results in a repository.

use std::sync::{Arc, Mutex};

use serde_json::json;
use themeloom_agent::{build_agents, build_orchestrator, Orchestrator};
use themeloom_config::AppConfig;
use themeloom_core::{
    Error, GenerationConfig, GenerationSource, ModelRunner, ModelUnavailable, NoteKind, PostBatch,
    ProviderKind, RecordFilter, Repository, Request, ThemeRecord,
};
use themeloom_providers::RunnerRegistry;
use themeloom_storage::InMemoryRepository;

// ── Mock Runner ──────────────────────────────────────────────────────────

/// A runner that returns scripted outputs in sequence, repeating the last.
struct ScriptedRunner {
    responses: Vec<Result<String, ModelUnavailable>>,
    call_count: Mutex<usize>,
}

impl ScriptedRunner {
    fn new(responses: Vec<Result<String, ModelUnavailable>>) -> Self {
        Self {
            responses,
            call_count: Mutex::new(0),
        }
    }

    fn text(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ModelRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Api
    }

    async fn run(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, ModelUnavailable> {
        let mut count = self.call_count.lock().unwrap();
        let index = (*count).min(self.responses.len() - 1);
        *count += 1;
        self.responses[index].clone()
    }
}

fn orchestrator_with(runner: Arc<ScriptedRunner>) -> Orchestrator {
    let mut registry = RunnerRegistry::new();
    registry.register(runner);
    let agents = build_agents(&AppConfig::default(), Arc::new(registry));
    Orchestrator::new(agents.themes, agents.posts)
}

fn api_llm() -> serde_json::Value {
    json!({"provider": "api", "model": "mock-model"})
}

// ── E2E: Themes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_rule_themes_are_stored_and_filtered() {
    let orchestrator = build_orchestrator(&AppConfig::default());
    let repo: InMemoryRepository<ThemeRecord> = InMemoryRepository::new();

    for platform in ["x", "pixiv"] {
        let response = orchestrator
            .handle(&Request::new(
                "theme",
                json!({"season": "summer", "focus": "beach", "platform": platform, "count": 2}),
            ))
            .await
            .unwrap();
        let batch = response.themes().unwrap();
        assert_eq!(batch.requested, 2);
        assert_eq!(batch.produced, 2);

        for theme in &batch.themes {
            assert_eq!(theme.source(), Some(GenerationSource::Rule));
            assert!(theme.prompt_tags().iter().any(|t| t == "beach"));
            repo.save(theme.clone()).await.unwrap();
        }
    }

    let all = repo.list(&RecordFilter::default()).await.unwrap();
    assert_eq!(all.len(), 4);

    let x_only = repo
        .list(&RecordFilter::default().platform("x"))
        .await
        .unwrap();
    assert_eq!(x_only.len(), 2);
    assert!(x_only
        .iter()
        .all(|s| s.record.metadata().get("platform").map(String::as_str) == Some("x")));
}

#[tokio::test]
async fn e2e_llm_themes_use_model_output() {
    let runner = Arc::new(ScriptedRunner::text(
        r#"```json
{"title": "Rainy Station", "short_concept": "Waiting out the storm", "keywords": ["umbrella", "train_station"], "mood": ["calm"]}
```"#,
    ));
    let orchestrator = orchestrator_with(runner.clone());

    let response = orchestrator
        .handle(&Request::new(
            "generate_theme",
            json!({"season": "autumn", "platform": "x", "count": 2, "llm": api_llm()}),
        ))
        .await
        .unwrap();
    let batch = response.themes().unwrap();

    assert_eq!(runner.calls(), 2);
    assert_eq!(batch.produced, 2);
    let first = &batch.themes[0];
    assert_eq!(first.title(), "Rainy Station");
    assert_eq!(first.source(), Some(GenerationSource::Llm));
    assert_eq!(
        first.metadata().get("model").map(String::as_str),
        Some("mock-model")
    );
    assert!(first.prompt_tags().iter().any(|t| t == "umbrella"));
}

#[tokio::test]
async fn e2e_model_failure_falls_back_per_item() {
    let runner = Arc::new(ScriptedRunner::new(vec![
        Ok(r#"{"title": "Moonlit Roof", "keywords": ["night_sky", "rooftop"]}"#.into()),
        Err(ModelUnavailable::transport("connection reset")),
    ]));
    let orchestrator = orchestrator_with(runner);

    let response = orchestrator
        .handle(&Request::new(
            "theme",
            json!({"platform": "x", "count": 3, "llm": api_llm()}),
        ))
        .await
        .unwrap();
    let batch = response.themes().unwrap();

    assert_eq!(batch.produced, 3);
    let llm = batch
        .themes
        .iter()
        .filter(|t| t.source() == Some(GenerationSource::Llm))
        .count();
    assert_eq!(llm, 1);

    let fallbacks: Vec<_> = batch
        .notes
        .iter()
        .filter(|n| n.kind == NoteKind::ModelFallback)
        .collect();
    assert_eq!(fallbacks.len(), 2);
    assert!(batch
        .themes
        .iter()
        .filter(|t| t.source() == Some(GenerationSource::Rule))
        .all(|t| t.metadata().get("fallback").map(String::as_str) == Some("transport")));
}

// ── E2E: Posts ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_rule_captions_for_multiple_languages() {
    let orchestrator = build_orchestrator(&AppConfig::default());
    let repo: InMemoryRepository<PostBatch> = InMemoryRepository::new();

    let response = orchestrator
        .handle(&Request::new(
            "post",
            json!({
                "platform": "x",
                "languages": ["en", "ja", "ja"],
                "artwork_meta": {
                    "title": "Evening Walk",
                    "mood": "warm",
                    "theme_tags": ["sunset", "street"],
                    "characters": ["Rin"]
                }
            }),
        ))
        .await
        .unwrap();
    let batch = response.posts().unwrap().clone();

    assert_eq!(batch.platform, "x");
    assert_eq!(batch.requested, 2);
    assert_eq!(batch.produced, 2);
    assert_eq!(batch.posts.languages().collect::<Vec<_>>(), vec!["en", "ja"]);

    let ja = batch.posts.get("ja").unwrap();
    assert!(ja.starts_with("Evening Walk を描きました"));
    assert!(ja.contains("#AIイラスト"));
    assert!(ja.contains("#AIart"));
    assert!(batch.posts.get("en").unwrap().contains("Evening Walk"));

    repo.save(batch).await.unwrap();
    let rule_posts = repo
        .list(&RecordFilter::default().source(GenerationSource::Rule))
        .await
        .unwrap();
    assert_eq!(rule_posts.len(), 1);
}

#[tokio::test]
async fn e2e_unknown_language_is_skipped_with_note() {
    let orchestrator = build_orchestrator(&AppConfig::default());

    let response = orchestrator
        .handle(&Request::new(
            "post",
            json!({
                "platform": "pixiv",
                "languages": ["ja", "xx"],
                "artwork_meta": {"title": "Snow Lantern"}
            }),
        ))
        .await
        .unwrap();
    let batch = response.posts().unwrap();

    assert_eq!(batch.requested, 2);
    assert_eq!(batch.produced, 1);
    assert!(batch.posts.get("xx").is_none());
    assert!(batch
        .notes
        .iter()
        .any(|n| n.item == "xx" && n.kind == NoteKind::TemplateMiss));
}

#[tokio::test]
async fn e2e_llm_caption_rewrite() {
    let runner = Arc::new(ScriptedRunner::text("Out for an evening walk! #AIart"));
    let orchestrator = orchestrator_with(runner.clone());

    let response = orchestrator
        .handle(&Request::new(
            "write_post",
            json!({
                "platform": "x",
                "languages": ["en"],
                "artwork_meta": {"title": "Evening Walk"},
                "llm": api_llm()
            }),
        ))
        .await
        .unwrap();
    let batch = response.posts().unwrap();

    assert_eq!(runner.calls(), 1);
    assert_eq!(batch.posts.get("en"), Some("Out for an evening walk! #AIart"));
    assert_eq!(batch.sources.get("en"), Some(&GenerationSource::Llm));
}

// ── E2E: Envelope errors ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_unknown_kind_is_rejected() {
    let orchestrator = build_orchestrator(&AppConfig::default());
    let err = orchestrator
        .handle(&Request::new("summarize", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedRequestKind(_)));
}

#[tokio::test]
async fn e2e_invalid_payload_is_rejected() {
    let orchestrator = build_orchestrator(&AppConfig::default());
    let err = orchestrator
        .handle(&Request::new("theme", json!({"platform": "x", "count": 0})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

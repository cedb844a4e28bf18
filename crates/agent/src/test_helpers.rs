//! Shared test doubles for agent tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use themeloom_core::{
    GenerationConfig, ModelRunner, ModelUnavailable, PostBatch, PostGenerator, PostRecord,
    PostRequest, ProviderKind, Result, ThemeBatch, ThemeGenerator, ThemeRequest,
};
use themeloom_providers::RunnerRegistry;

/// A runner that replays scripted outputs in order, repeating the last one.
pub struct ScriptedRunner {
    kind: ProviderKind,
    responses: Vec<std::result::Result<String, ModelUnavailable>>,
    call_count: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(kind: ProviderKind, responses: Vec<std::result::Result<String, ModelUnavailable>>) -> Self {
        assert!(!responses.is_empty(), "ScriptedRunner needs at least one response");
        Self {
            kind,
            responses,
            call_count: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn always(kind: ProviderKind, text: &str) -> Self {
        Self::new(kind, vec![Ok(text.to_string())])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn run(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut count = self.call_count.lock().unwrap();
        let index = (*count).min(self.responses.len() - 1);
        *count += 1;
        self.responses[index].clone()
    }
}

/// A runner whose every call fails with the given error.
pub struct FailingRunner {
    kind: ProviderKind,
    error: ModelUnavailable,
    call_count: Mutex<usize>,
}

impl FailingRunner {
    pub fn new(kind: ProviderKind, error: ModelUnavailable) -> Self {
        Self {
            kind,
            error,
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ModelRunner for FailingRunner {
    fn name(&self) -> &str {
        "failing"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn run(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable> {
        *self.call_count.lock().unwrap() += 1;
        Err(self.error.clone())
    }
}

/// A runner that never answers.
pub struct HangingRunner {
    kind: ProviderKind,
    call_count: Mutex<usize>,
}

impl HangingRunner {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ModelRunner for HangingRunner {
    fn name(&self) -> &str {
        "hanging"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn run(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable> {
        *self.call_count.lock().unwrap() += 1;
        std::future::pending::<()>().await;
        Err(ModelUnavailable::transport("unreachable"))
    }
}

/// A registry holding just `runner`.
pub fn registry_with(runner: Arc<dyn ModelRunner>) -> Arc<RunnerRegistry> {
    let mut registry = RunnerRegistry::new();
    registry.register(runner);
    Arc::new(registry)
}

/// Theme generator that only counts calls.
#[derive(Default)]
pub struct CountingThemeGenerator {
    call_count: Mutex<usize>,
}

impl CountingThemeGenerator {
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ThemeGenerator for CountingThemeGenerator {
    async fn generate_themes(&self, request: &ThemeRequest) -> Result<ThemeBatch> {
        *self.call_count.lock().unwrap() += 1;
        Ok(ThemeBatch {
            themes: Vec::new(),
            requested: request.count,
            produced: 0,
            notes: Vec::new(),
        })
    }
}

/// Post generator that only counts calls.
#[derive(Default)]
pub struct CountingPostGenerator {
    call_count: Mutex<usize>,
}

impl CountingPostGenerator {
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl PostGenerator for CountingPostGenerator {
    async fn generate_posts(&self, request: &PostRequest) -> Result<PostBatch> {
        *self.call_count.lock().unwrap() += 1;
        Ok(PostBatch {
            platform: request.platform.clone(),
            posts: PostRecord::default(),
            sources: Default::default(),
            requested: request.languages.len(),
            produced: 0,
            notes: Vec::new(),
        })
    }
}

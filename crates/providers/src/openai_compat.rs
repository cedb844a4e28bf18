//! OpenAI-compatible model runner.
//!
//! Works with: OpenAI, OpenRouter, vLLM, Ollama, a llama.cpp server, and any
//! endpoint exposing `/v1/chat/completions`.
//!
//! The prompt is sent as a single user message. Transport, auth, and decoding
//! failures all surface as [`ModelUnavailable`].

use async_trait::async_trait;
use serde::Deserialize;
use themeloom_core::{GenerationConfig, ModelRunner, ModelUnavailable, ProviderKind};
use tracing::{debug, warn};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const LLAMA_CPP_BASE_URL: &str = "http://localhost:8080/v1";

/// A runner for OpenAI-compatible chat completion endpoints.
pub struct ApiRunner {
    name: String,
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    temperature: f32,
    max_tokens: u32,
    /// Send `model_path` as the model id (llama.cpp servers).
    model_from_path: bool,
    client: reqwest::Client,
}

impl ApiRunner {
    /// Create a new runner for the `api` kind.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        // The guard enforces the per-call deadline; this is only a backstop.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            kind: ProviderKind::Api,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            default_model: "gpt-4.1-mini".into(),
            temperature: 0.6,
            max_tokens: 800,
            model_from_path: false,
            client,
        }
    }

    /// OpenAI proper (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, Some(api_key.into()))
    }

    /// A llama.cpp server serving the `local` kind.
    ///
    /// The request's `model_path` is forwarded as the model id.
    pub fn llama_cpp(base_url: Option<&str>) -> Self {
        let mut runner = Self::new("llama.cpp", base_url.unwrap_or(LLAMA_CPP_BASE_URL), None);
        runner.kind = ProviderKind::Local;
        runner.model_from_path = true;
        runner
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, config: &GenerationConfig) -> String {
        let base = config
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.base_url);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn model_for(&self, config: &GenerationConfig) -> String {
        let from_path = if self.model_from_path {
            config.model_path.as_deref()
        } else {
            None
        };
        from_path
            .or(config.model.as_deref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model)
            .to_string()
    }

    fn key_for<'a>(&'a self, config: &'a GenerationConfig) -> Option<&'a str> {
        config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .or(self.api_key.as_deref())
    }
}

#[async_trait]
impl ModelRunner for ApiRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn run(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable> {
        let url = self.endpoint(config);
        let model = self.model_for(config);

        let body = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        debug!(runner = %self.name, model = %model, "Sending completion request");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = self.key_for(config) {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModelUnavailable::transport(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(ModelUnavailable::auth(
                "Invalid API key or insufficient permissions",
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model endpoint returned error");
            return Err(ModelUnavailable::transport(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelUnavailable::malformed(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelUnavailable::malformed("No choices in response"))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn health_check(&self) -> std::result::Result<bool, ModelUnavailable> {
        let url = format!("{}/models", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| ModelUnavailable::transport(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

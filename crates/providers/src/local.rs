//! In-process local inference: runs GGUF models directly on your hardware.
//!
//! Uses [Candle](https://github.com/huggingface/candle) (Rust-native ML) to run
//! GGUF-quantized Llama-family models. The model file comes from the request's
//! `model_path` (or the configured default); a `tokenizer.json` must sit next
//! to it. Loaded models are cached per path for the life of the runner.
//!
//! A load runs in a detached task and always lands in the cache, even when
//! the call that started it times out. Generation checks a cancel flag on
//! every token, so a dropped call frees the model promptly.

use async_trait::async_trait;
use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama as qlm;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use themeloom_core::{GenerationConfig, ModelRunner, ModelUnavailable, ProviderKind};
use tokenizers::Tokenizer;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Prompt format expected by the model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatTemplate {
    /// `<|user|>\n{prompt}</s>\n<|assistant|>\n`
    TinyLlama,
    /// `<|im_start|>user\n{prompt}<|im_end|>\n<|im_start|>assistant\n`
    ChatML,
    /// `[INST] {prompt} [/INST]`
    Llama2,
    /// `<|begin_of_text|><|start_header_id|>user<|end_header_id|>...`
    Llama3,
}

impl ChatTemplate {
    /// Guess the template from the file name; ChatML otherwise.
    fn for_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();
        if name.contains("tinyllama") {
            Self::TinyLlama
        } else if name.contains("llama-3") || name.contains("llama3") {
            Self::Llama3
        } else if name.contains("llama-2") || name.contains("llama2") {
            Self::Llama2
        } else {
            Self::ChatML
        }
    }

    fn format(&self, prompt: &str) -> String {
        match self {
            Self::TinyLlama => format!("<|user|>\n{prompt}</s>\n<|assistant|>\n"),
            Self::ChatML => {
                format!("<|im_start|>user\n{prompt}<|im_end|>\n<|im_start|>assistant\n")
            }
            Self::Llama2 => format!("[INST] {prompt} [/INST]"),
            Self::Llama3 => format!(
                "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\n{prompt}<|eot_id|>\
                 <|start_header_id|>assistant<|end_header_id|>\n\n"
            ),
        }
    }
}

/// The loaded model state (tokenizer + weights).
struct LocalModelState {
    model: qlm::ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    chat_template: ChatTemplate,
    eos_token_id: u32,
}

type SharedState = Arc<Mutex<LocalModelState>>;

/// Per-path slot; filled once by whichever load finishes first.
type ModelSlot = Arc<OnceCell<SharedState>>;

/// A runner that executes GGUF models in-process via Candle.
///
/// Candle inference is CPU-bound and single-threaded per model, so each
/// loaded model sits behind its own mutex and runs on a blocking thread.
pub struct LocalRunner {
    default_path: Option<PathBuf>,
    models: Mutex<HashMap<PathBuf, ModelSlot>>,
    temperature: f32,
    max_tokens: u32,
}

impl LocalRunner {
    pub fn new(default_path: Option<String>) -> Self {
        Self {
            default_path: default_path.map(PathBuf::from),
            models: Mutex::new(HashMap::new()),
            temperature: 0.6,
            max_tokens: 800,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn path_for(&self, config: &GenerationConfig) -> Option<PathBuf> {
        config
            .model_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| self.default_path.clone())
    }

    /// Return the cached model for `path`, loading it on first use.
    async fn model(&self, path: PathBuf) -> Result<SharedState, ModelUnavailable> {
        let slot = self
            .models
            .lock()
            .await
            .entry(path.clone())
            .or_default()
            .clone();

        load_once(slot, move || {
            info!(path = %path.display(), "Loading local model on first request...");
            LocalModelState::load(&path).map(|state| Arc::new(Mutex::new(state)))
        })
        .await
    }
}

/// Fill `slot` with `load` unless it is already filled.
///
/// The load runs on a detached task, so dropping the returned future does
/// not discard a load in progress. A failed load leaves the slot empty and
/// the next call tries again.
async fn load_once<T, F>(slot: Arc<OnceCell<T>>, load: F) -> Result<T, ModelUnavailable>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<T, ModelUnavailable> + Send + 'static,
{
    if let Some(value) = slot.get() {
        return Ok(value.clone());
    }

    tokio::spawn(async move {
        slot.get_or_try_init(|| async move {
            tokio::task::spawn_blocking(load).await.map_err(|e| {
                ModelUnavailable::transport(format!("Model loading task failed: {e}"))
            })?
        })
        .await
        .cloned()
    })
    .await
    .map_err(|e| ModelUnavailable::transport(format!("Model loading task failed: {e}")))?
}

/// Sets the flag when dropped, including when the owning future is.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Run `work` on a blocking thread with a flag that flips once the caller
/// stops waiting.
async fn run_cancellable<T, F>(work: F) -> Result<T, ModelUnavailable>
where
    T: Send + 'static,
    F: FnOnce(&AtomicBool) -> Result<T, ModelUnavailable> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(cancelled.clone());

    tokio::task::spawn_blocking(move || work(cancelled.as_ref()))
        .await
        .map_err(|e| ModelUnavailable::transport(format!("Inference task panicked: {e}")))?
}

impl LocalModelState {
    fn load(path: &Path) -> Result<Self, ModelUnavailable> {
        if !path.is_file() {
            return Err(ModelUnavailable::not_configured(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let device = Device::Cpu;
        let mut file = std::fs::File::open(path).map_err(|e| {
            ModelUnavailable::not_configured(format!("Failed to open GGUF file: {e}"))
        })?;

        let gguf = gguf_file::Content::read(&mut file).map_err(|e| {
            ModelUnavailable::not_configured(format!("Failed to parse GGUF file: {e}"))
        })?;

        let model = qlm::ModelWeights::from_gguf(gguf, &mut file, &device).map_err(|e| {
            ModelUnavailable::not_configured(format!("Failed to load model weights: {e}"))
        })?;

        let tokenizer_path = path.with_file_name("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            ModelUnavailable::not_configured(format!(
                "Failed to load tokenizer at {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let eos_token_id = tokenizer
            .token_to_id("</s>")
            .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
            .or_else(|| tokenizer.token_to_id("<|im_end|>"))
            .or_else(|| tokenizer.token_to_id("<|eot_id|>"))
            .unwrap_or(2);

        info!(eos_token_id, "Local model loaded successfully");

        Ok(Self {
            model,
            tokenizer,
            device,
            chat_template: ChatTemplate::for_path(path),
            eos_token_id,
        })
    }

    /// Tokenize, sample up to `max_tokens`, decode.
    fn generate(
        &mut self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        cancelled: &AtomicBool,
    ) -> Result<String, ModelUnavailable> {
        let formatted = self.chat_template.format(prompt);
        let encoding = self
            .tokenizer
            .encode(formatted, true)
            .map_err(|e| ModelUnavailable::malformed(format!("Tokenization failed: {e}")))?;

        let prompt_tokens = encoding.get_ids();
        debug!(
            prompt_tokens = prompt_tokens.len(),
            max_tokens, temperature, "Starting local generation"
        );

        let mut next_input = Tensor::new(prompt_tokens, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(map_candle_err)?;

        let mut logits_processor = if temperature <= 0.0 {
            LogitsProcessor::new(42, None, None)
        } else {
            LogitsProcessor::new(42, Some(temperature as f64), None)
        };

        let mut generated: Vec<u32> = Vec::new();
        let mut position = 0;

        for _ in 0..max_tokens {
            if cancelled.load(Ordering::Relaxed) {
                debug!(completion_tokens = generated.len(), "Generation abandoned by caller");
                return Err(ModelUnavailable::timeout("generation cancelled"));
            }
            let input_len = next_input.dim(1).map_err(map_candle_err)?;
            let logits = self
                .model
                .forward(&next_input, position)
                .and_then(|l| l.squeeze(0))
                .map_err(map_candle_err)?;
            position += input_len;

            let last = logits.dim(0).map_err(map_candle_err)?.saturating_sub(1);
            let logits = logits.get(last).map_err(map_candle_err)?;
            let next_token = logits_processor.sample(&logits).map_err(map_candle_err)?;

            if next_token == self.eos_token_id {
                break;
            }
            generated.push(next_token);

            next_input = Tensor::new(&[next_token][..], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(map_candle_err)?;
        }

        let output = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| ModelUnavailable::malformed(format!("Detokenization failed: {e}")))?;

        debug!(completion_tokens = generated.len(), "Generation complete");
        Ok(clean_output(&output))
    }
}

fn map_candle_err(e: candle_core::Error) -> ModelUnavailable {
    ModelUnavailable::transport(format!("Candle inference error: {e}"))
}

/// Strip trailing special tokens a model may emit before EOS.
fn clean_output(output: &str) -> String {
    output
        .trim()
        .trim_end_matches("</s>")
        .trim_end_matches("<|im_end|>")
        .trim_end_matches("<|eot_id|>")
        .trim()
        .to_string()
}

#[async_trait]
impl ModelRunner for LocalRunner {
    fn name(&self) -> &str {
        "local"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn run(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> std::result::Result<String, ModelUnavailable> {
        let path = self.path_for(config).ok_or_else(|| {
            ModelUnavailable::not_configured(
                "no model_path given (set LLAMA_CPP_MODEL_PATH or pass model_path)",
            )
        })?;

        let state = self.model(path).await?;
        let prompt = prompt.to_string();
        let (max_tokens, temperature) = (self.max_tokens, self.temperature);

        run_cancellable(move |cancelled| {
            let mut guard = state.blocking_lock();
            guard.generate(&prompt, max_tokens, temperature, cancelled)
        })
        .await
    }

    async fn health_check(&self) -> std::result::Result<bool, ModelUnavailable> {
        Ok(self.default_path.as_deref().is_some_and(Path::is_file))
    }
}

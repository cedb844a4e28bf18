//! Bounded model calls.
//!
//! Every runner call goes through [`guarded_run`], which enforces a deadline
//! and walks a single attempt through
//! `NotStarted → Requested → Succeeded | Failed(cause)`.
//! There is no retry here: a failed attempt is reported once and the caller
//! falls back.

use std::time::{Duration, Instant};
use themeloom_core::{FailureCause, GenerationConfig, ModelRunner, ModelUnavailable};
use tracing::{debug, info, warn};

/// Where a single generation attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    NotStarted,
    Requested,
    Succeeded,
    Failed(FailureCause),
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

/// One attempt against a runner.
#[derive(Debug)]
pub struct Attempt {
    state: AttemptState,
    started: Option<Instant>,
}

impl Default for Attempt {
    fn default() -> Self {
        Self::new()
    }
}

impl Attempt {
    pub fn new() -> Self {
        Self {
            state: AttemptState::NotStarted,
            started: None,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// `NotStarted → Requested`. Returns false on any other edge.
    pub fn request(&mut self) -> bool {
        if self.state != AttemptState::NotStarted {
            return false;
        }
        self.state = AttemptState::Requested;
        self.started = Some(Instant::now());
        true
    }

    /// `Requested → Succeeded`.
    pub fn succeed(&mut self) -> bool {
        self.finish(AttemptState::Succeeded)
    }

    /// `Requested → Failed(cause)`.
    pub fn fail(&mut self, cause: FailureCause) -> bool {
        self.finish(AttemptState::Failed(cause))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    fn finish(&mut self, next: AttemptState) -> bool {
        if self.state != AttemptState::Requested {
            return false;
        }
        self.state = next;
        true
    }
}

/// Run `prompt` on `runner` under a deadline.
///
/// The deadline is the config's `timeout_secs` when set, else
/// `default_timeout`. Blank output counts as malformed.
pub async fn guarded_run(
    runner: &dyn ModelRunner,
    prompt: &str,
    config: &GenerationConfig,
    default_timeout: Duration,
) -> Result<String, ModelUnavailable> {
    let timeout = config.timeout_or(default_timeout);
    let mut attempt = Attempt::new();
    attempt.request();

    debug!(
        runner = runner.name(),
        timeout_secs = timeout.as_secs(),
        "Model attempt requested"
    );

    let result = match tokio::time::timeout(timeout, runner.run(prompt, config)).await {
        Ok(Ok(text)) if text.trim().is_empty() => {
            Err(ModelUnavailable::malformed("model returned empty output"))
        }
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ModelUnavailable::timeout(format!(
            "runner '{}' timed out after {}s",
            runner.name(),
            timeout.as_secs()
        ))),
    };

    match &result {
        Ok(_) => {
            attempt.succeed();
            info!(
                runner = runner.name(),
                elapsed_ms = attempt.elapsed().as_millis() as u64,
                "Model attempt succeeded"
            );
        }
        Err(e) => {
            attempt.fail(e.cause);
            warn!(
                runner = runner.name(),
                cause = %e.cause,
                error = %e.message,
                "Model attempt failed"
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use themeloom_core::ProviderKind;

    struct FixedRunner {
        reply: Result<String, ModelUnavailable>,
        calls: Mutex<usize>,
    }

    impl FixedRunner {
        fn new(reply: Result<String, ModelUnavailable>) -> Self {
            Self {
                reply,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelRunner for FixedRunner {
        fn name(&self) -> &str {
            "fixed"
        }
        fn kind(&self) -> ProviderKind {
            ProviderKind::Api
        }
        async fn run(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, ModelUnavailable> {
            *self.calls.lock().unwrap() += 1;
            self.reply.clone()
        }
    }

    struct HangingRunner;

    #[async_trait]
    impl ModelRunner for HangingRunner {
        fn name(&self) -> &str {
            "hanging"
        }
        fn kind(&self) -> ProviderKind {
            ProviderKind::Api
        }
        async fn run(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, ModelUnavailable> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".into())
        }
    }

    fn api() -> GenerationConfig {
        GenerationConfig::with_provider(ProviderKind::Api)
    }

    #[test]
    fn attempt_walks_legal_edges_only() {
        let mut attempt = Attempt::new();
        assert_eq!(attempt.state(), AttemptState::NotStarted);
        assert!(!attempt.succeed());
        assert!(attempt.request());
        assert!(!attempt.request());
        assert!(attempt.fail(FailureCause::Transport));
        assert_eq!(attempt.state(), AttemptState::Failed(FailureCause::Transport));
        assert!(attempt.state().is_terminal());
        assert!(!attempt.succeed());
    }

    #[tokio::test]
    async fn success_passes_text_through() {
        let runner = FixedRunner::new(Ok("hello".into()));
        let out = guarded_run(&runner, "p", &api(), Duration::from_secs(5)).await;
        assert_eq!(out.unwrap(), "hello");
        assert_eq!(*runner.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn failure_is_not_retried() {
        let runner = FixedRunner::new(Err(ModelUnavailable::transport("refused")));
        let err = guarded_run(&runner, "p", &api(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.cause, FailureCause::Transport);
        assert_eq!(*runner.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn blank_output_is_malformed() {
        let runner = FixedRunner::new(Ok("  \n".into()));
        let err = guarded_run(&runner, "p", &api(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.cause, FailureCause::Malformed);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_runner_times_out() {
        let err = guarded_run(&HangingRunner, "p", &api(), Duration::from_secs(30))
            .await
            .unwrap_err();
        assert_eq!(err.cause, FailureCause::Timeout);
        assert!(err.message.contains("30s"));
    }

    #[tokio::test(start_paused = true)]
    async fn request_timeout_overrides_default() {
        let config = GenerationConfig {
            timeout_secs: Some(2),
            ..api()
        };
        let err = guarded_run(&HangingRunner, "p", &config, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(err.message.contains("2s"));
    }
}

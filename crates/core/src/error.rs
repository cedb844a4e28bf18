//! Error types for the Themeloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Only structurally invalid requests are fatal; item-level failures
//! (a model call, a missing caption template) are absorbed by the agents.

use std::fmt;
use thiserror::Error;

/// The top-level error type for all Themeloom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported request kind: {0}")]
    UnsupportedRequestKind(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // --- Generation ---
    #[error(transparent)]
    ModelUnavailable(#[from] ModelUnavailable),

    #[error("No caption template for platform '{platform}' and language '{language}'")]
    TemplateMiss { platform: String, language: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single model attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    Timeout,
    Transport,
    Auth,
    Malformed,
    NotConfigured,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::Malformed => "malformed",
            Self::NotConfigured => "not_configured",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error kind a Model Runner surfaces.
///
/// Every runner variant maps its transport, auth, and decoding failures onto
/// this type, so callers only ever see one shape of failure.
#[derive(Debug, Clone, Error)]
#[error("Model unavailable ({cause}): {message}")]
pub struct ModelUnavailable {
    pub cause: FailureCause,
    pub message: String,
}

impl ModelUnavailable {
    pub fn new(cause: FailureCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureCause::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureCause::Transport, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FailureCause::Auth, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureCause::Malformed, message)
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(FailureCause::NotConfigured, message)
    }
}

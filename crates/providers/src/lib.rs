//! Model Runner implementations for Themeloom.
//!
//! All runners implement the `themeloom_core::ModelRunner` trait.
//! The registry selects a runner from a request's provider kind, and
//! [`guarded_run`] bounds every call with a timeout.

pub mod discovery;
pub mod guard;
#[cfg(feature = "local")]
pub mod local;
pub mod noop;
pub mod openai_compat;
pub mod registry;

pub use discovery::{discover_models, LocalModel};
pub use guard::{guarded_run, Attempt, AttemptState};
#[cfg(feature = "local")]
pub use local::LocalRunner;
pub use noop::NoopRunner;
pub use openai_compat::ApiRunner;
pub use registry::{build_from_config, RunnerRegistry};

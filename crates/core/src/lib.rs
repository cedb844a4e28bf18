//! # Themeloom Core
//!
//! Records, traits, and error definitions for the Themeloom generation engine.
//! This crate has **no framework dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! ## Layout
//!
//! Every collaborator of the agents is a trait here (model runner, template
//! libraries, preference store, trend source, repository). Implementations
//! live in their own crates, so rule-based and model-backed generation can be
//! swapped by configuration and tests can inject scripted stand-ins.

pub mod agent;
pub mod error;
pub mod generation;
pub mod record;
pub mod repository;
pub mod request;
pub mod runner;
pub mod skill;

// Re-export key types at crate root for ergonomics
pub use agent::{PostGenerator, ThemeGenerator};
pub use error::{Error, FailureCause, ModelUnavailable, Result};
pub use generation::{GenerationConfig, ProviderKind};
pub use record::{
    normalize_tag, ArtworkRecord, Caption, GenerationSource, NsfwLevel, PostRecord, ThemeRecord,
};
pub use repository::{Filterable, RecordFilter, Repository, StoredRecord};
pub use request::{
    CaptionStyle, GenerationNote, NoteKind, PostBatch, PostRequest, Request, RequestKind,
    Response, ThemeBatch, ThemeRequest,
};
pub use runner::ModelRunner;
pub use skill::{
    normalize_language, normalize_platform, CaptionTemplates, HashtagGenerator,
    PreferenceProfile, PreferenceStore, PromptTemplate, PromptTemplates, SeasonPreset,
    TagCategory, TrendSource,
};

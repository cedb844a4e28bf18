//! Concrete skills for the Themeloom agents.
//!
//! Every skill here is a read-only lookup implementing one of the traits in
//! `themeloom_core::skill`. They are built once at startup and shared across
//! requests behind `Arc`.

pub mod caption_templates;
pub mod hashtags;
pub mod preferences;
pub mod prompt_templates;
pub mod tags;
pub mod trends;

pub use caption_templates::CaptionLibrary;
pub use hashtags::DefaultHashtagGenerator;
pub use preferences::StaticPreferenceStore;
pub use prompt_templates::TemplateLibrary;
pub use tags::{classify_keyword, is_banned_keyword, tag_nsfw_level, TagClassifier};
pub use trends::{season_for_month, StaticTrendSource};

//! Skill traits: the read-only collaborators the agents consult.
//!
//! Template libraries, the preference store, the trend source and the hashtag
//! generator are injected into agents at construction time. None of them is
//! mutated while a request is in flight.

use crate::record::{normalize_tag, ArtworkRecord, NsfwLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prompt tag categories, in the order tags are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    Clothing,
    Mood,
    Setting,
    Expression,
    Action,
    Artistic,
    Object,
}

impl TagCategory {
    pub const ALL: [TagCategory; 7] = [
        Self::Clothing,
        Self::Mood,
        Self::Setting,
        Self::Expression,
        Self::Action,
        Self::Artistic,
        Self::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clothing => "clothing",
            Self::Mood => "mood",
            Self::Setting => "setting",
            Self::Expression => "expression",
            Self::Action => "action",
            Self::Artistic => "artistic",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of categorized base tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub tags: BTreeMap<TagCategory, Vec<String>>,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with(mut self, category: TagCategory, tags: &[&str]) -> Self {
        self.tags
            .entry(category)
            .or_default()
            .extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn category(&self, category: TagCategory) -> &[String] {
        self.tags.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All tags in category order.
    pub fn flatten(&self) -> Vec<String> {
        self.tags.values().flatten().cloned().collect()
    }
}

/// Setting and mood tags implied by a season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonPreset {
    pub setting: Vec<String>,
    pub mood: Vec<String>,
}

/// Lookup tables for prompt-tag fragments.
pub trait PromptTemplates: Send + Sync {
    /// The template called `name`, or the default template when unknown.
    fn template(&self, name: &str) -> PromptTemplate;

    /// Extra tags a platform always wants.
    fn platform_tags(&self, platform: &str) -> Vec<String>;

    /// Setting and mood fragments for a season (`"any"` yields an indoor default).
    fn season_preset(&self, season: &str) -> SeasonPreset;
}

/// Lookup table for caption skeletons.
pub trait CaptionTemplates: Send + Sync {
    /// The template for `(platform, language, tone)`, or `None` on a miss.
    fn caption_template(&self, platform: &str, language: &str, tone: &str) -> Option<String>;
}

/// Source of currently trending tags.
pub trait TrendSource: Send + Sync {
    /// Up to `limit` trending tags for `category`, in rank order. May be empty.
    fn trending_tags(&self, category: &str, season: Option<&str>, limit: usize) -> Vec<String>;
}

/// Hashtag generation for captions.
pub trait HashtagGenerator: Send + Sync {
    fn hashtags(
        &self,
        artwork: &ArtworkRecord,
        platform: &str,
        language: &str,
        max_count: usize,
    ) -> Vec<String>;
}

/// The user's generation preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceProfile {
    pub default_style: String,
    pub allowed_nsfw_level: NsfwLevel,
    pub favorite_motifs: Vec<String>,
    pub ng_tags: Vec<String>,
    pub default_tone: String,
    /// Focus keyword → prompt template name.
    pub focus_templates: BTreeMap<String, String>,
    /// `"platform:language"` → caption tone.
    pub caption_tones: BTreeMap<String, String>,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        let focus_templates = [
            ("bikini", "swimsuit"),
            ("swimsuit", "swimsuit"),
            ("frilled_bikini", "swimsuit"),
            ("school_uniform", "school_uniform"),
            ("idol", "idol_stage"),
            ("idol_costume", "idol_stage"),
            ("room_morning", "room_morning"),
        ];
        let caption_tones = [
            ("x:ja", "cute"),
            ("x:zh", "cute"),
            ("patreon:ja", "patreon_support"),
            ("patreon:zh", "patreon_support"),
            ("pixiv:ja", "serious"),
        ];

        Self {
            default_style: "anime_girl".into(),
            allowed_nsfw_level: NsfwLevel::None,
            favorite_motifs: [
                "frilled_bikini",
                "school_uniform",
                "thighhighs",
                "bare_legs",
                "side_ponytail",
                "twin_tails",
                "idol_costume",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ng_tags: ["gore", "violence", "blood", "guts", "extreme_guro"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            focus_templates: focus_templates
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_tone: "cute".into(),
            caption_tones: caption_tones
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl PreferenceProfile {
    /// Tone for a platform/language pair, falling back to `default_tone`.
    pub fn caption_tone(&self, platform: &str, language: &str) -> &str {
        let key = format!("{}:{}", normalize_platform(platform), normalize_language(language));
        self.caption_tones
            .get(&key)
            .map(String::as_str)
            .unwrap_or(&self.default_tone)
    }

    /// Template name configured for a focus keyword.
    pub fn template_for_focus(&self, focus: &str) -> Option<&str> {
        self.focus_templates.get(focus).map(String::as_str)
    }

    /// Profile entries are hand-written; both sides are compared in tag form.
    pub fn is_favorite(&self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        self.favorite_motifs.iter().any(|f| normalize_tag(f) == tag)
    }

    pub fn is_ng(&self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        self.ng_tags.iter().any(|t| normalize_tag(t) == tag)
    }
}

/// Read-only access to the preference profile.
pub trait PreferenceStore: Send + Sync {
    /// A snapshot of the profile, taken once per request.
    fn profile(&self) -> PreferenceProfile;
}

/// Canonical platform key (`twitter` is `x`).
pub fn normalize_platform(platform: &str) -> String {
    let p = platform.trim().to_lowercase();
    if p == "twitter" { "x".into() } else { p }
}

/// Canonical language key used for template lookups.
pub fn normalize_language(language: &str) -> String {
    let lang = language.trim().to_lowercase();
    match lang.as_str() {
        "jp" | "ja-jp" => "ja".into(),
        "zh-tw" | "zh-hant" | "zh-cn" | "zh-hans" => "zh".into(),
        "en-us" | "en-gb" => "en".into(),
        _ => lang,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_flattens_in_category_order() {
        let template = PromptTemplate::new("t")
            .with(TagCategory::Object, &["sand"])
            .with(TagCategory::Clothing, &["bikini"])
            .with(TagCategory::Setting, &["beach"]);
        assert_eq!(template.flatten(), vec!["bikini", "beach", "sand"]);
        assert!(template.category(TagCategory::Mood).is_empty());
    }

    #[test]
    fn caption_tone_falls_back_to_default() {
        let profile = PreferenceProfile::default();
        assert_eq!(profile.caption_tone("Twitter", "ja"), "cute");
        assert_eq!(profile.caption_tone("patreon", "jp"), "patreon_support");
        assert_eq!(profile.caption_tone("pixiv", "en"), "cute");
    }

    #[test]
    fn language_aliases() {
        assert_eq!(normalize_language("JP"), "ja");
        assert_eq!(normalize_language("zh-TW"), "zh");
        assert_eq!(normalize_language("xx"), "xx");
        assert_eq!(normalize_platform(" Twitter "), "x");
    }

    #[test]
    fn profile_deserializes_partially() {
        let profile: PreferenceProfile =
            serde_json::from_str(r#"{"allowed_nsfw_level":"mild","default_tone":"serious"}"#).unwrap();
        assert_eq!(profile.allowed_nsfw_level, NsfwLevel::Suggestive);
        assert_eq!(profile.default_tone, "serious");
        assert!(profile.is_ng("gore"));
    }

    #[test]
    fn favorites_match_in_tag_form() {
        let profile = PreferenceProfile {
            favorite_motifs: vec!["Twin Tails".into(), "school_uniform".into()],
            ..PreferenceProfile::default()
        };
        assert!(profile.is_favorite("twin_tails"));
        assert!(profile.is_favorite("School Uniform"));
        assert!(!profile.is_favorite("twin"));
    }
}

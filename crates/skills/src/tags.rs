//! Tag classification: category and NSFW level for prompt tags.

use crate::prompt_templates::TemplateLibrary;
use std::collections::HashMap;
use themeloom_core::{normalize_tag, NsfwLevel, PromptTemplates, TagCategory};

const EXPLICIT: &[&str] = &[
    "nude",
    "naked",
    "nsfw",
    "sex",
    "nipples",
    "pussy",
    "penis",
    "cum",
    "topless",
    "bottomless",
    "explicit",
];

const SUGGESTIVE: &[&str] = &[
    "cleavage",
    "lingerie",
    "underwear",
    "panties",
    "see-through",
    "see_through",
    "sideboob",
    "underboob",
    "ecchi",
    "pantyshot",
    "bra",
    "wet_clothes",
];

/// Keywords that never make useful prompt tags.
const BANNED: &[&str] = &[
    "background",
    "name",
    "text",
    "joke",
    "speech",
    "stickers",
    "signature",
    "watermark",
    "username",
    "artist_name",
    "hat",
    "costume",
    "alternative",
];

/// Guess a category from keyword fragments. Unknown keywords are objects.
pub fn classify_keyword(keyword: &str) -> TagCategory {
    let k = keyword.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| k.contains(n));

    if has(&["bikini", "swimsuit", "uniform", "dress", "shirt", "skirt"]) {
        TagCategory::Clothing
    } else if has(&["beach", "street", "room", "stage", "sky", "view", "indoor", "outdoor"]) {
        TagCategory::Setting
    } else if has(&["smile", "blush", "sad", "angry", "look"]) {
        TagCategory::Expression
    } else if has(&["sitting", "standing", "running", "lying"]) {
        TagCategory::Action
    } else if has(&["masterpiece", "best_quality", "best quality", "absurdres"]) {
        TagCategory::Artistic
    } else {
        TagCategory::Object
    }
}

/// NSFW level a single tag implies.
pub fn tag_nsfw_level(tag: &str) -> NsfwLevel {
    let t = normalize_tag(tag);
    if EXPLICIT.contains(&t.as_str()) {
        NsfwLevel::Explicit
    } else if SUGGESTIVE.contains(&t.as_str()) {
        NsfwLevel::Suggestive
    } else {
        NsfwLevel::None
    }
}

pub fn is_banned_keyword(tag: &str) -> bool {
    BANNED.contains(&normalize_tag(tag).as_str())
}

/// Category lookup that knows every template and season tag, and falls back
/// to [`classify_keyword`] for anything else.
pub struct TagClassifier {
    known: HashMap<String, TagCategory>,
}

impl Default for TagClassifier {
    fn default() -> Self {
        Self::from_templates(&TemplateLibrary::default())
    }
}

impl TagClassifier {
    pub fn from_templates(library: &TemplateLibrary) -> Self {
        let mut known = HashMap::new();
        for template in library.templates() {
            for (category, tags) in &template.tags {
                for tag in tags {
                    known.entry(tag.clone()).or_insert(*category);
                }
            }
        }
        for season in ["summer", "winter", "any"] {
            let preset = library.season_preset(season);
            for tag in preset.setting {
                known.entry(tag).or_insert(TagCategory::Setting);
            }
            for tag in preset.mood {
                known.entry(tag).or_insert(TagCategory::Mood);
            }
        }
        Self { known }
    }

    pub fn category(&self, tag: &str) -> TagCategory {
        self.known
            .get(tag)
            .copied()
            .unwrap_or_else(|| classify_keyword(tag))
    }

    /// Stable sort by category; order within a category is kept.
    pub fn sort(&self, tags: &mut [String]) {
        tags.sort_by_key(|t| self.category(t));
    }

    /// Tags grouped by category, in category order.
    pub fn group<'a>(&self, tags: &'a [String]) -> Vec<(TagCategory, Vec<&'a str>)> {
        TagCategory::ALL
            .iter()
            .filter_map(|category| {
                let members: Vec<&str> = tags
                    .iter()
                    .filter(|t| self.category(t) == *category)
                    .map(String::as_str)
                    .collect();
                (!members.is_empty()).then_some((*category, members))
            })
            .collect()
    }
}

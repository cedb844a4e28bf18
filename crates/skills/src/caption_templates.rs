//! Caption template library.
//!
//! Templates are keyed by `(platform, language, tone)`; `*` stands for any
//! platform. Lookup walks a fixed chain from the exact key down to the
//! language-wide fallback and returns `None` when the language has nothing.
//!
//! Placeholders: `{title} {mood} {characters} {extra} {hashtags} {tone}`.

use std::collections::HashMap;
use themeloom_core::{normalize_language, normalize_platform, CaptionTemplates};
use tracing::debug;

const BODY: &str = "\n{characters}\n{mood}\n{extra}\n\n{hashtags}";

pub struct CaptionLibrary {
    templates: HashMap<(String, String, String), String>,
}

impl Default for CaptionLibrary {
    fn default() -> Self {
        let mut library = Self {
            templates: HashMap::new(),
        };

        let headlines = [
            ("x", "ja", "cute", "{title} を描きました🎨✨"),
            ("x", "zh", "cute", "新畫好了《{title}》🎨✨"),
            ("x", "ja", "serious", "新作イラスト「{title}」です。"),
            ("x", "zh", "serious", "這次的作品是《{title}》。"),
            (
                "patreon",
                "ja",
                "patreon_support",
                "「{title}」が完成しました、いつも応援ありがとうございます🎨",
            ),
            ("patreon", "zh", "patreon_support", "《{title}》完成了，謝謝一直支持的你們🎨"),
            (
                "patreon",
                "en",
                "patreon_support",
                "“{title}” is done, thank you for your support as always 🎨",
            ),
            ("*", "en", "cute", "Finished a new piece: “{title}” 🎨✨"),
            ("*", "en", "serious", "My new illustration: “{title}”."),
            ("*", "ja", "fallback", "{title} を描きました。"),
            ("*", "zh", "fallback", "完成一張新圖：《{title}》。"),
            ("*", "en", "fallback", "New artwork: “{title}” 🎨"),
        ];

        for (platform, language, tone, headline) in headlines {
            library.insert(platform, language, tone, format!("{headline}{BODY}"));
        }

        library
    }
}

impl CaptionLibrary {
    /// An empty library.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Register a template. Keys are normalized like lookups.
    pub fn insert(&mut self, platform: &str, language: &str, tone: &str, template: impl Into<String>) {
        let platform = if platform == "*" {
            "*".to_string()
        } else {
            normalize_platform(platform)
        };
        self.templates.insert(
            (platform, normalize_language(language), tone.trim().to_lowercase()),
            template.into(),
        );
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl CaptionTemplates for CaptionLibrary {
    fn caption_template(&self, platform: &str, language: &str, tone: &str) -> Option<String> {
        let p = normalize_platform(platform);
        let lang = normalize_language(language);
        let t = tone.trim().to_lowercase();

        let candidates = [
            (p.as_str(), t.as_str()),
            (p.as_str(), "cute"),
            (p.as_str(), "fallback"),
            ("*", t.as_str()),
            ("*", "cute"),
            ("*", "fallback"),
        ];

        let found = candidates.iter().find_map(|(platform, tone)| {
            self.templates
                .get(&(platform.to_string(), lang.clone(), tone.to_string()))
        });

        if found.is_none() {
            debug!(platform = %p, language = %lang, tone = %t, "No caption template");
        }
        found.cloned()
    }
}

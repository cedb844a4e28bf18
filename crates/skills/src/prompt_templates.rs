//! Prompt template library.
//!
//! Named, categorized base tag sets (`default`, `swimsuit`, `school_uniform`,
//! `idol_stage`, `room_morning`), per-season presets, and per-platform extras.
//! Unknown template names resolve to `default`.

use std::collections::HashMap;
use themeloom_core::{normalize_platform, PromptTemplate, PromptTemplates, SeasonPreset, TagCategory};

use TagCategory::*;

pub struct TemplateLibrary {
    templates: HashMap<String, PromptTemplate>,
    platform_tags: HashMap<String, Vec<String>>,
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        let mut library = Self {
            templates: HashMap::new(),
            platform_tags: HashMap::new(),
        };

        library.insert(
            PromptTemplate::new("default")
                .with(Mood, &["cute", "soft"])
                .with(Expression, &["smile", "blush"])
                .with(Action, &["looking_at_viewer"])
                .with(
                    Artistic,
                    &[
                        "masterpiece",
                        "best_quality",
                        "high_resolution",
                        "detailed_eyes",
                        "soft_lighting",
                    ],
                ),
        );

        library.insert(
            PromptTemplate::new("swimsuit")
                .with(Clothing, &["swimsuit", "bikini"])
                .with(Mood, &["bright", "relaxed", "summer"])
                .with(Setting, &["beach", "sea", "blue_sky"])
                .with(Expression, &["smile", "blush"])
                .with(Action, &["standing", "looking_at_viewer"])
                .with(
                    Artistic,
                    &[
                        "masterpiece",
                        "best_quality",
                        "high_resolution",
                        "detailed_water",
                        "sunlight",
                        "backlighting",
                    ],
                )
                .with(Object, &["waves", "sand"]),
        );

        library.insert(
            PromptTemplate::new("school_uniform")
                .with(Clothing, &["school_uniform", "pleated_skirt", "blazer"])
                .with(Mood, &["daily_life", "youthful", "soft"])
                .with(Setting, &["school_hallway", "classroom"])
                .with(Expression, &["smile", "blush"])
                .with(Action, &["walking", "looking_at_viewer"])
                .with(
                    Artistic,
                    &["masterpiece", "best_quality", "high_resolution", "soft_lighting"],
                )
                .with(Object, &["school_bag", "windows"]),
        );

        library.insert(
            PromptTemplate::new("idol_stage")
                .with(Clothing, &["idol_costume", "frills", "ribbons"])
                .with(Mood, &["energetic", "sparkling", "stage_performance"])
                .with(Setting, &["stage", "spotlight", "audience_in_background"])
                .with(Expression, &["smile", "winking"])
                .with(Action, &["singing", "dancing", "holding_microphone"])
                .with(
                    Artistic,
                    &[
                        "masterpiece",
                        "best_quality",
                        "high_resolution",
                        "dynamic_lighting",
                        "colorful_lights",
                    ],
                )
                .with(Object, &["microphone", "stage_lights", "confetti"]),
        );

        library.insert(
            PromptTemplate::new("room_morning")
                .with(Clothing, &["casual_outfit", "roomwear"])
                .with(Mood, &["cozy", "relaxed", "morning"])
                .with(Setting, &["bedroom", "sunlight_through_window"])
                .with(Expression, &["sleepy_eyes", "small_smile"])
                .with(Action, &["stretching", "sitting_on_bed"])
                .with(
                    Artistic,
                    &["masterpiece", "best_quality", "soft_lighting", "warm_tones"],
                )
                .with(Object, &["pillow", "blanket", "plush_toy"]),
        );

        library
    }
}

impl TemplateLibrary {
    /// Add or replace a template under its own name.
    pub fn insert(&mut self, template: PromptTemplate) {
        self.templates
            .insert(template.name.to_lowercase(), template);
    }

    /// Tags every theme for `platform` should carry.
    pub fn with_platform_tags(mut self, platform: &str, tags: &[&str]) -> Self {
        self.platform_tags.insert(
            normalize_platform(platform),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// All registered templates, sorted by name.
    pub fn templates(&self) -> Vec<&PromptTemplate> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl PromptTemplates for TemplateLibrary {
    fn template(&self, name: &str) -> PromptTemplate {
        let key = name.trim().to_lowercase();
        self.templates
            .get(&key)
            .or_else(|| self.templates.get("default"))
            .cloned()
            .unwrap_or_else(|| PromptTemplate::new("default"))
    }

    fn platform_tags(&self, platform: &str) -> Vec<String> {
        self.platform_tags
            .get(&normalize_platform(platform))
            .cloned()
            .unwrap_or_default()
    }

    fn season_preset(&self, season: &str) -> SeasonPreset {
        let (setting, mood): (&str, &[&str]) = match season.trim().to_lowercase().as_str() {
            "summer" => ("beach", &["sunny", "bright"]),
            "winter" => ("snowy_city", &["cozy", "quiet"]),
            _ => ("room", &["daily"]),
        };
        SeasonPreset {
            setting: vec![setting.to_string()],
            mood: mood.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_template_falls_back_to_default() {
        let library = TemplateLibrary::default();
        let template = library.template("does_not_exist");
        assert_eq!(template.name, "default");
        assert!(template.category(Artistic).contains(&"masterpiece".to_string()));
    }

    #[test]
    fn template_lookup_is_case_insensitive() {
        let library = TemplateLibrary::default();
        let template = library.template("Swimsuit");
        assert_eq!(template.name, "swimsuit");
        assert_eq!(template.category(Setting), &["beach", "sea", "blue_sky"]);
    }

    #[test]
    fn season_presets() {
        let library = TemplateLibrary::default();
        assert_eq!(library.season_preset("summer").setting, vec!["beach"]);
        assert_eq!(library.season_preset("WINTER").mood, vec!["cozy", "quiet"]);
        let any = library.season_preset("any");
        assert_eq!(any.setting, vec!["room"]);
        assert_eq!(any.mood, vec!["daily"]);
    }

    #[test]
    fn platform_tags_use_aliases() {
        let library = TemplateLibrary::default().with_platform_tags("x", &["wide_shot"]);
        assert_eq!(library.platform_tags("twitter"), vec!["wide_shot"]);
        assert!(library.platform_tags("pixiv").is_empty());
    }

    #[test]
    fn all_templates_registered() {
        let names: Vec<_> = TemplateLibrary::default()
            .templates()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(
            names,
            vec!["default", "idol_stage", "room_morning", "school_uniform", "swimsuit"]
        );
    }
}

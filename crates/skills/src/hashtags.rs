use std::collections::HashSet;
use themeloom_core::{normalize_language, normalize_platform, ArtworkRecord, HashtagGenerator};

/// Theme tags that make it into a caption's hashtags.
const THEME_TAGS: usize = 3;

/// Language tag, platform tag, then the first few theme tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHashtagGenerator;

impl HashtagGenerator for DefaultHashtagGenerator {
    fn hashtags(
        &self,
        artwork: &ArtworkRecord,
        platform: &str,
        language: &str,
        max_count: usize,
    ) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();

        tags.push(
            match normalize_language(language).as_str() {
                "ja" => "AIイラスト",
                "zh" => "AI插畫",
                _ => "ai_art",
            }
            .to_string(),
        );

        match normalize_platform(platform).as_str() {
            "x" => tags.push("AIart".into()),
            "patreon" => tags.push("Patreon".into()),
            _ => {}
        }

        tags.extend(
            artwork
                .unique_tags()
                .into_iter()
                .take(THEME_TAGS)
                .map(|t| t.replace(' ', "_")),
        );

        let mut seen = HashSet::new();
        tags.into_iter()
            .filter(|t| seen.insert(t.to_lowercase()))
            .take(max_count)
            .map(|t| format!("#{t}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artwork() -> ArtworkRecord {
        ArtworkRecord::new("Summer")
            .with_tag("beach")
            .with_tag("bikini")
            .with_tag("beach")
            .with_tag("sunset")
            .with_tag("sea")
    }

    #[test]
    fn japanese_on_x() {
        let tags = DefaultHashtagGenerator.hashtags(&artwork(), "twitter", "jp", 10);
        assert_eq!(
            tags,
            vec!["#AIイラスト", "#AIart", "#beach", "#bikini", "#sunset"]
        );
    }

    #[test]
    fn patreon_and_english() {
        let tags = DefaultHashtagGenerator.hashtags(&artwork(), "patreon", "en", 10);
        assert_eq!(tags[..2], ["#ai_art", "#Patreon"]);
    }

    #[test]
    fn capped_and_deduplicated() {
        let art = ArtworkRecord::new("t").with_tag("AIart").with_tag("flowers");
        let tags = DefaultHashtagGenerator.hashtags(&art, "x", "zh", 3);
        assert_eq!(tags, vec!["#AI插畫", "#AIart", "#flowers"]);
        assert!(DefaultHashtagGenerator.hashtags(&art, "x", "zh", 0).is_empty());
    }
}

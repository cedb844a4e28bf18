//! Value records produced and consumed by generation.
//!
//! Records are created fresh per request, validated once at construction,
//! and handed to the caller by value. Nothing mutates them afterwards.

use crate::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// How explicit a theme is allowed to be. Ordered from mildest to strongest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NsfwLevel {
    #[default]
    #[serde(alias = "sfw")]
    None,
    #[serde(alias = "mild")]
    Suggestive,
    #[serde(alias = "nsfw")]
    Explicit,
}

impl NsfwLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Suggestive => "suggestive",
            Self::Explicit => "explicit",
        }
    }
}

impl fmt::Display for NsfwLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NsfwLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "sfw" => Ok(Self::None),
            "suggestive" | "mild" => Ok(Self::Suggestive),
            "explicit" | "nsfw" => Ok(Self::Explicit),
            other => Err(Error::InvalidRequest(format!("unknown nsfw level '{other}'"))),
        }
    }
}

/// Which path produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Rule,
    Llm,
}

impl GenerationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Llm => "llm",
        }
    }
}

impl fmt::Display for GenerationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a prompt tag: trimmed, lowercase, whitespace runs become `_`.
pub fn normalize_tag(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// A generated illustration theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawThemeRecord")]
pub struct ThemeRecord {
    title: String,
    short_concept: String,
    prompt_tags: Vec<String>,
    nsfw_level: NsfwLevel,
    metadata: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawThemeRecord {
    title: String,
    #[serde(default)]
    short_concept: String,
    prompt_tags: Vec<String>,
    #[serde(default)]
    nsfw_level: NsfwLevel,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl TryFrom<RawThemeRecord> for ThemeRecord {
    type Error = Error;

    fn try_from(raw: RawThemeRecord) -> Result<Self> {
        Self::new(
            raw.title,
            raw.short_concept,
            raw.prompt_tags,
            raw.nsfw_level,
            raw.metadata,
        )
    }
}

impl ThemeRecord {
    /// Build a theme. Tags are normalized and deduplicated in insertion order;
    /// an empty title or an empty tag list is rejected.
    pub fn new<I, S>(
        title: impl Into<String>,
        short_concept: impl Into<String>,
        prompt_tags: I,
        nsfw_level: NsfwLevel,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidRecord("theme title is empty".into()));
        }

        let mut seen = HashSet::new();
        let prompt_tags: Vec<String> = prompt_tags
            .into_iter()
            .map(|t| normalize_tag(t.as_ref()))
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();

        if prompt_tags.is_empty() {
            return Err(Error::InvalidRecord(format!(
                "theme '{title}' has no prompt tags"
            )));
        }

        Ok(Self {
            title,
            short_concept: short_concept.into().trim().to_string(),
            prompt_tags,
            nsfw_level,
            metadata,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn short_concept(&self) -> &str {
        &self.short_concept
    }

    pub fn prompt_tags(&self) -> &[String] {
        &self.prompt_tags
    }

    pub fn nsfw_level(&self) -> NsfwLevel {
        self.nsfw_level
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// The `source` metadata entry, if it names a known path.
    pub fn source(&self) -> Option<GenerationSource> {
        match self.metadata.get("source").map(String::as_str) {
            Some("rule") => Some(GenerationSource::Rule),
            Some("llm") => Some(GenerationSource::Llm),
            _ => None,
        }
    }

    /// Tags as an unordered set, for duplicate detection across a batch.
    pub fn tag_set(&self) -> BTreeSet<&str> {
        self.prompt_tags.iter().map(String::as_str).collect()
    }
}

/// Caller-supplied description of a finished artwork.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    pub title: String,

    #[serde(default)]
    pub mood: String,

    #[serde(default)]
    pub theme_tags: Vec<String>,

    #[serde(default)]
    pub characters: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_note: Option<String>,
}

impl ArtworkRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = mood.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.theme_tags.push(tag.into());
        self
    }

    pub fn with_character(mut self, name: impl Into<String>) -> Self {
        self.characters.push(name.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.special_note = Some(note.into());
        self
    }

    /// Theme tags with duplicates and blanks removed, first occurrence wins.
    pub fn unique_tags(&self) -> Vec<&str> {
        unique_non_blank(&self.theme_tags)
    }

    /// Character names with duplicates and blanks removed, first occurrence wins.
    pub fn unique_characters(&self) -> Vec<&str> {
        unique_non_blank(&self.characters)
    }
}

fn unique_non_blank(values: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .collect()
}

/// One generated caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub source: GenerationSource,
}

/// Captions keyed by the caller's language code, in request order.
///
/// A language that could not be produced is absent, never an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    entries: Vec<(String, Caption)>,
}

impl PostRecord {
    /// Build from ordered `(language, caption)` pairs.
    ///
    /// Rejects blank caption text and repeated language codes.
    pub fn from_captions<I>(captions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Caption)>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (language, caption) in captions {
            if caption.text.trim().is_empty() {
                return Err(Error::InvalidRecord(format!(
                    "caption for '{language}' is empty"
                )));
            }
            if !seen.insert(language.clone()) {
                return Err(Error::InvalidRecord(format!(
                    "language '{language}' appears twice"
                )));
            }
            entries.push((language, caption));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.caption(language).map(|c| c.text.as_str())
    }

    pub fn caption(&self, language: &str) -> Option<&Caption> {
        self.entries
            .iter()
            .find(|(lang, _)| lang == language)
            .map(|(_, caption)| caption)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(lang, _)| lang.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Caption)> {
        self.entries.iter().map(|(lang, c)| (lang.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PostRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (language, caption) in &self.entries {
            map.serialize_entry(language, &caption.text)?;
        }
        map.end()
    }
}

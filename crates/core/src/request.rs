//! Request envelope, typed payloads, and batch responses.
//!
//! The envelope is deliberately loose (`kind` string + JSON payload) so that
//! transports can forward whatever they received. Typed payloads are produced
//! only after validation; anything structurally wrong becomes
//! [`Error::InvalidRequest`] before an agent ever sees it.

use crate::error::{Error, Result};
use crate::generation::GenerationConfig;
use crate::record::{ArtworkRecord, GenerationSource, NsfwLevel, PostRecord, ThemeRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The kinds of work the orchestrator can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Theme,
    Post,
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "theme" | "themes" | "generate_theme" => Ok(Self::Theme),
            "post" | "posts" | "write_post" => Ok(Self::Post),
            other => Err(Error::UnsupportedRequestKind(other.to_string())),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Theme => f.write_str("theme"),
            Self::Post => f.write_str("post"),
        }
    }
}

/// The envelope every caller hands to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Parse the kind tag. Unknown tags fail without looking at the payload.
    pub fn kind(&self) -> Result<RequestKind> {
        self.kind.parse()
    }
}

/// Validated theme payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeRequest {
    pub season: Option<String>,
    pub focus: Option<String>,
    pub platform: String,
    /// Requested count, before clamping.
    pub count: usize,
    /// The caller's NSFW ceiling. `None` defers to the preference profile.
    pub nsfw_level: Option<NsfwLevel>,
    pub llm: GenerationConfig,
}

#[derive(Deserialize)]
struct RawThemePayload {
    #[serde(default)]
    season: Option<String>,
    #[serde(default)]
    focus: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    count: Option<Value>,
    #[serde(default)]
    nsfw_level: Option<String>,
    #[serde(default)]
    llm: Option<Value>,
}

impl ThemeRequest {
    pub fn new(platform: impl Into<String>, count: usize) -> Self {
        Self {
            season: None,
            focus: None,
            platform: platform.into(),
            count,
            nsfw_level: None,
            llm: GenerationConfig::none(),
        }
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_llm(mut self, llm: GenerationConfig) -> Self {
        self.llm = llm;
        self
    }

    pub fn from_payload(payload: &Value) -> Result<Self> {
        let raw: RawThemePayload = parse_object(payload)?;

        let platform = required_text(raw.platform, "platform")?;

        let count = match raw.count {
            None | Some(Value::Null) => {
                return Err(Error::InvalidRequest("missing required field 'count'".into()));
            }
            Some(value) => value.as_i64().ok_or_else(|| {
                Error::InvalidRequest(format!("'count' must be an integer, got {value}"))
            })?,
        };
        if count <= 0 {
            return Err(Error::InvalidRequest(format!(
                "'count' must be positive, got {count}"
            )));
        }

        let nsfw_level = raw
            .nsfw_level
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<NsfwLevel>())
            .transpose()?;

        Ok(Self {
            season: optional_text(raw.season),
            focus: optional_text(raw.focus),
            platform,
            count: usize::try_from(count).unwrap_or(usize::MAX),
            nsfw_level,
            llm: parse_llm(raw.llm)?,
        })
    }
}

/// Caller-chosen caption style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// Validated post payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    pub platform: String,
    /// Caller's language codes, in output order.
    pub languages: Vec<String>,
    pub artwork: ArtworkRecord,
    pub style: CaptionStyle,
    pub llm: GenerationConfig,
}

#[derive(Deserialize)]
struct RawPostPayload {
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    languages: Option<Vec<String>>,
    #[serde(default)]
    artwork_meta: Option<Value>,
    #[serde(default)]
    style: Option<CaptionStyle>,
    #[serde(default)]
    llm: Option<Value>,
}

impl PostRequest {
    pub fn new<I, S>(platform: impl Into<String>, languages: I, artwork: ArtworkRecord) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platform: platform.into(),
            languages: languages.into_iter().map(Into::into).collect(),
            artwork,
            style: CaptionStyle::default(),
            llm: GenerationConfig::none(),
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.style.tone = Some(tone.into());
        self
    }

    pub fn with_llm(mut self, llm: GenerationConfig) -> Self {
        self.llm = llm;
        self
    }

    pub fn from_payload(payload: &Value) -> Result<Self> {
        let raw: RawPostPayload = parse_object(payload)?;

        let platform = required_text(raw.platform, "platform")?;

        let languages = raw
            .languages
            .ok_or_else(|| Error::InvalidRequest("missing required field 'languages'".into()))?;
        if languages.is_empty() {
            return Err(Error::InvalidRequest("'languages' must not be empty".into()));
        }
        if languages.iter().any(|l| l.trim().is_empty()) {
            return Err(Error::InvalidRequest(
                "'languages' must not contain blank entries".into(),
            ));
        }

        let artwork_value = raw
            .artwork_meta
            .ok_or_else(|| Error::InvalidRequest("missing required field 'artwork_meta'".into()))?;
        let artwork: ArtworkRecord = serde_json::from_value(artwork_value)
            .map_err(|e| Error::InvalidRequest(format!("invalid 'artwork_meta': {e}")))?;
        if artwork.title.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "'artwork_meta.title' must not be empty".into(),
            ));
        }

        Ok(Self {
            platform,
            languages: languages.into_iter().map(|l| l.trim().to_string()).collect(),
            artwork,
            style: raw.style.unwrap_or_default(),
            llm: parse_llm(raw.llm)?,
        })
    }
}

fn parse_object<T: for<'de> Deserialize<'de>>(payload: &Value) -> Result<T> {
    if !payload.is_object() {
        return Err(Error::InvalidRequest("payload must be a JSON object".into()));
    }
    serde_json::from_value(payload.clone())
        .map_err(|e| Error::InvalidRequest(format!("malformed payload: {e}")))
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    optional_text(value)
        .ok_or_else(|| Error::InvalidRequest(format!("missing required field '{field}'")))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_llm(value: Option<Value>) -> Result<GenerationConfig> {
    match value {
        None | Some(Value::Null) => Ok(GenerationConfig::none()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| Error::InvalidRequest(format!("invalid 'llm' config: {e}"))),
    }
}

/// What kind of item-level degradation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// No caption template for a language; the language was skipped.
    TemplateMiss,
    /// The model failed and the rule-based path produced the item.
    ModelFallback,
    /// A duplicate tag set survived the bounded dedup retry.
    DuplicateAccepted,
}

/// A warning-level note attached to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationNote {
    /// The affected item: a language code or `theme[i]`.
    pub item: String,
    pub kind: NoteKind,
    pub message: String,
}

impl GenerationNote {
    pub fn new(item: impl Into<String>, kind: NoteKind, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeBatch {
    pub themes: Vec<ThemeRecord>,
    pub requested: usize,
    pub produced: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<GenerationNote>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostBatch {
    pub platform: String,
    pub posts: PostRecord,
    /// Generation source per produced language.
    pub sources: BTreeMap<String, GenerationSource>,
    pub requested: usize,
    pub produced: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<GenerationNote>,
}

/// What the orchestrator hands back.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Themes(ThemeBatch),
    Posts(PostBatch),
}

impl Response {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Themes(_) => RequestKind::Theme,
            Self::Posts(_) => RequestKind::Post,
        }
    }

    pub fn themes(&self) -> Option<&ThemeBatch> {
        match self {
            Self::Themes(batch) => Some(batch),
            Self::Posts(_) => None,
        }
    }

    pub fn posts(&self) -> Option<&PostBatch> {
        match self {
            Self::Posts(batch) => Some(batch),
            Self::Themes(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ProviderKind;
    use serde_json::json;

    #[test]
    fn kind_aliases() {
        assert_eq!("generate_theme".parse::<RequestKind>().unwrap(), RequestKind::Theme);
        assert_eq!("POST".parse::<RequestKind>().unwrap(), RequestKind::Post);
        assert!(matches!(
            "unknown".parse::<RequestKind>(),
            Err(Error::UnsupportedRequestKind(_))
        ));
    }

    #[test]
    fn theme_payload_parses() {
        let req = ThemeRequest::from_payload(&json!({
            "season": "summer",
            "focus": "beach",
            "platform": "x",
            "count": 3,
            "nsfw_level": "sfw",
            "llm": {"provider": "none"}
        }))
        .unwrap();
        assert_eq!(req.platform, "x");
        assert_eq!(req.count, 3);
        assert_eq!(req.season.as_deref(), Some("summer"));
        assert_eq!(req.nsfw_level, Some(NsfwLevel::None));
        assert_eq!(req.llm.provider, ProviderKind::None);
    }

    #[test]
    fn theme_payload_rejects_bad_count() {
        for count in [json!(0), json!(-2), json!("three"), json!(null)] {
            let result = ThemeRequest::from_payload(&json!({"platform": "x", "count": count}));
            assert!(matches!(result, Err(Error::InvalidRequest(_))), "count {count}");
        }
        let result = ThemeRequest::from_payload(&json!({"platform": "x"}));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn theme_payload_requires_platform() {
        let result = ThemeRequest::from_payload(&json!({"platform": "  ", "count": 1}));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn unknown_provider_is_invalid_request() {
        let result = ThemeRequest::from_payload(&json!({
            "platform": "x", "count": 1, "llm": {"provider": "telepathy"}
        }));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn post_payload_parses() {
        let req = PostRequest::from_payload(&json!({
            "platform": "x",
            "languages": ["en", "jp"],
            "artwork_meta": {"title": "Sunset", "theme_tags": ["beach"]},
            "style": {"tone": "serious"}
        }))
        .unwrap();
        assert_eq!(req.languages, vec!["en", "jp"]);
        assert_eq!(req.artwork.title, "Sunset");
        assert_eq!(req.style.tone.as_deref(), Some("serious"));
        assert!(!req.llm.is_live());
    }

    #[test]
    fn post_payload_rejects_empty_languages() {
        let result = PostRequest::from_payload(&json!({
            "platform": "x", "languages": [], "artwork_meta": {"title": "t"}
        }));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));

        let result = PostRequest::from_payload(&json!({
            "platform": "x", "languages": ["en", " "], "artwork_meta": {"title": "t"}
        }));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn post_payload_requires_artwork_title() {
        let result = PostRequest::from_payload(&json!({
            "platform": "x", "languages": ["en"], "artwork_meta": {"mood": "calm"}
        }));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn non_object_payload_is_invalid() {
        assert!(matches!(
            ThemeRequest::from_payload(&json!([1, 2])),
            Err(Error::InvalidRequest(_))
        ));
    }
}

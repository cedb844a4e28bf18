//! PostWriterAgent: one caption per requested language.
//!
//! Languages are independent: each one resolves its own tone and template,
//! and a missing template or a failed model call only affects that language.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use themeloom_config::GenerationSettings;
use themeloom_core::{
    normalize_language, normalize_platform, ArtworkRecord, Caption, CaptionTemplates, Error,
    GenerationConfig, GenerationNote, GenerationSource, HashtagGenerator, ModelRunner,
    ModelUnavailable, NoteKind, PostBatch, PostGenerator, PostRecord, PostRequest,
    PreferenceProfile, PreferenceStore, Result,
};
use themeloom_providers::{guarded_run, RunnerRegistry};
use tracing::{debug, info, warn};

use crate::prompt::{caption_prompt, clean_caption};

#[derive(Debug, Clone)]
pub struct PostSettings {
    /// Character cap for `x` captions.
    pub x_caption_limit: usize,
    pub max_hashtags: usize,
    pub model_timeout: Duration,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            x_caption_limit: 260,
            max_hashtags: 5,
            model_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&GenerationSettings> for PostSettings {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            x_caption_limit: settings.x_caption_limit,
            model_timeout: settings.model_timeout(),
            ..Self::default()
        }
    }
}

pub struct PostWriterAgent {
    captions: Arc<dyn CaptionTemplates>,
    preferences: Arc<dyn PreferenceStore>,
    hashtags: Arc<dyn HashtagGenerator>,
    runners: Arc<RunnerRegistry>,
    settings: PostSettings,
}

/// What happened to one language.
enum Outcome {
    Written(Caption, Option<GenerationNote>),
    Skipped(GenerationNote),
}

impl PostWriterAgent {
    pub fn new(
        captions: Arc<dyn CaptionTemplates>,
        preferences: Arc<dyn PreferenceStore>,
        hashtags: Arc<dyn HashtagGenerator>,
        runners: Arc<RunnerRegistry>,
    ) -> Self {
        Self {
            captions,
            preferences,
            hashtags,
            runners,
            settings: PostSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PostSettings) -> Self {
        self.settings = settings;
        self
    }

    async fn write_language(
        &self,
        request: &PostRequest,
        profile: &PreferenceProfile,
        runner: Option<&std::result::Result<Arc<dyn ModelRunner>, ModelUnavailable>>,
        language: &str,
    ) -> Outcome {
        let tone = request
            .style
            .tone
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| profile.caption_tone(&request.platform, language))
            .to_string();

        let Some(template) = self
            .captions
            .caption_template(&request.platform, language, &tone)
        else {
            warn!(platform = %request.platform, language, tone = %tone, "No caption template, skipping language");
            return Outcome::Skipped(GenerationNote::new(
                language,
                NoteKind::TemplateMiss,
                Error::TemplateMiss {
                    platform: request.platform.clone(),
                    language: language.to_string(),
                }
                .to_string(),
            ));
        };

        let hashtags = self.hashtags.hashtags(
            &request.artwork,
            &request.platform,
            language,
            self.settings.max_hashtags,
        );
        let draft = fill_template(&template, &request.artwork, language, &tone, &hashtags);

        let (text, source, note) = match runner {
            None => (draft, GenerationSource::Rule, None),
            Some(Ok(runner)) => {
                match self
                    .rewrite(runner.as_ref(), &request.llm, &draft, &request.platform, language, &tone)
                    .await
                {
                    Ok(text) => (text, GenerationSource::Llm, None),
                    Err(e) => {
                        warn!(language, cause = %e.cause, "Caption fell back to template");
                        let note = GenerationNote::new(language, NoteKind::ModelFallback, e.to_string());
                        (draft, GenerationSource::Rule, Some(note))
                    }
                }
            }
            Some(Err(e)) => {
                let note = GenerationNote::new(language, NoteKind::ModelFallback, e.to_string());
                (draft, GenerationSource::Rule, Some(note))
            }
        };

        let text = if normalize_platform(&request.platform) == "x" {
            truncate(&text, self.settings.x_caption_limit)
        } else {
            text
        };

        debug!(language, tone = %tone, source = %source, chars = text.chars().count(), "Caption written");
        Outcome::Written(Caption { text, source }, note)
    }

    async fn rewrite(
        &self,
        runner: &dyn ModelRunner,
        config: &GenerationConfig,
        draft: &str,
        platform: &str,
        language: &str,
        tone: &str,
    ) -> std::result::Result<String, ModelUnavailable> {
        let prompt = caption_prompt(draft, platform, language, tone);
        let raw = guarded_run(runner, &prompt, config, self.settings.model_timeout).await?;
        clean_caption(&raw)
    }
}

#[async_trait]
impl PostGenerator for PostWriterAgent {
    async fn generate_posts(&self, request: &PostRequest) -> Result<PostBatch> {
        let profile = self.preferences.profile();

        let mut seen = HashSet::new();
        let languages: Vec<String> = request
            .languages
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && seen.insert(l.clone()))
            .collect();

        let runner = match self.runners.resolve(&request.llm) {
            Ok(None) => None,
            Ok(Some(runner)) => Some(Ok(runner)),
            Err(e) => {
                warn!(provider = %request.llm.provider, error = %e, "Runner unavailable, using templates");
                Some(Err(e))
            }
        };

        let outcomes = join_all(
            languages
                .iter()
                .map(|lang| self.write_language(request, &profile, runner.as_ref(), lang)),
        )
        .await;

        let mut captions = Vec::new();
        let mut sources = BTreeMap::new();
        let mut notes = Vec::new();
        for (language, outcome) in languages.iter().zip(outcomes) {
            match outcome {
                Outcome::Written(caption, note) => {
                    sources.insert(language.clone(), caption.source);
                    captions.push((language.clone(), caption));
                    notes.extend(note);
                }
                Outcome::Skipped(note) => notes.push(note),
            }
        }

        let posts = PostRecord::from_captions(captions)?;
        info!(
            platform = %request.platform,
            requested = languages.len(),
            produced = posts.len(),
            notes = notes.len(),
            "Posts generated"
        );

        Ok(PostBatch {
            platform: request.platform.clone(),
            produced: posts.len(),
            requested: languages.len(),
            posts,
            sources,
            notes,
        })
    }
}

/// Substitute artwork fields into a caption template and tidy the result.
pub fn fill_template(
    template: &str,
    artwork: &ArtworkRecord,
    language: &str,
    tone: &str,
    hashtags: &[String],
) -> String {
    let characters = character_line(&artwork.unique_characters(), language);
    let extra = artwork.special_note.as_deref().unwrap_or_default().trim();

    let filled = template
        .replace("{title}", artwork.title.trim())
        .replace("{mood}", artwork.mood.trim())
        .replace("{characters}", &characters)
        .replace("{extra}", extra)
        .replace("{hashtags}", &hashtags.join(" "))
        .replace("{tone}", tone);

    collapse_blank_lines(&filled)
}

/// One line introducing the characters, in the caption's language.
fn character_line(characters: &[&str], language: &str) -> String {
    match (normalize_language(language).as_str(), characters) {
        (_, []) => String::new(),
        ("ja", [one]) => format!("今回の主役は {one} です。"),
        ("ja", many) => format!("{} たちとの一枚です。", many.join("、")),
        ("zh", [one]) => format!("這次的主角是 {one}。"),
        ("zh", many) => format!("這次是一張和 {} 的合照。", many.join("、")),
        (_, [one]) => format!("Starring {one}."),
        (_, many) => format!("Featuring {}.", many.join(" & ")),
    }
}

/// Trim trailing space per line, fold runs of blank lines into one, trim ends.
fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

/// Cap `text` at `limit` characters, ending with `…` when cut.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{registry_with, FailingRunner, ScriptedRunner};
    use themeloom_core::ProviderKind;
    use themeloom_skills::{CaptionLibrary, DefaultHashtagGenerator, StaticPreferenceStore};

    fn agent_with(runners: Arc<RunnerRegistry>) -> PostWriterAgent {
        PostWriterAgent::new(
            Arc::new(CaptionLibrary::default()),
            Arc::new(StaticPreferenceStore::default()),
            Arc::new(DefaultHashtagGenerator),
            runners,
        )
    }

    fn agent() -> PostWriterAgent {
        agent_with(Arc::new(RunnerRegistry::new()))
    }

    fn artwork() -> ArtworkRecord {
        ArtworkRecord::new("Summer Breeze")
            .with_mood("A quiet afternoon by the sea.")
            .with_tag("beach")
            .with_tag("frilled_bikini")
            .with_character("Mika")
    }

    #[tokio::test]
    async fn skips_languages_without_templates() {
        let request = PostRequest::new("x", ["en", "jp", "xx"], artwork());
        let batch = agent().generate_posts(&request).await.unwrap();

        let keys: Vec<_> = batch.posts.languages().collect();
        assert_eq!(keys, vec!["en", "jp"]);
        assert_eq!(batch.requested, 3);
        assert_eq!(batch.produced, 2);
        assert_eq!(batch.notes.len(), 1);
        assert_eq!(batch.notes[0].item, "xx");
        assert_eq!(batch.notes[0].kind, NoteKind::TemplateMiss);
        assert_eq!(
            batch.notes[0].message,
            Error::TemplateMiss {
                platform: "x".into(),
                language: "xx".into(),
            }
            .to_string()
        );
        assert!(batch.posts.get("xx").is_none());
    }

    #[tokio::test]
    async fn fills_japanese_template() {
        let request = PostRequest::new("twitter", ["ja"], artwork());
        let batch = agent().generate_posts(&request).await.unwrap();
        let text = batch.posts.get("ja").unwrap();

        assert_eq!(
            text,
            "Summer Breeze を描きました🎨✨\n\
             今回の主役は Mika です。\n\
             A quiet afternoon by the sea.\n\
             \n\
             #AIイラスト #AIart #beach #frilled_bikini"
        );
        assert_eq!(batch.sources["ja"], GenerationSource::Rule);
    }

    #[tokio::test]
    async fn style_tone_overrides_preference() {
        let request = PostRequest::new("x", ["zh"], artwork()).with_tone("serious");
        let batch = agent().generate_posts(&request).await.unwrap();
        assert!(batch.posts.get("zh").unwrap().starts_with("這次的作品是《Summer Breeze》。"));
    }

    #[tokio::test]
    async fn preference_tone_used_per_platform() {
        let request = PostRequest::new("patreon", ["ja"], artwork());
        let batch = agent().generate_posts(&request).await.unwrap();
        assert!(batch
            .posts
            .get("ja")
            .unwrap()
            .starts_with("「Summer Breeze」が完成しました"));
    }

    #[tokio::test]
    async fn output_follows_request_order_and_dedups() {
        let request = PostRequest::new("x", ["zh", "ja", "zh", "en"], artwork());
        let batch = agent().generate_posts(&request).await.unwrap();
        let keys: Vec<_> = batch.posts.languages().collect();
        assert_eq!(keys, vec!["zh", "ja", "en"]);
        assert_eq!(batch.requested, 3);
    }

    #[tokio::test]
    async fn x_captions_are_truncated() {
        let long = ArtworkRecord::new("T").with_note("あ".repeat(400));
        let request = PostRequest::new("x", ["ja"], long.clone());
        let batch = agent().generate_posts(&request).await.unwrap();
        let text = batch.posts.get("ja").unwrap();
        assert_eq!(text.chars().count(), 258);
        assert!(text.ends_with('…'));

        let pixiv = PostRequest::new("pixiv", ["ja"], long);
        let batch = agent().generate_posts(&pixiv).await.unwrap();
        assert!(batch.posts.get("ja").unwrap().chars().count() > 400);
    }

    #[tokio::test]
    async fn llm_rewrites_caption() {
        let runner = Arc::new(ScriptedRunner::always(
            ProviderKind::Api,
            "```\nA breezy summer piece starring Mika! #AIart\n```",
        ));
        let agent = agent_with(registry_with(runner.clone()));
        let request = PostRequest::new("x", ["en", "ja"], artwork())
            .with_llm(GenerationConfig::with_provider(ProviderKind::Api));

        let batch = agent.generate_posts(&request).await.unwrap();

        assert_eq!(runner.call_count(), 2);
        assert_eq!(
            batch.posts.get("en").unwrap(),
            "A breezy summer piece starring Mika! #AIart"
        );
        assert_eq!(batch.sources["en"], GenerationSource::Llm);
        assert!(runner.prompts()[0].contains("Summer Breeze"));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_template() {
        let runner = Arc::new(FailingRunner::new(
            ProviderKind::Api,
            ModelUnavailable::auth("401 Unauthorized"),
        ));
        let agent = agent_with(registry_with(runner.clone()));
        let request = PostRequest::new("x", ["en", "zh"], artwork())
            .with_llm(GenerationConfig::with_provider(ProviderKind::Api));

        let batch = agent.generate_posts(&request).await.unwrap();

        assert_eq!(runner.call_count(), 2);
        assert_eq!(batch.posts.len(), 2);
        assert!(batch
            .posts
            .get("en")
            .unwrap()
            .starts_with("Finished a new piece: “Summer Breeze”"));
        assert!(batch.sources.values().all(|s| *s == GenerationSource::Rule));
        assert!(batch.notes.iter().all(|n| n.kind == NoteKind::ModelFallback));
        assert_eq!(batch.notes.len(), 2);
    }

    #[test]
    fn character_lines_per_language() {
        assert_eq!(character_line(&["Mika", "Rin"], "jp"), "Mika、Rin たちとの一枚です。");
        assert_eq!(character_line(&["Mika"], "zh-TW"), "這次的主角是 Mika。");
        assert_eq!(character_line(&["Mika", "Rin"], "en"), "Featuring Mika & Rin.");
        assert_eq!(character_line(&[], "en"), "");
    }

    #[test]
    fn empty_placeholders_leave_no_gaps() {
        let filled = fill_template(
            "{title}!\n{characters}\n{mood}\n{extra}\n\n{hashtags}",
            &ArtworkRecord::new("Solo"),
            "en",
            "cute",
            &[],
        );
        assert_eq!(filled, "Solo!");
    }

    #[test]
    fn truncation_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde…");
    }
}

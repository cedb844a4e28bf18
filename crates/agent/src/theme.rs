//! ThemeAgent: illustration themes from templates, trends and preferences.
//!
//! Every theme starts from the same request plan: the focus tag, the
//! template's artistic tags, and a filtered variety pool (template tags,
//! season preset, platform tags, trends). The rule path picks a favorite and
//! a rotating window of non-favorite tags per item; the model path asks the
//! runner for one theme per item and degrades to the rule path for that item
//! alone when the runner fails or answers garbage.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use themeloom_config::GenerationSettings;
use themeloom_core::{
    normalize_tag, Error, GenerationConfig, GenerationNote, GenerationSource,
    ModelRunner, ModelUnavailable, NoteKind, NsfwLevel, PreferenceProfile, PreferenceStore,
    PromptTemplates, Result, TagCategory, ThemeBatch, ThemeGenerator, ThemeRecord, ThemeRequest,
    TrendSource,
};
use themeloom_providers::{guarded_run, RunnerRegistry};
use themeloom_skills::{is_banned_keyword, tag_nsfw_level, TagClassifier};
use tracing::{debug, info, warn};

use crate::prompt::{parse_theme, theme_prompt, ThemePromptContext};

/// Non-favorite tags drawn per theme.
const VARIETY_WINDOW: usize = 4;

/// Tag used when filtering leaves a theme with nothing at all.
const FALLBACK_TAG: &str = "illustration";

/// Title used when neither season nor motif has a readable name.
const UNTITLED: &str = "Untitled Theme";

/// `fallback` metadata for a model theme replaced because it repeated an
/// earlier tag set.
const DUPLICATE_FALLBACK: &str = "duplicate";

/// Knobs for theme generation.
#[derive(Debug, Clone)]
pub struct ThemeSettings {
    pub max_count: usize,
    pub dedup_retries: u32,
    pub model_timeout: Duration,
    pub trend_limit: usize,
    pub trend_category: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            max_count: 10,
            dedup_retries: 1,
            model_timeout: Duration::from_secs(30),
            trend_limit: 30,
            trend_category: "anime".into(),
        }
    }
}

impl From<&GenerationSettings> for ThemeSettings {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            max_count: settings.max_theme_count.max(1),
            dedup_retries: settings.dedup_retries,
            model_timeout: settings.model_timeout(),
            trend_limit: settings.trend_limit,
            trend_category: settings.trend_category.clone(),
        }
    }
}

pub struct ThemeAgent {
    templates: Arc<dyn PromptTemplates>,
    preferences: Arc<dyn PreferenceStore>,
    trends: Arc<dyn TrendSource>,
    runners: Arc<RunnerRegistry>,
    classifier: TagClassifier,
    settings: ThemeSettings,
}

/// Everything resolved once per request.
#[derive(Debug)]
struct ThemePlan {
    season: String,
    platform: String,
    focus: String,
    template: String,
    tone: String,
    count: usize,
    ceiling: NsfwLevel,
    ng_tags: Vec<String>,
    focus_tag: Option<String>,
    artistic: Vec<String>,
    season_setting: Vec<String>,
    favorites: Vec<String>,
    others: Vec<String>,
}

impl ThemePlan {
    fn allows(&self, tag: &str) -> bool {
        !tag.is_empty()
            && !self.ng_tags.iter().any(|ng| ng == tag)
            && !is_banned_keyword(tag)
            && tag_nsfw_level(tag) <= self.ceiling
    }

    /// Core tags every theme carries.
    fn core(&self) -> impl Iterator<Item = &String> {
        self.focus_tag.iter().chain(self.artistic.iter())
    }

    fn favorite(&self, index: usize, attempt: usize) -> Option<&str> {
        if self.favorites.is_empty() {
            return None;
        }
        Some(self.favorites[(index + attempt) % self.favorites.len()].as_str())
    }

    /// A rotating window over the non-favorite pool. Windows are shorter than
    /// the pool, so distinct start offsets give distinct tag sets.
    fn variety(&self, index: usize, attempt: usize) -> Vec<String> {
        let n = self.others.len();
        if n == 0 {
            return Vec::new();
        }
        let window = if n > 1 { VARIETY_WINDOW.min(n - 1) } else { 1 };
        let stride = (n / self.count).max(1);
        let start = (index * stride + attempt) % n;
        (0..window)
            .map(|j| self.others[(start + j) % n].clone())
            .collect()
    }

    fn metadata(&self, index: usize, source: GenerationSource) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("season".into(), self.season.clone());
        metadata.insert("platform".into(), self.platform.clone());
        metadata.insert("focus".into(), self.focus.clone());
        metadata.insert("template".into(), self.template.clone());
        metadata.insert("source".into(), source.as_str().into());
        metadata.insert("index".into(), index.to_string());
        metadata
    }
}

impl ThemeAgent {
    pub fn new(
        templates: Arc<dyn PromptTemplates>,
        preferences: Arc<dyn PreferenceStore>,
        trends: Arc<dyn TrendSource>,
        runners: Arc<RunnerRegistry>,
    ) -> Self {
        Self {
            templates,
            preferences,
            trends,
            runners,
            classifier: TagClassifier::default(),
            settings: ThemeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ThemeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_classifier(mut self, classifier: TagClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    fn plan(&self, request: &ThemeRequest, profile: &PreferenceProfile, count: usize) -> ThemePlan {
        let season = request
            .season
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "any".into());
        let focus = request
            .focus
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(&profile.default_style)
            .to_string();
        let focus_norm = normalize_tag(&focus);

        let template_name = profile
            .template_for_focus(&focus_norm)
            .unwrap_or("default")
            .to_string();
        let template = self.templates.template(&template_name);
        let preset = self.templates.season_preset(&season);

        // Caller ceiling can only tighten the profile's.
        let ceiling = request
            .nsfw_level
            .map_or(profile.allowed_nsfw_level, |level| {
                level.min(profile.allowed_nsfw_level)
            });

        let mut plan = ThemePlan {
            season: season.clone(),
            platform: request.platform.trim().to_string(),
            focus,
            template: template.name.clone(),
            tone: profile.default_tone.clone(),
            count,
            ceiling,
            ng_tags: profile.ng_tags.iter().map(|t| normalize_tag(t)).collect(),
            focus_tag: None,
            artistic: Vec::new(),
            season_setting: Vec::new(),
            favorites: Vec::new(),
            others: Vec::new(),
        };

        plan.focus_tag = Some(focus_norm).filter(|t| plan.allows(t));
        plan.artistic = unique(
            template
                .category(TagCategory::Artistic)
                .iter()
                .map(|t| normalize_tag(t))
                .filter(|t| plan.allows(t)),
        );
        if season != "any" {
            plan.season_setting = unique(
                preset
                    .setting
                    .iter()
                    .map(|t| normalize_tag(t))
                    .filter(|t| plan.allows(t)),
            );
        }

        let trend_season = (season != "any").then_some(season.as_str());
        let trends = self.trends.trending_tags(
            &self.settings.trend_category,
            trend_season,
            self.settings.trend_limit,
        );

        let template_tags = template
            .tags
            .iter()
            .filter(|(category, _)| **category != TagCategory::Artistic)
            .flat_map(|(_, tags)| tags.iter().cloned());
        let core: HashSet<String> = plan.core().cloned().collect();

        let pool = unique(
            template_tags
                .chain(preset.setting.iter().cloned())
                .chain(preset.mood.iter().cloned())
                .chain(self.templates.platform_tags(&plan.platform))
                .chain(trends)
                .map(|t| normalize_tag(&t))
                .filter(|t| !core.contains(t) && plan.allows(t)),
        );
        let (favorites, others): (Vec<String>, Vec<String>) =
            pool.into_iter().partition(|t| profile.is_favorite(t));
        plan.favorites = favorites;
        plan.others = others;

        debug!(
            season = %plan.season,
            focus = %plan.focus,
            template = %plan.template,
            ceiling = %plan.ceiling,
            favorites = plan.favorites.len(),
            others = plan.others.len(),
            "Theme plan resolved"
        );
        plan
    }

    fn finish_tags(&self, mut tags: Vec<String>) -> (Vec<String>, NsfwLevel) {
        if tags.is_empty() {
            tags.push(FALLBACK_TAG.into());
        }
        self.classifier.sort(&mut tags);
        let level = tags
            .iter()
            .map(|t| tag_nsfw_level(t))
            .max()
            .unwrap_or_default();
        (tags, level)
    }

    /// The deterministic path.
    fn rule_theme(
        &self,
        plan: &ThemePlan,
        index: usize,
        attempt: usize,
        fallback: Option<&str>,
    ) -> Result<ThemeRecord> {
        let favorite = plan.favorite(index, attempt);
        let variety = plan.variety(index, attempt);

        let tags: Vec<String> = plan
            .focus_tag
            .iter()
            .cloned()
            .chain(favorite.map(str::to_string))
            .chain(variety)
            .chain(plan.artistic.iter().cloned())
            .collect();
        let (tags, level) = self.finish_tags(tags);

        let motif = favorite
            .or(plan.focus_tag.as_deref())
            .unwrap_or(FALLBACK_TAG);
        let title = self.compose_title(plan, motif, &tags);
        let concept = self.compose_concept(motif, &tags);

        let mut metadata = plan.metadata(index, GenerationSource::Rule);
        if let Some(reason) = fallback {
            metadata.insert("fallback".into(), reason.into());
        }

        // Rule output is always well-formed.
        ThemeRecord::new(title, concept, tags, level, metadata)
            .map_err(|e| Error::Internal(format!("rule theme {index} rejected: {e}")))
    }

    /// `"{Season} {Motif} at {Setting}"`, skipping missing parts. Never empty.
    fn compose_title(&self, plan: &ThemePlan, motif: &str, tags: &[String]) -> String {
        let mut parts: Vec<String> = Vec::new();
        if plan.season != "any" {
            parts.push(humanize(&plan.season));
        }
        parts.push(humanize(motif));
        parts.retain(|p| !p.is_empty());
        if parts.is_empty() {
            parts.push(UNTITLED.into());
        }
        if let Some(setting) = self.first_in(tags, TagCategory::Setting, motif) {
            parts.push(format!("at {}", humanize(setting)));
        }
        parts.join(" ")
    }

    fn compose_concept(&self, motif: &str, tags: &[String]) -> String {
        let moods: Vec<String> = tags
            .iter()
            .filter(|t| self.classifier.category(t) == TagCategory::Mood)
            .take(2)
            .map(|t| t.replace('_', " "))
            .collect();
        let details: Vec<String> = tags
            .iter()
            .filter(|t| *t != motif)
            .filter(|t| {
                matches!(
                    self.classifier.category(t),
                    TagCategory::Clothing
                        | TagCategory::Expression
                        | TagCategory::Action
                        | TagCategory::Object
                )
            })
            .take(3)
            .map(|t| t.replace('_', " "))
            .collect();

        let subject = match motif.replace('_', " ").trim() {
            "" => "original".to_string(),
            s => s.to_string(),
        };
        let mut concept = if moods.is_empty() {
            format!("A {subject} illustration")
        } else {
            format!("A {} {subject} illustration", moods.join(", "))
        };
        if let Some(setting) = self.first_in(tags, TagCategory::Setting, motif) {
            concept.push_str(&format!(" set at {}", setting.replace('_', " ")));
        }
        if !details.is_empty() {
            concept.push_str(&format!(", with {}", details.join(", ")));
        }
        concept.push('.');
        concept
    }

    fn first_in<'a>(&self, tags: &'a [String], category: TagCategory, skip: &str) -> Option<&'a str> {
        tags.iter()
            .find(|t| *t != skip && self.classifier.category(t) == category)
            .map(String::as_str)
    }

    /// The model path for one item.
    async fn llm_theme(
        &self,
        plan: &ThemePlan,
        runner: &dyn ModelRunner,
        config: &GenerationConfig,
        index: usize,
    ) -> std::result::Result<ThemeRecord, ModelUnavailable> {
        let hints = self.rule_hints(plan, index);
        let prompt = theme_prompt(&ThemePromptContext {
            season: &plan.season,
            focus: &plan.focus,
            platform: &plan.platform,
            tone: &plan.tone,
            index,
            count: plan.count,
            hint_tags: &hints,
            avoid_tags: &plan.ng_tags,
        });

        let raw = guarded_run(runner, &prompt, config, self.settings.model_timeout).await?;
        let parsed = parse_theme(&raw)?;

        let generated = unique(
            parsed
                .keywords
                .iter()
                .chain(parsed.mood.iter())
                .map(|t| normalize_tag(t))
                .filter(|t| plan.allows(t)),
        );
        if generated.is_empty() {
            return Err(ModelUnavailable::malformed(
                "model theme has no usable keywords",
            ));
        }

        let tags: Vec<String> = plan
            .focus_tag
            .iter()
            .cloned()
            .chain(generated)
            .chain(plan.season_setting.iter().cloned())
            .chain(plan.artistic.iter().cloned())
            .collect();
        let (tags, level) = self.finish_tags(tags);

        let mut metadata = plan.metadata(index, GenerationSource::Llm);
        metadata.insert(
            "model".into(),
            config
                .model
                .clone()
                .unwrap_or_else(|| runner.name().to_string()),
        );

        ThemeRecord::new(parsed.title, parsed.short_concept, tags, level, metadata)
            .map_err(|e| ModelUnavailable::malformed(e.to_string()))
    }

    fn rule_hints(&self, plan: &ThemePlan, index: usize) -> Vec<String> {
        plan.favorite(index, 0)
            .map(str::to_string)
            .into_iter()
            .chain(plan.variety(index, 0))
            .collect()
    }
}

#[async_trait]
impl ThemeGenerator for ThemeAgent {
    async fn generate_themes(&self, request: &ThemeRequest) -> Result<ThemeBatch> {
        let count = request.count.clamp(1, self.settings.max_count.max(1));
        if count != request.count {
            info!(requested = request.count, count, "Theme count clamped");
        }

        let profile = self.preferences.profile();
        let plan = self.plan(request, &profile, count);
        let mut notes = Vec::new();

        let runner = match self.runners.resolve(&request.llm) {
            Ok(runner) => runner.map(Ok),
            Err(e) => {
                warn!(provider = %request.llm.provider, error = %e, "Runner unavailable, using rules");
                Some(Err(e))
            }
        };

        // Fallback cause per candidate; dedup regeneration carries it over.
        let candidates: Vec<(ThemeRecord, Option<&str>)> = match runner {
            None => (0..count)
                .map(|i| self.rule_theme(&plan, i, 0, None).map(|theme| (theme, None)))
                .collect::<Result<_>>()?,
            Some(Err(e)) => {
                let mut themes = Vec::with_capacity(count);
                for i in 0..count {
                    notes.push(GenerationNote::new(
                        format!("theme[{i}]"),
                        NoteKind::ModelFallback,
                        e.to_string(),
                    ));
                    let cause = e.cause.as_str();
                    themes.push((self.rule_theme(&plan, i, 0, Some(cause))?, Some(cause)));
                }
                themes
            }
            Some(Ok(runner)) => {
                let results = join_all(
                    (0..count).map(|i| self.llm_theme(&plan, runner.as_ref(), &request.llm, i)),
                )
                .await;

                let mut themes = Vec::with_capacity(count);
                for (i, result) in results.into_iter().enumerate() {
                    match result {
                        Ok(theme) => themes.push((theme, None)),
                        Err(e) => {
                            warn!(index = i, cause = %e.cause, "Theme fell back to rules");
                            notes.push(GenerationNote::new(
                                format!("theme[{i}]"),
                                NoteKind::ModelFallback,
                                e.to_string(),
                            ));
                            let cause = e.cause.as_str();
                            themes.push((self.rule_theme(&plan, i, 0, Some(cause))?, Some(cause)));
                        }
                    }
                }
                themes
            }
        };

        let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
        let mut themes = Vec::with_capacity(count);
        for (i, (mut theme, mut fallback)) in candidates.into_iter().enumerate() {
            let mut attempt = 0;
            while seen.contains(&tag_key(&theme)) && attempt < self.settings.dedup_retries as usize {
                attempt += 1;
                debug!(index = i, attempt, "Duplicate tag set, regenerating");
                if theme.source() == Some(GenerationSource::Llm) {
                    fallback = Some(DUPLICATE_FALLBACK);
                    notes.push(GenerationNote::new(
                        format!("theme[{i}]"),
                        NoteKind::ModelFallback,
                        "model theme repeated an earlier tag set; regenerated from rules",
                    ));
                }
                theme = self.rule_theme(&plan, i, attempt, fallback)?;
            }
            let key = tag_key(&theme);
            if seen.contains(&key) {
                warn!(index = i, "Duplicate tag set accepted after retries");
                notes.push(GenerationNote::new(
                    format!("theme[{i}]"),
                    NoteKind::DuplicateAccepted,
                    format!("tag set repeats an earlier theme after {attempt} retries"),
                ));
            }
            seen.insert(key);
            themes.push(theme);
        }

        info!(
            requested = request.count,
            produced = themes.len(),
            notes = notes.len(),
            "Themes generated"
        );

        Ok(ThemeBatch {
            produced: themes.len(),
            requested: request.count,
            themes,
            notes,
        })
    }
}

fn tag_key(theme: &ThemeRecord) -> BTreeSet<String> {
    theme.tag_set().into_iter().map(str::to_string).collect()
}

fn unique(tags: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.filter(|t| seen.insert(t.clone())).collect()
}

/// `frilled_bikini` → `Frilled Bikini`.
fn humanize(tag: &str) -> String {
    tag.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//! `themeloom post`: write captions for a finished artwork.

use clap::Args;
use serde_json::{json, Value};
use std::path::PathBuf;
use themeloom_agent::build_orchestrator;
use themeloom_config::AppConfig;
use themeloom_core::{ArtworkRecord, GenerationConfig, Request};

use super::LlmArgs;

#[derive(Args, Debug, Clone, Default)]
pub struct PostArgs {
    /// Target platform (x, pixiv, patreon, ...)
    #[arg(short, long)]
    pub platform: String,

    /// Caption language, repeatable (en, ja, zh, ...)
    #[arg(short, long = "lang", required = true)]
    pub languages: Vec<String>,

    /// Artwork title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Mood line
    #[arg(short, long)]
    pub mood: Option<String>,

    /// Theme tag, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Character name, repeatable
    #[arg(long = "character")]
    pub characters: Vec<String>,

    /// Extra line appended to the caption
    #[arg(long)]
    pub note: Option<String>,

    /// Caption tone, e.g. cute, serious or patreon_support
    #[arg(long)]
    pub tone: Option<String>,

    /// Read artwork metadata from a JSON file; flags are layered on top
    #[arg(long)]
    pub artwork: Option<PathBuf>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

impl PostArgs {
    /// Merge the artwork file (if any) with the flags.
    pub fn artwork_record(&self) -> Result<ArtworkRecord, Box<dyn std::error::Error>> {
        let mut artwork = match &self.artwork {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
                serde_json::from_str::<ArtworkRecord>(&content)
                    .map_err(|e| format!("Invalid artwork file {}: {e}", path.display()))?
            }
            None => ArtworkRecord::default(),
        };

        if let Some(title) = &self.title {
            artwork.title = title.clone();
        }
        if let Some(mood) = &self.mood {
            artwork.mood = mood.clone();
        }
        if let Some(note) = &self.note {
            artwork.special_note = Some(note.clone());
        }
        artwork.theme_tags.extend(self.tags.iter().cloned());
        artwork.characters.extend(self.characters.iter().cloned());

        if artwork.title.trim().is_empty() {
            return Err("An artwork title is required (--title or --artwork)".into());
        }
        Ok(artwork)
    }

    pub fn payload(
        &self,
        artwork: &ArtworkRecord,
        llm: &GenerationConfig,
    ) -> serde_json::Result<Value> {
        let mut payload = json!({
            "platform": self.platform,
            "languages": self.languages,
            "artwork_meta": serde_json::to_value(artwork)?,
            "llm": serde_json::to_value(llm)?,
        });
        if let Some(tone) = &self.tone {
            payload["style"] = json!({ "tone": tone });
        }
        Ok(payload)
    }
}

pub async fn run(args: PostArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let llm = args.llm.generation(&config)?;
    let artwork = args.artwork_record()?;
    let orchestrator = build_orchestrator(&config);

    let response = orchestrator
        .handle(&Request::new("post", args.payload(&artwork, &llm)?))
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(batch) = response.posts() {
        for note in &batch.notes {
            eprintln!("  ⚠️  {}: {}", note.item, note.message);
        }
    }

    Ok(())
}

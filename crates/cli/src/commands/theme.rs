//! `themeloom theme`: generate illustration themes.

use chrono::{DateTime, Local};
use clap::Args;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use themeloom_agent::build_orchestrator;
use themeloom_config::AppConfig;
use themeloom_core::{GenerationConfig, Request, ThemeBatch};
use themeloom_skills::TagClassifier;
use tracing::info;

use super::LlmArgs;

#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    /// Target platform (x, pixiv, patreon, ...)
    #[arg(short, long)]
    pub platform: String,

    /// Number of themes to generate
    #[arg(short, long, default_value_t = 3)]
    pub count: usize,

    /// Season: spring, summer, autumn, winter or any
    #[arg(short, long)]
    pub season: Option<String>,

    /// Focus keyword, e.g. bikini or idol
    #[arg(short, long)]
    pub focus: Option<String>,

    /// Content ceiling: none, suggestive or explicit
    #[arg(long)]
    pub nsfw_level: Option<String>,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Also write a plain-text report into this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ThemeArgs {
    /// The request payload the orchestrator expects.
    pub fn payload(&self, llm: &GenerationConfig) -> serde_json::Result<Value> {
        let mut payload = json!({
            "platform": self.platform,
            "count": self.count,
            "llm": serde_json::to_value(llm)?,
        });
        for (key, value) in [
            ("season", &self.season),
            ("focus", &self.focus),
            ("nsfw_level", &self.nsfw_level),
        ] {
            if let Some(value) = value {
                payload[key] = json!(value);
            }
        }
        Ok(payload)
    }
}

pub async fn run(args: ThemeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let llm = args.llm.generation(&config)?;
    let orchestrator = build_orchestrator(&config);

    let response = orchestrator
        .handle(&Request::new("theme", args.payload(&llm)?))
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let (Some(dir), Some(batch)) = (&args.output, response.themes()) {
        let path = write_report(dir, batch, &TagClassifier::default(), Local::now())?;
        info!(path = %path.display(), themes = batch.produced, "Report written");
    }

    Ok(())
}

/// Write `themes_YYYYmmdd_HHMMSS.txt` into `dir`, creating it if needed.
pub fn write_report(
    dir: &Path,
    batch: &ThemeBatch,
    classifier: &TagClassifier,
    now: DateTime<Local>,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("themes_{}.txt", now.format("%Y%m%d_%H%M%S")));
    std::fs::write(&path, render_report(batch, classifier, now))?;
    Ok(path)
}

/// Plain-text listing of a batch: one block per theme, tags grouped by
/// category, then a line ready to paste into an image generator.
pub fn render_report(batch: &ThemeBatch, classifier: &TagClassifier, now: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Themeloom themes, {}\n",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!(
        "Produced {} of {} requested\n",
        batch.produced, batch.requested
    ));

    for (i, theme) in batch.themes.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n", i + 1, theme.title()));
        if !theme.short_concept().is_empty() {
            out.push_str(&format!("   {}\n", theme.short_concept()));
        }
        let source = theme.source().map(|s| s.as_str()).unwrap_or("unknown");
        out.push_str(&format!(
            "   nsfw: {} | source: {}\n",
            theme.nsfw_level(),
            source
        ));
        for (category, tags) in classifier.group(theme.prompt_tags()) {
            out.push_str(&format!("   {category}: {}\n", tags.join(", ")));
        }
        out.push_str(&format!("   copy: {}\n", theme.prompt_tags().join(", ")));
    }

    if !batch.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &batch.notes {
            out.push_str(&format!("   [{}] {}\n", note.item, note.message));
        }
    }
    out
}

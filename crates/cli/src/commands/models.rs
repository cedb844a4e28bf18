//! `themeloom models`: list local GGUF models.

use std::path::PathBuf;
use themeloom_config::AppConfig;
use themeloom_providers::{discover_models, LocalModel};

pub async fn run(dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let dir = dir.unwrap_or(config.models_dir);
    let models = discover_models(&dir);

    println!("📦 Local models in {}", dir.display());
    println!();
    print!("{}", render(&models));
    if models.is_empty() {
        println!();
        println!("  Put .gguf files there, or point --dir at another directory.");
    }
    Ok(())
}

fn render(models: &[LocalModel]) -> String {
    if models.is_empty() {
        return "  (none found)\n".to_string();
    }
    let width = models.iter().map(|m| m.id.len()).max().unwrap_or(0);
    models
        .iter()
        .map(|m| format!("  {:width$}  {}\n", m.id, m.path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_discovered_models() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tiny.gguf"), b"").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"").unwrap();

        let output = render(&discover_models(dir.path()));
        assert!(output.contains("tiny"));
        assert!(!output.contains("readme"));
    }

    #[test]
    fn empty_directory() {
        assert_eq!(render(&[]), "  (none found)\n");
    }
}

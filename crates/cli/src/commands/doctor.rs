//! `themeloom doctor`: diagnose configuration health.

use std::path::Path;
use themeloom_config::AppConfig;
use themeloom_core::ProviderKind;
use themeloom_providers::{build_from_config, discover_models};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Themeloom Doctor");
    println!("===================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `themeloom config --init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    let warnings = provider_warnings(&config);
    if warnings.is_empty() {
        println!("  ✅ Provider '{}' ready", config.provider_kind());
    }
    for w in &warnings {
        println!("  ⚠️  {w}");
        issues += 1;
    }

    let runners = build_from_config(&config);
    for (kind, name) in runners.list() {
        println!("  ·  {kind} runner: {name}");
    }

    match models_status(&config.models_dir) {
        Some(0) => println!(
            "  ⚠️  Models directory {} has no .gguf files",
            config.models_dir.display()
        ),
        Some(n) => println!("  ✅ {n} local model(s) in {}", config.models_dir.display()),
        None => println!(
            "  ·  No models directory at {} (only needed for local inference)",
            config.models_dir.display()
        ),
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Problems that make the configured provider fall back to templates.
fn provider_warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    match config.provider_kind() {
        ProviderKind::Api if !config.has_api_key() => warnings.push(
            "Provider 'api' has no API key (set THEMELOOM_API_KEY or OPENAI_API_KEY)".to_string(),
        ),
        ProviderKind::Local if config.model_path.is_none() => warnings.push(
            "Provider 'local' has no model_path (set LLAMA_CPP_MODEL_PATH)".to_string(),
        ),
        _ => {}
    }
    warnings
}

/// Number of local models, or `None` when the directory is missing.
fn models_status(dir: &Path) -> Option<usize> {
    dir.is_dir().then(|| discover_models(dir).len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_without_key_is_flagged() {
        let config = AppConfig {
            default_provider: "api".into(),
            ..AppConfig::default()
        };
        assert_eq!(provider_warnings(&config).len(), 1);

        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..config
        };
        assert!(provider_warnings(&config).is_empty());
    }

    #[test]
    fn default_provider_needs_nothing() {
        assert!(provider_warnings(&AppConfig::default()).is_empty());
    }

    #[test]
    fn models_directory_status() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(models_status(dir.path()), Some(0));

        std::fs::write(dir.path().join("a.gguf"), b"").unwrap();
        assert_eq!(models_status(dir.path()), Some(1));

        assert_eq!(models_status(&dir.path().join("missing")), None);
    }
}

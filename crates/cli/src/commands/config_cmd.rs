//! `themeloom config`: print or write the default configuration.

use std::path::{Path, PathBuf};
use themeloom_config::AppConfig;

pub async fn run(init: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    if init {
        let path = init_at(&config_path)?;
        println!("✅ Wrote default config to {}", path.display());
    } else {
        println!("# {}", config_path.display());
        print!("{}", AppConfig::default_toml());
    }
    Ok(())
}

/// Write the default config to `path` unless something is already there.
fn init_at(path: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("{} already exists; remove it first", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".themeloom").join("config.toml");

        init_at(&path).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider, "none");
        assert_eq!(config.generation.max_theme_count, 10);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_provider = \"api\"\n").unwrap();

        assert!(init_at(&path).is_err());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("api"));
    }
}

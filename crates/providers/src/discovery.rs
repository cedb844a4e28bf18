//! Local model discovery.
//!
//! Lists `*.gguf` files in a models directory so a front end can offer them
//! for selection. The chosen `path` is passed through to the `local` runner
//! as `model_path` and never interpreted here.

use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// A selectable local model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalModel {
    /// File stem, e.g. `qwen2-0_5b-instruct-q4_k_m`
    pub id: String,
    /// Display label
    pub filename: String,
    /// Selection path handed back as `model_path`
    pub path: String,
}

/// List GGUF files directly under `dir`, sorted case-insensitively by
/// filename. A missing or unreadable directory yields an empty list.
pub fn discover_models(dir: &Path) -> Vec<LocalModel> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Models directory not readable");
            return Vec::new();
        }
    };

    let mut models: Vec<LocalModel> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"))
        })
        .filter_map(|path| {
            let filename = path.file_name()?.to_str()?.to_string();
            let id = path.file_stem()?.to_str()?.to_string();
            Some(LocalModel {
                id,
                filename,
                path: path.to_string_lossy().into_owned(),
            })
        })
        .collect();

    models.sort_by_key(|m| m.filename.to_lowercase());
    models
}

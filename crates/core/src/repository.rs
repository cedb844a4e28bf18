//! Repository trait: persistence for generated records.
//!
//! Callers that wrap the engine store what it returns. The generation path
//! itself never touches a repository.

use crate::error::Result;
use crate::record::{GenerationSource, ThemeRecord};
use crate::request::PostBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record plus its storage envelope.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord<T> {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub record: T,
}

/// Filter for [`Repository::list`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Only records generated for this platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Only records produced by this path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<GenerationSource>,

    /// Maximum number of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn source(mut self, source: GenerationSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        if let Some(platform) = &self.platform {
            if record.platform() != Some(platform.as_str()) {
                return false;
            }
        }
        if let Some(source) = self.source {
            if record.source() != Some(source) {
                return false;
            }
        }
        true
    }
}

/// What a record exposes to [`RecordFilter`].
pub trait Filterable {
    fn platform(&self) -> Option<&str>;
    fn source(&self) -> Option<GenerationSource>;
}

impl Filterable for ThemeRecord {
    fn platform(&self) -> Option<&str> {
        self.metadata().get("platform").map(String::as_str)
    }

    fn source(&self) -> Option<GenerationSource> {
        ThemeRecord::source(self)
    }
}

impl Filterable for PostBatch {
    fn platform(&self) -> Option<&str> {
        Some(&self.platform)
    }

    /// `Llm` if any caption came from the model, else `Rule`.
    fn source(&self) -> Option<GenerationSource> {
        if self.sources.is_empty() {
            None
        } else if self.sources.values().any(|s| *s == GenerationSource::Llm) {
            Some(GenerationSource::Llm)
        } else {
            Some(GenerationSource::Rule)
        }
    }
}

/// Storage for generated records.
///
/// Implementations: in-memory (for tests and the CLI). Database backends
/// plug in behind the same trait.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Store a record and return its new ID.
    async fn save(&self, record: T) -> Result<String>;

    /// Get a record by ID.
    async fn get(&self, id: &str) -> Result<Option<StoredRecord<T>>>;

    /// List records matching `filter`, newest first.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord<T>>>;

    /// Delete a record by ID. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NsfwLevel;
    use std::collections::BTreeMap;

    fn theme(platform: &str, source: &str) -> ThemeRecord {
        let metadata = BTreeMap::from([
            ("platform".to_string(), platform.to_string()),
            ("source".to_string(), source.to_string()),
        ]);
        ThemeRecord::new("t", "", ["tag"], NsfwLevel::None, metadata).unwrap()
    }

    #[test]
    fn filter_matches_platform_and_source() {
        let filter = RecordFilter::default().platform("x").source(GenerationSource::Llm);
        assert!(filter.matches(&theme("x", "llm")));
        assert!(!filter.matches(&theme("x", "rule")));
        assert!(!filter.matches(&theme("pixiv", "llm")));
        assert!(RecordFilter::default().matches(&theme("pixiv", "rule")));
    }
}

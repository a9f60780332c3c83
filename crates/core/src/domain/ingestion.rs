// Ingestion result (stage-local, never persisted)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Sentinel prefix for sources that embed raw markdown.
pub const MARKDOWN_PREFIX: &str = "markdown://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Markdown,
    Web,
    Youtube,
    Mock,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Markdown => "markdown",
            SourceType::Web => "web",
            SourceType::Youtube => "youtube",
            SourceType::Mock => "mock",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub source_type: SourceType,
    pub title: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    /// Downloaded source video, used by the shorts stage
    pub video_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl IngestionResult {
    pub fn new(source_type: SourceType, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_type,
            title: title.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
            video_path: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Returns the markdown body when `source_ref` embeds one.
pub fn markdown_payload(source_ref: &str) -> Option<&str> {
    source_ref.strip_prefix(MARKDOWN_PREFIX)
}

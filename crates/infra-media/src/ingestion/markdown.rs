// Markdown payload ingestion

use contentforge_core::domain::{DomainError, IngestionResult, SourceType};
use contentforge_core::error::Result;

const DEFAULT_TITLE: &str = "Markdown Source";

/// Title is the first `#` heading, else a fixed default.
pub fn ingest_markdown(payload: &str) -> Result<IngestionResult> {
    let text = payload.trim();
    if text.is_empty() {
        return Err(DomainError::InvalidSource("markdown source is empty".into()).into());
    }

    let title = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim())
        .filter(|heading| !heading.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    Ok(IngestionResult::new(SourceType::Markdown, title, text)
        .with_metadata("source_ref", "markdown input"))
}

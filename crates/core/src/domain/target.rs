// Target - requested artifact kinds

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A requested artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Newsletter,
    Blog,
    Linkedin,
    Threads,
    YoutubeScript,
    ShortsScripts,
    CardNews,
    Thumbnail,
    Chart,
    ShortsVideos,
}

/// Targets used when a request does not name any.
///
/// `shorts-videos` is opt-in because it needs a downloadable source video.
pub const DEFAULT_TARGETS: [Target; 9] = [
    Target::Newsletter,
    Target::Blog,
    Target::Linkedin,
    Target::Threads,
    Target::YoutubeScript,
    Target::ShortsScripts,
    Target::CardNews,
    Target::Thumbnail,
    Target::Chart,
];

impl Target {
    pub const ALL: [Target; 10] = [
        Target::Newsletter,
        Target::Blog,
        Target::Linkedin,
        Target::Threads,
        Target::YoutubeScript,
        Target::ShortsScripts,
        Target::CardNews,
        Target::Thumbnail,
        Target::Chart,
        Target::ShortsVideos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Newsletter => "newsletter",
            Target::Blog => "blog",
            Target::Linkedin => "linkedin",
            Target::Threads => "threads",
            Target::YoutubeScript => "youtube-script",
            Target::ShortsScripts => "shorts-scripts",
            Target::CardNews => "card-news",
            Target::Thumbnail => "thumbnail",
            Target::Chart => "chart",
            Target::ShortsVideos => "shorts-videos",
        }
    }

    /// Parse a single canonical target name (no alias expansion).
    pub fn from_name(name: &str) -> Option<Target> {
        Target::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// True for targets produced by the text agents stage.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Target::Newsletter
                | Target::Blog
                | Target::Linkedin
                | Target::Threads
                | Target::YoutubeScript
                | Target::ShortsScripts
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expand legacy aliases and canonicalize raw names.
///
/// Names are trimmed and lowercased, blanks are skipped, and the result is
/// deduplicated keeping first occurrence order. Unknown names are collected
/// into a single error.
pub fn normalize_targets<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Target>> {
    let mut expanded: Vec<Target> = Vec::new();
    let mut unknown: Vec<String> = Vec::new();

    for item in raw {
        let name = item.as_ref().trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        match name.as_str() {
            "visuals" => expanded.extend([Target::CardNews, Target::Thumbnail]),
            "visual-card-news" => expanded.push(Target::CardNews),
            "visual-thumbnail" => expanded.push(Target::Thumbnail),
            "charts" => expanded.push(Target::Chart),
            other => match Target::from_name(other) {
                Some(target) => expanded.push(target),
                None => unknown.push(other.to_string()),
            },
        }
    }

    if !unknown.is_empty() {
        unknown.sort();
        unknown.dedup();
        return Err(DomainError::UnsupportedTargets(unknown.join(", ")));
    }

    let mut deduped: Vec<Target> = Vec::with_capacity(expanded.len());
    for target in expanded {
        if !deduped.contains(&target) {
            deduped.push(target);
        }
    }

    if deduped.is_empty() {
        return Err(DomainError::EmptyTargets);
    }
    Ok(deduped)
}

// Key message extraction
//
// Ranks sentence candidates from the source text. Candidates that look like
// leaked prompt or instruction text are never returned.

use crate::domain::text::shorten;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Emitted when nothing usable survives filtering
pub const EXTRACTION_PLACEHOLDER: &str = "핵심 메시지를 추출하지 못했습니다. 원문 검토가 필요해요.";

const MESSAGE_WIDTH: usize = 120;
const MIN_CANDIDATE_CHARS: usize = 18;

const META_PATTERNS: [&str; 10] = [
    "instagram card-news",
    "responsemodalities",
    "generationconfig",
    "\"model\"",
    "prompt",
    "thumbnail",
    "last slide",
    "cta",
    "output format",
    "system instruction",
];

const PRIORITY_TERMS: [&str; 14] = [
    "핵심", "전략", "시장", "고객", "매출", "성과", "전환", "효율", "비용", "리스크", "자동화",
    "성장", "수익", "개선",
];

const TITLE_STOPWORDS: [&str; 17] = [
    "the", "and", "for", "with", "from", "about", "this", "that", "guide", "news", "update",
    "분석", "가이드", "정리", "리포트", "콘텐츠", "마케팅",
];

const INSTRUCTION_TERMS: [&str; 7] = [
    "create",
    "generate",
    "style",
    "prompt",
    "slide",
    "thumbnail",
    "output",
];

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid code fence regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+").expect("valid bullet regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+").expect("valid numbered regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static TITLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣A-Za-z0-9]+").expect("valid title token regex"));

/// Up to `count` ranked key messages, or the placeholder when none survive.
pub fn extract_key_messages(title: &str, text: &str, count: usize) -> Vec<String> {
    let candidates = collect_candidates(text);
    let keywords = title_keywords(title);

    let mut scored: Vec<(i64, usize, &String)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (score_candidate(c, &keywords), idx, c))
        .filter(|(score, _, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut selected: Vec<String> = Vec::new();
    let mut used: HashSet<String> = HashSet::new();
    for (_, _, candidate) in scored {
        if selected.len() >= count {
            break;
        }
        if used.insert(candidate.to_lowercase()) {
            selected.push(shorten(candidate, MESSAGE_WIDTH, "..."));
        }
    }

    if selected.len() < count.min(3) {
        for candidate in &candidates {
            if selected.len() >= count {
                break;
            }
            if is_meta_candidate(candidate) {
                continue;
            }
            if used.insert(candidate.to_lowercase()) {
                selected.push(shorten(candidate, MESSAGE_WIDTH, "..."));
            }
        }
    }

    if selected.is_empty() {
        return vec![EXTRACTION_PLACEHOLDER.to_string()];
    }
    selected
}

/// Sentence-like candidates in source order, deduplicated case-insensitively.
fn collect_candidates(text: &str) -> Vec<String> {
    let raw = CODE_FENCE.replace_all(text, " ").replace("\r\n", "\n");

    let mut pieces = Vec::new();
    let mut seen = HashSet::new();
    for line in raw.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        let stripped = BULLET.replace(stripped, "");
        let stripped = NUMBERED.replace(&stripped, "");
        let stripped = stripped.trim_start_matches('#').trim();
        if stripped.is_empty() {
            continue;
        }
        for chunk in split_sentences(stripped) {
            let Some(candidate) = clean_candidate(chunk) else {
                continue;
            };
            if seen.insert(candidate.to_lowercase()) {
                pieces.push(candidate);
            }
        }
    }
    pieces
}

/// Split after sentence punctuation (`.`, `!`, `?`, `。`) followed by whitespace.
fn split_sentences(line: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut iter = line.char_indices().peekable();
    while let Some((idx, ch)) = iter.next() {
        if ch.is_whitespace() && matches!(prev, Some('.' | '!' | '?' | '。')) {
            chunks.push(&line[start..idx]);
            let mut next_start = idx + ch.len_utf8();
            while let Some(&(j, c)) = iter.peek() {
                if !c.is_whitespace() {
                    break;
                }
                next_start = j + c.len_utf8();
                iter.next();
            }
            start = next_start;
            prev = None;
            continue;
        }
        prev = Some(ch);
    }
    if start < line.len() {
        chunks.push(&line[start..]);
    }
    chunks
}

fn clean_candidate(chunk: &str) -> Option<String> {
    let value = chunk.trim();
    if value.is_empty() {
        return None;
    }
    let value = LINK.replace_all(value, "$1");
    let value = value.replace(['`', '*'], "");
    let value = WHITESPACE.replace_all(&value, " ").trim().to_string();

    if value.chars().count() < MIN_CANDIDATE_CHARS {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return None;
    }
    if value.contains("{message}") || value.contains("{topic}") {
        return None;
    }
    if is_meta_candidate(&value) {
        return None;
    }
    Some(value)
}

/// Longest title tokens first, stopwords and single chars removed.
fn title_keywords(title: &str) -> Vec<String> {
    let mut keywords: Vec<String> = TITLE_TOKEN
        .find_iter(title)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| w.chars().count() >= 2 && !TITLE_STOPWORDS.contains(&w.as_str()))
        .collect();
    keywords.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    keywords.truncate(8);
    keywords
}

fn score_candidate(candidate: &str, title_keywords: &[String]) -> i64 {
    if is_meta_candidate(candidate) {
        return -100;
    }
    let lowered = candidate.to_lowercase();
    let len = candidate.chars().count() as i64;

    let mut score = len.min(90);
    if candidate.chars().any(|c| c.is_ascii_digit()) {
        score += 16;
    }
    let priority_hits = PRIORITY_TERMS
        .iter()
        .filter(|t| candidate.contains(*t))
        .count() as i64;
    score += (priority_hits * 10).min(40);
    let title_hits = title_keywords
        .iter()
        .filter(|k| lowered.contains(k.as_str()))
        .count() as i64;
    score += (title_hits * 14).min(42);

    if len < 30 {
        score -= 20;
    }
    if len > 180 {
        score -= 15;
    }
    if looks_like_instruction(candidate) {
        score -= 45;
    }
    score
}

/// Mostly-English imperative text with almost no Hangul reads as an instruction.
fn looks_like_instruction(candidate: &str) -> bool {
    let lowered = candidate.to_lowercase();
    if !INSTRUCTION_TERMS.iter().any(|t| lowered.contains(t)) {
        return false;
    }
    let hangul = candidate
        .chars()
        .filter(|c| ('\u{ac00}'..='\u{d7a3}').contains(c))
        .count();
    let ascii_alpha = candidate.chars().filter(|c| c.is_ascii_alphabetic()).count();
    ascii_alpha > 18 && hangul < 4
}

fn is_meta_candidate(candidate: &str) -> bool {
    let lowered = candidate.to_lowercase();
    META_PATTERNS.iter().any(|p| lowered.contains(p))
}

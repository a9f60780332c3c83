// Planner - brief.md synthesis
//
// Heuristic values are always computed first. AI-generated template
// variables only override them when a provider answers with usable JSON.

use crate::domain::prompt::{self, keys, PromptMap, PromptVariable, VariableMap};
use crate::domain::text::{bullet_lines, shorten};
use crate::domain::{IngestionResult, Job, Target};
use crate::port::TextProvider;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const AI_SYSTEM_PROMPT: &str = "You generate variables for a markdown template. \
Return only a JSON object. Never include markdown code fences.";
const AI_MAX_TOKENS: u32 = 900;
const PREVIEW_WIDTH: usize = 1200;
const EXCERPT_WIDTH: usize = 5200;
const NONE_LINE: &str = "- 없음";

/// Inputs of one brief rendering
pub struct BriefInput<'a> {
    pub job: &'a Job,
    pub ingestion: &'a IngestionResult,
    pub targets: &'a [Target],
    pub warnings: &'a [String],
    pub key_messages: &'a [String],
}

/// Render `planner.brief-template` for a job.
pub async fn build_brief(
    input: &BriefInput<'_>,
    prompts: &PromptMap,
    variables: &VariableMap,
    providers: &[Arc<dyn TextProvider>],
) -> String {
    let base = base_values(input);
    let definitions: &[PromptVariable] = variables
        .get(keys::BRIEF_TEMPLATE)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut resolved = prompt::resolve_variables(definitions, &base);
    let ai_values = resolve_ai_variables(input, definitions, &resolved, providers).await;
    resolved.extend(ai_values);

    let template = prompts
        .get(keys::BRIEF_TEMPLATE)
        .map(String::as_str)
        .unwrap_or(prompt::BRIEF_TEMPLATE);
    prompt::render(template, &resolved)
}

fn base_values(input: &BriefInput<'_>) -> HashMap<String, String> {
    let ingestion = input.ingestion;
    let targets: Vec<String> = input.targets.iter().map(|t| t.to_string()).collect();
    let source_ref = ingestion
        .metadata
        .get("url")
        .or_else(|| ingestion.metadata.get("source_ref"))
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| "local source".to_string());

    HashMap::from([
        ("source_ref".to_string(), source_ref),
        (
            "source_type".to_string(),
            ingestion.source_type.to_string(),
        ),
        ("title".to_string(), ingestion.title.clone()),
        ("language".to_string(), input.job.language.clone()),
        ("tone".to_string(), input.job.tone.clone()),
        ("target_lines".to_string(), bullet_lines(&targets, NONE_LINE)),
        (
            "key_lines".to_string(),
            bullet_lines(input.key_messages, NONE_LINE),
        ),
        (
            "warning_lines".to_string(),
            bullet_lines(input.warnings, NONE_LINE),
        ),
        (
            "source_preview".to_string(),
            shorten(&ingestion.text.replace('\n', " "), PREVIEW_WIDTH, "..."),
        ),
    ])
}

/// Values for AI-generated variables.
///
/// Falls back to the heuristic value (or the variable default) in mock mode,
/// without an available provider, or when the call or parse fails.
async fn resolve_ai_variables(
    input: &BriefInput<'_>,
    definitions: &[PromptVariable],
    resolved: &HashMap<String, String>,
    providers: &[Arc<dyn TextProvider>],
) -> HashMap<String, String> {
    let ai_variables: Vec<&PromptVariable> = definitions
        .iter()
        .filter(|v| v.kind.is_ai_generated() && !v.name.trim().is_empty())
        .collect();
    if ai_variables.is_empty() {
        return HashMap::new();
    }

    let fallback: HashMap<String, String> = ai_variables
        .iter()
        .map(|v| {
            let heuristic = resolved
                .get(&v.name)
                .map(|s| s.trim())
                .unwrap_or_default();
            let value = if heuristic.is_empty() {
                v.default_value.trim()
            } else {
                heuristic
            };
            (v.name.clone(), value.to_string())
        })
        .collect();

    if input.job.mock_mode {
        return fallback;
    }
    let Some(provider) = providers.iter().find(|p| p.is_available()) else {
        return fallback;
    };

    let user_prompt = ai_user_prompt(input, &ai_variables, resolved);
    let raw = match provider
        .generate(AI_SYSTEM_PROMPT, &user_prompt, AI_MAX_TOKENS)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                job_id = %input.job.id,
                provider = provider.name(),
                error = %e,
                "Brief variable generation failed, using heuristic values"
            );
            return fallback;
        }
    };
    let Some(parsed) = parse_json_object(&raw) else {
        debug!(job_id = %input.job.id, "Brief variable response was not a JSON object");
        return fallback;
    };

    let mut merged = fallback;
    for (name, value) in merged.iter_mut() {
        if let Some(Value::String(candidate)) = parsed.get(name) {
            let candidate = candidate.trim();
            if !candidate.is_empty() {
                *value = candidate.to_string();
            }
        }
    }
    merged
}

fn ai_user_prompt(
    input: &BriefInput<'_>,
    ai_variables: &[&PromptVariable],
    resolved: &HashMap<String, String>,
) -> String {
    let or_dash = |s: &str| {
        let s = s.trim();
        if s.is_empty() {
            "-".to_string()
        } else {
            s.to_string()
        }
    };
    let variable_lines: Vec<String> = ai_variables
        .iter()
        .map(|v| {
            format!(
                "- {}: description={}; ai_instruction={}; default={}",
                v.name,
                or_dash(&v.description),
                or_dash(v.kind.instruction()),
                or_dash(&v.default_value)
            )
        })
        .collect();

    let get = |key: &str| resolved.get(key).cloned().unwrap_or_default();
    let targets_text = if input.targets.is_empty() {
        "없음".to_string()
    } else {
        input
            .targets
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let excerpt = shorten(
        &input.ingestion.text.replace('\n', " "),
        EXCERPT_WIDTH,
        "...",
    );

    format!(
        "[목표]\n\
brief.md 템플릿의 AI 생성형 변수 값을 채운다.\n\n\
[변수 정의]\n\
{variables}\n\n\
[입력 컨텍스트]\n\
- source_ref: {source_ref}\n\
- source_type: {source_type}\n\
- title: {title}\n\
- language: {language}\n\
- tone: {tone}\n\
- targets: {targets}\n\
- warnings:\n{warnings}\n\
- key_candidates:\n{keys}\n\n\
[원문 발췌]\n\
{excerpt}\n\n\
[출력 규칙]\n\
- 반드시 JSON 객체 1개만 출력한다.\n\
- 키는 변수 정의에 있는 name만 사용한다.\n\
- *_lines 변수는 각 줄이 '- '로 시작하는 Markdown bullet 문자열로 출력한다.\n\
- source_preview는 4~6문장 한국어 요약으로 작성한다.\n\
- 프롬프트 지시나 메타 문장을 출력하지 않는다.",
        variables = variable_lines.join("\n"),
        source_ref = get("source_ref"),
        source_type = get("source_type"),
        title = get("title"),
        language = get("language"),
        tone = get("tone"),
        targets = targets_text,
        warnings = bullet_lines(input.warnings, NONE_LINE),
        keys = bullet_lines(input.key_messages, NONE_LINE),
        excerpt = excerpt,
    )
}

/// Parse the whole response as a JSON object, else the outermost `{...}` span.
pub fn parse_json_object(raw: &str) -> Option<Map<String, Value>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Bullet items of the "핵심 메시지" section of a rendered brief.
///
/// Falls back to other bullets that are not input-info lines when the
/// section is missing or empty.
pub fn key_messages_from_brief(brief: &str, limit: usize) -> Vec<String> {
    const INFO_PREFIXES: [&str; 6] = ["Source:", "소스 타입:", "제목:", "언어:", "톤:", "URL:"];

    let mut in_section = false;
    let mut messages = Vec::new();
    for line in brief.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("## ") {
            in_section = trimmed.contains("핵심 메시지");
            continue;
        }
        if in_section {
            if let Some(item) = trimmed.strip_prefix("- ") {
                let item = item.trim();
                if !item.is_empty() {
                    messages.push(item.to_string());
                }
            }
        }
        if messages.len() >= limit {
            break;
        }
    }
    if !messages.is_empty() {
        return messages;
    }

    brief
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(str::trim)
        .filter(|item| !item.is_empty() && !INFO_PREFIXES.iter().any(|p| item.starts_with(p)))
        .take(limit)
        .map(str::to_string)
        .collect()
}

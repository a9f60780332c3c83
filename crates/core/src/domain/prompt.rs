// Prompt templates and template variables

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Template key -> template content
pub type PromptMap = HashMap<String, String>;

/// Template key -> variable definitions (sorted by sort_order, name)
pub type VariableMap = HashMap<String, Vec<PromptVariable>>;

pub mod keys {
    pub const BRIEF_TEMPLATE: &str = "planner.brief-template";
    pub const SYSTEM_TEXT_AGENT: &str = "system.text-agent";
    pub const TASK_NEWSLETTER: &str = "task.newsletter";
    pub const TASK_BLOG: &str = "task.blog";
    pub const TASK_LINKEDIN: &str = "task.linkedin";
    pub const TASK_YOUTUBE_SCRIPT: &str = "task.youtube-script";
    pub const TASK_THREAD: &str = "task.thread";
    pub const TASK_SHORTS_SCRIPT: &str = "task.shorts-script";
    pub const VISUAL_CARD_COVER: &str = "visual.card.cover";
    pub const VISUAL_CARD_BODY: &str = "visual.card.body";
    pub const VISUAL_CARD_CTA: &str = "visual.card.cta";
    pub const VISUAL_THUMBNAIL: &str = "visual.thumbnail";
    pub const CHART_OVERVIEW_TITLE: &str = "chart.overview.title";
    pub const CHART_TREND_TITLE: &str = "chart.trend.title";
}

/// How a template variable gets its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableKind {
    /// Supplied by the caller at render time
    Required,
    /// Supplied by the caller, else the stored default
    DefaultValue,
    /// Filled by a text provider, else the stored default
    AiGenerated { instruction: String },
}

impl VariableKind {
    /// Storage tag (`value_type` column).
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Required => "INPUT_REQUIRED",
            VariableKind::DefaultValue => "INPUT_WITH_DEFAULT",
            VariableKind::AiGenerated { .. } => "AI_GENERATED",
        }
    }

    /// Rebuild from the stored tag. Unknown tags read as `Required`.
    pub fn from_parts(value_type: &str, instruction: &str) -> Self {
        match value_type.trim().to_ascii_uppercase().as_str() {
            "INPUT_WITH_DEFAULT" => VariableKind::DefaultValue,
            "AI_GENERATED" => VariableKind::AiGenerated {
                instruction: instruction.trim().to_string(),
            },
            _ => VariableKind::Required,
        }
    }

    pub fn instruction(&self) -> &str {
        match self {
            VariableKind::AiGenerated { instruction } => instruction,
            _ => "",
        }
    }

    pub fn is_ai_generated(&self) -> bool {
        matches!(self, VariableKind::AiGenerated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptVariable {
    pub prompt_key: String,
    pub name: String,
    pub kind: VariableKind,
    pub default_value: String,
    pub description: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub key: String,
    pub label: String,
    pub content: String,
    pub updated_at: i64, // epoch ms
}

pub struct DefaultPrompt {
    pub key: &'static str,
    pub label: &'static str,
    pub content: &'static str,
}

struct DefaultVariable {
    prompt_key: &'static str,
    name: &'static str,
    value_type: &'static str,
    default_value: &'static str,
    description: &'static str,
    ai_instruction: &'static str,
    sort_order: i64,
}

pub const BRIEF_TEMPLATE: &str = "# brief.md\n\n\
## 입력 정보\n\
- Source: {source_ref}\n\
- 소스 타입: {source_type}\n\
- 제목: {title}\n\
- 언어: {language}\n\
- 톤: {tone}\n\n\
## 타겟 산출물\n\
{target_lines}\n\n\
## 핵심 메시지 (3~5개)\n\
{key_lines}\n\n\
## 주의/제약\n\
{warning_lines}\n\n\
## 원문 요약\n\
{source_preview}\n";

pub const DEFAULT_PROMPTS: &[DefaultPrompt] = &[
    DefaultPrompt {
        key: keys::BRIEF_TEMPLATE,
        label: "브리핑 생성 템플릿",
        content: BRIEF_TEMPLATE,
    },
    DefaultPrompt {
        key: keys::SYSTEM_TEXT_AGENT,
        label: "텍스트 에이전트 시스템 프롬프트",
        content: "You are {agent_name}. Write natural {language} content for marketers. \
Tone must be: {tone}. Avoid hype words and provide practical details.",
    },
    DefaultPrompt {
        key: keys::TASK_NEWSLETTER,
        label: "뉴스레터 작업 지시",
        content: "15,000자 내외 인터뷰형 뉴스레터를 작성해 주세요.",
    },
    DefaultPrompt {
        key: keys::TASK_BLOG,
        label: "블로그 작업 지시",
        content: "SEO 친화적 블로그 글(3,000~5,000자)을 작성해 주세요.",
    },
    DefaultPrompt {
        key: keys::TASK_LINKEDIN,
        label: "링크드인 작업 지시",
        content: "링크드인 전문가 톤 포스트를 작성해 주세요.",
    },
    DefaultPrompt {
        key: keys::TASK_YOUTUBE_SCRIPT,
        label: "유튜브 대본 작업 지시",
        content: "타임스탬프 포함 유튜브 대본을 작성해 주세요.",
    },
    DefaultPrompt {
        key: keys::TASK_THREAD,
        label: "스레드 작업 지시",
        content: "X 스레드 {index}/10: 280자 이내로 작성해 주세요.",
    },
    DefaultPrompt {
        key: keys::TASK_SHORTS_SCRIPT,
        label: "쇼츠 대본 작업 지시",
        content: "쇼츠 대본 {index}/3: 후킹-본문-CTA 60초 구조로 작성해 주세요.",
    },
    DefaultPrompt {
        key: keys::VISUAL_CARD_COVER,
        label: "카드뉴스 표지 프롬프트",
        content: "Instagram card-news cover. Strong hook title, high contrast, modern marketing style.",
    },
    DefaultPrompt {
        key: keys::VISUAL_CARD_BODY,
        label: "카드뉴스 본문 프롬프트",
        content: "Instagram card-news slide focused on: {message}. Clean layout, iconography, readable Korean text.",
    },
    DefaultPrompt {
        key: keys::VISUAL_CARD_CTA,
        label: "카드뉴스 CTA 프롬프트",
        content: "Instagram card-news last slide. Clear CTA. Bold typography. Marketing action oriented.",
    },
    DefaultPrompt {
        key: keys::VISUAL_THUMBNAIL,
        label: "썸네일 프롬프트",
        content: "YouTube thumbnail 1280x720. Big Korean title around '{topic}'. Strong contrast, human-friendly, no clutter.",
    },
    DefaultPrompt {
        key: keys::CHART_OVERVIEW_TITLE,
        label: "차트 개요 제목",
        content: "핵심 메시지 우선순위 차트",
    },
    DefaultPrompt {
        key: keys::CHART_TREND_TITLE,
        label: "차트 추세 제목",
        content: "실행 임팩트 추세",
    },
];

const DEFAULT_TONE: &str = "친근하고 실용적, 실행 중심";

const DEFAULT_VARIABLES: &[DefaultVariable] = &[
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "source_ref",
        value_type: "INPUT_REQUIRED",
        default_value: "",
        description: "생성 요청 시 입력 소스 식별자(예: URL, 문서명).",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "source_type",
        value_type: "INPUT_REQUIRED",
        default_value: "markdown",
        description: "입력 소스 타입입니다. 예: youtube, web, markdown.",
        ai_instruction: "",
        sort_order: 20,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "title",
        value_type: "INPUT_REQUIRED",
        default_value: "제목 없음",
        description: "원문 제목입니다.",
        ai_instruction: "",
        sort_order: 30,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "language",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "ko",
        description: "콘텐츠 생성 언어. 비어 있으면 기본값 사용.",
        ai_instruction: "",
        sort_order: 40,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "tone",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: DEFAULT_TONE,
        description: "콘텐츠 톤. 비어 있으면 기본값 사용.",
        ai_instruction: "",
        sort_order: 50,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "target_lines",
        value_type: "AI_GENERATED",
        default_value: "- 없음",
        description: "타겟 산출물 섹션용 Markdown bullet 목록입니다.",
        ai_instruction: "입력된 타겟 목록을 기반으로 실행 우선순위가 드러나게 bullet 3~7줄로 정리하세요.",
        sort_order: 60,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "key_lines",
        value_type: "AI_GENERATED",
        default_value: "- 핵심 메시지를 추출하지 못했습니다.",
        description: "핵심 메시지 섹션용 Markdown bullet 목록입니다.",
        ai_instruction: "원문과 제목을 기반으로 핵심 메시지 3~5개를 추출하고, 문장형 bullet로 작성하세요.",
        sort_order: 70,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "warning_lines",
        value_type: "AI_GENERATED",
        default_value: "- 없음",
        description: "주의/제약 섹션용 Markdown bullet 목록입니다.",
        ai_instruction: "입력 경고와 리스크를 통합해 마케터 관점의 주의사항 bullet 1~5개를 작성하세요.",
        sort_order: 80,
    },
    DefaultVariable {
        prompt_key: keys::BRIEF_TEMPLATE,
        name: "source_preview",
        value_type: "AI_GENERATED",
        default_value: "요약 정보가 없습니다.",
        description: "원문 요약 본문입니다.",
        ai_instruction: "원문을 4~6문장으로 요약하고 실행 가능한 인사이트를 포함하세요.",
        sort_order: 90,
    },
    DefaultVariable {
        prompt_key: keys::SYSTEM_TEXT_AGENT,
        name: "agent_name",
        value_type: "INPUT_REQUIRED",
        default_value: "marketing-writer",
        description: "에이전트 이름입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::SYSTEM_TEXT_AGENT,
        name: "language",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "ko",
        description: "콘텐츠 언어 기본값입니다.",
        ai_instruction: "",
        sort_order: 20,
    },
    DefaultVariable {
        prompt_key: keys::SYSTEM_TEXT_AGENT,
        name: "tone",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: DEFAULT_TONE,
        description: "텍스트 생성 기본 톤입니다.",
        ai_instruction: "",
        sort_order: 30,
    },
    DefaultVariable {
        prompt_key: keys::TASK_THREAD,
        name: "index",
        value_type: "INPUT_REQUIRED",
        default_value: "1",
        description: "스레드 순번 변수입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::TASK_SHORTS_SCRIPT,
        name: "index",
        value_type: "INPUT_REQUIRED",
        default_value: "1",
        description: "쇼츠 스크립트 순번 변수입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::VISUAL_CARD_COVER,
        name: "topic",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "입력 원문의 핵심 주제",
        description: "카드뉴스 커버 중심 주제입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::VISUAL_CARD_BODY,
        name: "message",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "핵심 메시지를 시각적으로 전달",
        description: "카드뉴스 본문 슬라이드 메시지입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::VISUAL_CARD_BODY,
        name: "topic",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "입력 원문의 핵심 주제",
        description: "카드뉴스 본문 슬라이드 주제입니다.",
        ai_instruction: "",
        sort_order: 20,
    },
    DefaultVariable {
        prompt_key: keys::VISUAL_CARD_CTA,
        name: "message",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "행동 유도 메시지",
        description: "카드뉴스 CTA 메시지입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
    DefaultVariable {
        prompt_key: keys::VISUAL_THUMBNAIL,
        name: "topic",
        value_type: "INPUT_WITH_DEFAULT",
        default_value: "마케팅 자동화 핵심 포인트",
        description: "썸네일 중심 주제입니다.",
        ai_instruction: "",
        sort_order: 10,
    },
];

/// Label of a built-in template, or the key itself.
pub fn default_label(key: &str) -> &str {
    DEFAULT_PROMPTS
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.label)
        .unwrap_or(key)
}

/// Built-in template contents.
pub fn default_prompt_map() -> PromptMap {
    DEFAULT_PROMPTS
        .iter()
        .map(|p| (p.key.to_string(), p.content.to_string()))
        .collect()
}

/// Built-in variable definitions.
pub fn default_variables() -> Vec<PromptVariable> {
    DEFAULT_VARIABLES
        .iter()
        .map(|v| PromptVariable {
            prompt_key: v.prompt_key.to_string(),
            name: v.name.to_string(),
            kind: VariableKind::from_parts(v.value_type, v.ai_instruction),
            default_value: v.default_value.to_string(),
            description: v.description.to_string(),
            sort_order: v.sort_order,
        })
        .collect()
}

/// Built-in variables grouped by template key.
pub fn default_variable_map() -> VariableMap {
    let mut map = VariableMap::new();
    for variable in default_variables() {
        map.entry(variable.prompt_key.clone())
            .or_default()
            .push(variable);
    }
    map
}

/// Order variables by `sort_order`, then name.
pub fn sort_variables(variables: &mut [PromptVariable]) {
    variables.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Resolve each defined variable: a non-blank runtime value wins, else the
/// default. Runtime values for names without a definition pass through.
pub fn resolve_variables(
    definitions: &[PromptVariable],
    runtime: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut resolved = runtime.clone();
    for definition in definitions {
        let value = runtime
            .get(&definition.name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| definition.default_value.clone());
        resolved.insert(definition.name.clone(), value);
    }
    resolved
}

/// Replace every `{name}` with its value. Unknown placeholders stay.
pub fn render(template: &str, values: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (name, value) in values {
        rendered = rendered.replace(&format!("{{{}}}", name), value);
    }
    rendered
}

/// Built-in content of a template key (empty for unknown keys).
pub fn default_content(key: &str) -> &'static str {
    DEFAULT_PROMPTS
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.content)
        .unwrap_or("")
}

/// Stored content of `key` unless blank, else the built-in content.
pub fn prompt_or_default<'a>(prompts: &'a PromptMap, key: &str) -> &'a str {
    match prompts.get(key) {
        Some(content) if !content.trim().is_empty() => content.as_str(),
        _ => default_content(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(key: &str) -> Vec<PromptVariable> {
        default_variable_map().remove(key).unwrap_or_default()
    }

    #[test]
    fn test_every_default_variable_belongs_to_a_default_prompt() {
        for variable in default_variables() {
            assert!(
                DEFAULT_PROMPTS.iter().any(|p| p.key == variable.prompt_key),
                "orphan variable {}",
                variable.name
            );
        }
    }

    #[test]
    fn test_runtime_value_wins_over_default() {
        let mut runtime = HashMap::new();
        runtime.insert("topic".to_string(), "AI 마케팅".to_string());
        let resolved = resolve_variables(&vars(keys::VISUAL_THUMBNAIL), &runtime);
        assert_eq!(resolved["topic"], "AI 마케팅");
    }

    #[test]
    fn test_blank_runtime_value_falls_back_for_every_kind() {
        let mut runtime = HashMap::new();
        runtime.insert("title".to_string(), "   ".to_string());
        runtime.insert("key_lines".to_string(), String::new());
        let resolved = resolve_variables(&vars(keys::BRIEF_TEMPLATE), &runtime);
        assert_eq!(resolved["title"], "제목 없음");
        assert_eq!(resolved["key_lines"], "- 핵심 메시지를 추출하지 못했습니다.");
        assert_eq!(resolved["language"], "ko");
    }

    #[test]
    fn test_render_replaces_known_names_only() {
        let mut values = HashMap::new();
        values.insert("index".to_string(), "3".to_string());
        let rendered = render("X 스레드 {index}/10 {other}", &values);
        assert_eq!(rendered, "X 스레드 3/10 {other}");
    }

    #[test]
    fn test_kind_storage_tags() {
        let kind = VariableKind::from_parts("ai_generated", " do it ");
        assert_eq!(kind.as_str(), "AI_GENERATED");
        assert_eq!(kind.instruction(), "do it");
        assert_eq!(VariableKind::from_parts("weird", "x"), VariableKind::Required);
    }

    #[test]
    fn test_brief_template_has_ai_variables() {
        let ai: Vec<_> = vars(keys::BRIEF_TEMPLATE)
            .into_iter()
            .filter(|v| v.kind.is_ai_generated())
            .map(|v| v.name)
            .collect();
        assert_eq!(
            ai,
            vec!["target_lines", "key_lines", "warning_lines", "source_preview"]
        );
    }
}

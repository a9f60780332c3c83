// Text agents - per-target text generation with bounded fan-out

use crate::application::worker::constants::TEXT_AGENT_POOL_CAP;
use crate::domain::prompt::{self, keys, PromptMap, VariableMap};
use crate::domain::text::{shorten, truncate_chars};
use crate::domain::{layout, Target};
use crate::error::Result;
use crate::port::{TextProvider, DEFAULT_MAX_TOKENS};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

const SOURCE_PROMPT_CHARS: usize = 5000;
const MOCK_PREVIEW_WIDTH: usize = 500;

/// Shared, read-only inputs of one TEXT_AGENTS run
pub struct TextAgentInput {
    pub job_id: String,
    pub brief: String,
    pub source_text: String,
    pub output_dir: PathBuf,
    pub tone: String,
    pub language: String,
    pub mock: bool,
    pub prompts: PromptMap,
    pub variables: VariableMap,
}

#[derive(Debug, Default)]
pub struct TextAgentOutput {
    pub artifacts: Vec<PathBuf>,
    /// `"{target}: {error}"` per failed target
    pub failures: Vec<String>,
    pub failed_targets: Vec<Target>,
}

/// Generates every requested text target, tolerating per-target failures.
#[derive(Clone)]
pub struct TextAgentService {
    providers: Vec<Arc<dyn TextProvider>>,
}

impl TextAgentService {
    /// `providers` are tried in order for every document.
    pub fn new(providers: Vec<Arc<dyn TextProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn TextProvider>] {
        &self.providers
    }

    /// Run all text targets concurrently (at most `TEXT_AGENT_POOL_CAP` at once).
    ///
    /// Returns only after every target has finished. A failing target never
    /// cancels its siblings.
    pub async fn generate(&self, input: TextAgentInput, targets: &[Target]) -> TextAgentOutput {
        let selected: Vec<Target> = targets.iter().copied().filter(Target::is_text).collect();
        let mut output = TextAgentOutput::default();
        if selected.is_empty() {
            return output;
        }

        for dir in [layout::THREADS_DIR, layout::SHORTS_SCRIPTS_DIR] {
            if let Err(e) = tokio::fs::create_dir_all(input.output_dir.join(dir)).await {
                warn!(job_id = %input.job_id, dir, error = %e, "Failed to create text output dir");
            }
        }

        let input = Arc::new(input);
        let permits = Arc::new(Semaphore::new(TEXT_AGENT_POOL_CAP.min(selected.len())));
        let mut handles = Vec::with_capacity(selected.len());
        for target in selected {
            let service = self.clone();
            let input = Arc::clone(&input);
            let permits = Arc::clone(&permits);
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    crate::error::AppError::Internal(format!("agent pool closed: {}", e))
                })?;
                service.generate_target(&input, target).await
            });
            handles.push((target, handle));
        }

        for (target, handle) in handles {
            match handle.await {
                Ok(Ok(paths)) => {
                    debug!(job_id = %input.job_id, %target, files = paths.len(), "Text target done");
                    output.artifacts.extend(paths);
                }
                Ok(Err(e)) => {
                    warn!(job_id = %input.job_id, %target, error = %e, "Text target failed");
                    output.failures.push(format!("{}: {}", target, e));
                    output.failed_targets.push(target);
                }
                Err(join_err) => {
                    warn!(job_id = %input.job_id, %target, error = %join_err, "Text target task aborted");
                    output.failures.push(format!("{}: {}", target, join_err));
                    output.failed_targets.push(target);
                }
            }
        }

        info!(
            job_id = %input.job_id,
            artifacts = output.artifacts.len(),
            failures = output.failures.len(),
            "Text agents finished"
        );
        output
    }

    async fn generate_target(&self, input: &TextAgentInput, target: Target) -> Result<Vec<PathBuf>> {
        let (agent, task_key, files): (&str, &str, Vec<(String, Option<usize>)>) = match target {
            Target::Newsletter => (
                "newsletter-writer",
                keys::TASK_NEWSLETTER,
                vec![(layout::NEWSLETTER.to_string(), None)],
            ),
            Target::Blog => (
                "blog-writer",
                keys::TASK_BLOG,
                vec![(layout::BLOG.to_string(), None)],
            ),
            Target::Linkedin => (
                "linkedin-writer",
                keys::TASK_LINKEDIN,
                vec![(layout::LINKEDIN.to_string(), None)],
            ),
            Target::YoutubeScript => (
                "youtube-scriptwriter",
                keys::TASK_YOUTUBE_SCRIPT,
                vec![(layout::YOUTUBE_SCRIPT.to_string(), None)],
            ),
            Target::Threads => (
                "thread-writer",
                keys::TASK_THREAD,
                (1..=layout::THREAD_COUNT)
                    .map(|i| (layout::thread(i), Some(i)))
                    .collect(),
            ),
            Target::ShortsScripts => (
                "shorts-scriptwriter",
                keys::TASK_SHORTS_SCRIPT,
                (1..=layout::SHORTS_COUNT)
                    .map(|i| (layout::shorts_script(i), Some(i)))
                    .collect(),
            ),
            _ => return Ok(Vec::new()),
        };

        let mut written = Vec::with_capacity(files.len());
        for (rel, index) in files {
            let mut runtime = HashMap::new();
            if let Some(index) = index {
                runtime.insert("index".to_string(), index.to_string());
            }
            let task = render_prompt(input, task_key, runtime);
            let content = self.generate_single(input, agent, &task).await;
            let path = input.output_dir.join(&rel);
            tokio::fs::write(&path, content).await?;
            written.push(path);
        }
        Ok(written)
    }

    /// First available provider with a non-blank answer wins; otherwise the
    /// deterministic mock rendering is returned.
    async fn generate_single(&self, input: &TextAgentInput, agent: &str, task: &str) -> String {
        if input.mock {
            return mock_text(agent, task, &input.brief, &input.source_text);
        }

        let system = render_prompt(
            input,
            keys::SYSTEM_TEXT_AGENT,
            HashMap::from([
                ("agent_name".to_string(), agent.to_string()),
                ("language".to_string(), input.language.clone()),
                ("tone".to_string(), input.tone.clone()),
            ]),
        );
        let user = format!(
            "[Task]\n{}\n\n[Brief]\n{}\n\n[Source]\n{}",
            task,
            input.brief,
            truncate_chars(&input.source_text, SOURCE_PROMPT_CHARS)
        );

        for provider in self.providers.iter().filter(|p| p.is_available()) {
            match provider.generate(&system, &user, DEFAULT_MAX_TOKENS).await {
                Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
                Ok(_) => {
                    debug!(job_id = %input.job_id, agent, provider = provider.name(), "Empty completion");
                }
                Err(e) => {
                    warn!(job_id = %input.job_id, agent, provider = provider.name(), error = %e, "Text provider failed");
                }
            }
        }
        mock_text(agent, task, &input.brief, &input.source_text)
    }
}

fn render_prompt(input: &TextAgentInput, key: &str, runtime: HashMap<String, String>) -> String {
    let template = prompt::prompt_or_default(&input.prompts, key);
    let definitions = input.variables.get(key).map(Vec::as_slice).unwrap_or(&[]);
    let values = prompt::resolve_variables(definitions, &runtime);
    prompt::render(template, &values)
}

/// Deterministic stand-in used in mock mode and when every provider fails.
pub fn mock_text(agent: &str, task: &str, brief: &str, source: &str) -> String {
    format!(
        "# {}\n\n## 작업 지시\n{}\n\n## 핵심 정리\n{}\n\n## 초안\n{}\n\n실제 API 키를 설정하면 모델 기반 결과가 생성됩니다.",
        agent,
        task,
        shorten(&brief.replace('\n', " "), MOCK_PREVIEW_WIDTH, "..."),
        shorten(&source.replace('\n', " "), MOCK_PREVIEW_WIDTH, "..."),
    )
}

/// Relative display path of an artifact under `root`.
pub fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::{default_prompt_map, default_variable_map};
    use crate::port::text_provider::mocks::ScriptedTextProvider;
    use crate::port::ProviderError;
    use tempfile::TempDir;

    fn input(dir: &Path, mock: bool) -> TextAgentInput {
        TextAgentInput {
            job_id: "job-1".into(),
            brief: "# brief.md\n\n## 핵심 메시지\n- 메시지".into(),
            source_text: "원문 본문입니다.".into(),
            output_dir: dir.to_path_buf(),
            tone: String::new(),
            language: "ko".into(),
            mock,
            prompts: default_prompt_map(),
            variables: default_variable_map(),
        }
    }

    #[tokio::test]
    async fn test_mock_mode_writes_every_layout_file() {
        let dir = TempDir::new().unwrap();
        let service = TextAgentService::new(vec![]);
        let output = service
            .generate(
                input(dir.path(), true),
                &[Target::Blog, Target::Threads, Target::ShortsScripts, Target::Chart],
            )
            .await;

        assert!(output.failures.is_empty());
        assert_eq!(output.artifacts.len(), 1 + 10 + 3);
        let blog = std::fs::read_to_string(dir.path().join("blog.md")).unwrap();
        assert!(blog.starts_with("# blog-writer"));
        assert!(blog.contains("SEO 친화적 블로그 글"));
        let thread = std::fs::read_to_string(dir.path().join("threads/thread-07.md")).unwrap();
        assert!(thread.contains("X 스레드 7/10"));
        assert!(dir.path().join("shorts-scripts/shorts-03.md").exists());
    }

    #[tokio::test]
    async fn test_first_successful_provider_wins_and_prompt_is_rendered() {
        let dir = TempDir::new().unwrap();
        let first = Arc::new(ScriptedTextProvider::failing(
            "openai",
            ProviderError::Http {
                status: 500,
                body: "oops".into(),
            },
        ));
        let second = Arc::new(ScriptedTextProvider::replying("anthropic", "  완성된 글  "));
        let service = TextAgentService::new(vec![
            Arc::new(ScriptedTextProvider::unavailable("off")),
            first.clone(),
            second.clone(),
        ]);

        let output = service
            .generate(input(dir.path(), false), &[Target::Linkedin])
            .await;
        assert!(output.failures.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("linkedin.md")).unwrap(),
            "완성된 글"
        );

        let (system, user, max_tokens) = second.calls().remove(0);
        assert!(system.starts_with("You are linkedin-writer. Write natural ko content"));
        // blank tone falls back to the variable default
        assert!(system.contains("Tone must be: 친근하고 실용적, 실행 중심."));
        assert!(user.starts_with("[Task]\n링크드인 전문가 톤 포스트"));
        assert_eq!(max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(first.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing_falls_back_to_mock_text() {
        let dir = TempDir::new().unwrap();
        let service = TextAgentService::new(vec![Arc::new(ScriptedTextProvider::replying(
            "blank", "   ",
        ))]);
        let output = service
            .generate(input(dir.path(), false), &[Target::Newsletter])
            .await;
        assert!(output.failures.is_empty());
        let text = std::fs::read_to_string(dir.path().join("newsletter.md")).unwrap();
        assert!(text.ends_with("실제 API 키를 설정하면 모델 기반 결과가 생성됩니다."));
    }

    #[tokio::test]
    async fn test_one_target_failing_does_not_stop_siblings() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should go makes the write fail.
        std::fs::create_dir_all(dir.path().join("blog.md")).unwrap();
        let service = TextAgentService::new(vec![]);
        let output = service
            .generate(
                input(dir.path(), true),
                &[Target::Blog, Target::Linkedin, Target::Newsletter],
            )
            .await;

        assert_eq!(output.failures.len(), 1);
        assert!(output.failures[0].starts_with("blog: "));
        assert!(dir.path().join("linkedin.md").is_file());
        assert!(dir.path().join("newsletter.md").is_file());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative(Path::new("/out/job"), Path::new("/out/job/threads/thread-01.md")),
            "threads/thread-01.md"
        );
    }
}

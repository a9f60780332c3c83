//! End-to-end pipeline runs against SQLite stores and the real media adapters
//!
//! No API keys are configured, so non-mock runs exercise the local fallbacks.

mod common;

use common::{mock_request, Harness};
use contentforge_core::application::pipeline::SHORTS_SKIPPED_WARNING;
use contentforge_core::application::CreateJobRequest;
use contentforge_core::domain::prompt::keys;
use contentforge_core::domain::{layout, JobStatus, Stage};
use contentforge_core::port::PromptStore;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const SOURCE: &str = "# 마케팅 자동화 가이드\n\n\
마케팅 자동화는 반복 업무를 줄여 팀이 전략에 집중하게 합니다.\n\n\
고객 여정별 메시지를 설계하면 전환율이 개선됩니다.\n\n\
캠페인 데이터를 주간 단위로 점검해 예산을 재배분합니다.";

fn png_size(path: &std::path::Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}

#[tokio::test]
async fn test_mock_blog_job_succeeds() {
    let h = Harness::new().await;
    let job = h.run(mock_request(SOURCE, &["blog"])).await;

    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.current_stage, Stage::Done);
    assert_eq!(job.progress, 100);
    assert!(job.error_message.is_none());
    assert!(job.started_at.is_some() && job.finished_at.is_some());

    let dir = h.job_dir(&job.id);
    let brief = std::fs::read_to_string(dir.join(layout::BRIEF)).unwrap();
    assert!(!brief.trim().is_empty());
    let blog = std::fs::read_to_string(dir.join(layout::BLOG)).unwrap();
    assert!(blog.contains("실제 API 키를 설정하면"));

    let report = std::fs::read_to_string(dir.join(layout::REVIEW_REPORT)).unwrap();
    assert!(!report.contains("[FAIL]"), "{}", report);

    // Only the requested text target is written
    assert!(!dir.join(layout::NEWSLETTER).exists());

    println!("✅ Mock blog job produced brief, blog and a clean review report");
}

#[tokio::test]
async fn test_mock_chart_job_writes_two_charts() {
    let h = Harness::new().await;
    let job = h.run(mock_request(SOURCE, &["chart"])).await;

    assert_eq!(job.status, JobStatus::Succeeded);
    let dir = h.job_dir(&job.id);
    for rel in [layout::CHART_OVERVIEW, layout::CHART_TREND] {
        assert_eq!(png_size(&dir.join(rel)), layout::CHART_SIZE, "{}", rel);
    }
}

#[tokio::test]
async fn test_visuals_alias_writes_cards_and_thumbnail() {
    let h = Harness::new().await;
    let job = h.run(mock_request(SOURCE, &["visuals"])).await;

    assert_eq!(job.status, JobStatus::Succeeded);
    let dir = h.job_dir(&job.id);
    assert_eq!(png_size(&dir.join(layout::THUMBNAIL)), layout::THUMBNAIL_SIZE);

    let slides: Vec<_> = std::fs::read_dir(dir.join(layout::CARD_NEWS_DIR))
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    assert!(
        (layout::MIN_CARD_SLIDES..=layout::MAX_CARD_SLIDES).contains(&slides.len()),
        "slide count {}",
        slides.len()
    );
    for i in 1..=slides.len() {
        assert_eq!(png_size(&dir.join(layout::card_slide(i))), layout::CARD_SIZE);
    }
}

#[tokio::test]
async fn test_markdown_source_drops_shorts_videos() {
    let h = Harness::new().await;
    let job = h
        .run(CreateJobRequest {
            source_markdown: Some(SOURCE.to_string()),
            targets: Some(vec!["chart".into(), "shorts-videos".into()]),
            mock_mode: false,
            ..Default::default()
        })
        .await;

    assert_ne!(job.status, JobStatus::Failed, "{:?}", job.error_message);
    let dir = h.job_dir(&job.id);
    assert!(!dir.join(layout::SHORTS_VIDEOS_DIR).exists());
    // Unconfigured image API falls back to local charts
    assert_eq!(png_size(&dir.join(layout::CHART_OVERVIEW)), layout::CHART_SIZE);

    let report = std::fs::read_to_string(dir.join(layout::REVIEW_REPORT)).unwrap();
    assert!(report.contains(SHORTS_SKIPPED_WARNING), "{}", report);
}

#[tokio::test]
async fn test_ingestion_failure_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let h = Harness::new().await;
    let job = h
        .run(CreateJobRequest {
            source_url: Some(format!("{}/missing", server.uri())),
            targets: Some(vec!["blog".into()]),
            ..Default::default()
        })
        .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.current_stage, Stage::Done);
    let message = job.error_message.unwrap_or_default();
    assert!(message.starts_with("INGESTION"), "{}", message);
    assert!(!h.job_dir(&job.id).join(layout::BRIEF).exists());
}

#[tokio::test]
async fn test_edited_prompt_reaches_agent() {
    let h = Harness::new().await;
    h.prompts
        .update_template(keys::TASK_BLOG, "사내 뉴스룸 톤으로 블로그 초안을 작성하세요.")
        .await
        .unwrap();

    let job = h.run(mock_request(SOURCE, &["blog"])).await;
    assert_eq!(job.status, JobStatus::Succeeded);

    let blog = std::fs::read_to_string(h.job_dir(&job.id).join(layout::BLOG)).unwrap();
    assert!(blog.contains("사내 뉴스룸 톤으로 블로그 초안을 작성하세요."), "{}", blog);
}

// Web page ingestion (main-content extraction with raw text fallback)

use crate::http::{build_client, send};
use contentforge_core::domain::{IngestionResult, SourceType};
use contentforge_core::error::{AppError, Result};
use contentforge_core::port::ProviderError;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

const DEFAULT_TITLE: &str = "Untitled Web source";
/// Extracts shorter than this fall back to the page's raw text
const MIN_EXTRACT_CHARS: usize = 300;
const CONTAINERS: [&str; 4] = ["article", "main", "[role=main]", "body"];
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));
static BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, h1, h2, h3, li, blockquote").expect("valid block selector")
});
static CONTAINER_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    CONTAINERS
        .iter()
        .map(|s| Selector::parse(s).expect("valid container selector"))
        .collect()
});

/// Title, main-content text and raw page text of an HTML document
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub title: String,
    pub main: String,
    pub raw: String,
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn main_text(document: &Html) -> String {
    for selector in CONTAINER_SELECTORS.iter() {
        let Some(container) = document.select(selector).next() else {
            continue;
        };
        let blocks: Vec<String> = container
            .select(&BLOCKS)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        if !blocks.is_empty() {
            return blocks.join("\n");
        }
    }
    String::new()
}

/// Every visible text node, one trimmed line each.
fn raw_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = match node.value() {
                Node::Text(text) => text.trim(),
                _ => return None,
            };
            let hidden = node
                .ancestors()
                .filter_map(|a| a.value().as_element())
                .any(|e| SKIPPED_TAGS.contains(&e.name()));
            (!text.is_empty() && !hidden).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn extract_page(html: &str) -> PageText {
    let document = Html::parse_document(html);
    let title = document
        .select(&TITLE)
        .next()
        .or_else(|| document.select(&H1).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    PageText {
        title,
        main: main_text(&document),
        raw: raw_text(&document),
    }
}

/// Pick the main extract, or the raw text with a warning when it is too short.
pub fn page_to_result(url: &str, page: PageText) -> Result<IngestionResult> {
    let mut warnings = Vec::new();
    let text = if page.main.chars().count() < MIN_EXTRACT_CHARS {
        if page.raw.trim().is_empty() {
            return Err(AppError::Execution("웹 본문 추출에 실패했습니다.".into()));
        }
        warnings.push("Readability 본문 추출 길이가 짧아 raw text fallback을 사용했습니다.".to_string());
        page.raw
    } else {
        page.main
    };

    let mut result =
        IngestionResult::new(SourceType::Web, page.title, text).with_metadata("url", url);
    result.warnings = warnings;
    Ok(result)
}

pub struct WebIngestor {
    client: Client,
}

impl WebIngestor {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    pub async fn ingest(&self, url: &str) -> Result<IngestionResult> {
        let html = send(self.client.get(url))
            .await?
            .text()
            .await
            .map_err(|e| AppError::from(ProviderError::Transport(e.to_string())))?;

        let page = extract_page(&html);
        info!(
            url = %url,
            main_chars = page.main.chars().count(),
            raw_chars = page.raw.chars().count(),
            "Fetched web source"
        );
        page_to_result(url, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn long_paragraph() -> String {
        "마케팅 자동화는 반복 업무를 줄이고 캠페인 성과를 높입니다. ".repeat(12)
    }

    #[test]
    fn test_extract_prefers_article_blocks() {
        let html = format!(
            "<html><head><title> 제목 </title><style>.x{{}}</style></head>\
<body><nav><li>메뉴</li></nav><article><h1>헤드</h1><p>{}</p><script>var a;</script></article></body></html>",
            long_paragraph()
        );
        let page = extract_page(&html);
        assert_eq!(page.title, "제목");
        assert!(page.main.starts_with("헤드\n"));
        assert!(!page.main.contains("메뉴"));
        assert!(!page.raw.contains("var a"));
        assert!(!page.raw.contains(".x{}"));
    }

    #[test]
    fn test_title_falls_back_to_h1_then_default() {
        assert_eq!(extract_page("<body><h1>H</h1></body>").title, "H");
        assert_eq!(extract_page("<body><p>x</p></body>").title, DEFAULT_TITLE);
    }

    #[test]
    fn test_short_extract_uses_raw_text_with_warning() {
        let page = extract_page("<body><div>짧은 본문</div><p>문단</p></body>");
        let result = page_to_result("https://example.com", page).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.text.contains("짧은 본문"));
        assert_eq!(result.metadata["url"], "https://example.com");
    }

    #[test]
    fn test_empty_page_is_error() {
        let page = extract_page("<html><body>  </body></html>");
        assert!(page_to_result("https://example.com", page).is_err());
    }

    #[tokio::test]
    async fn test_ingest_fetches_and_extracts() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><head><title>Launch</title></head><body><main><p>{}</p></main></body></html>",
            long_paragraph()
        );
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let url = format!("{}/post", server.uri());
        let result = WebIngestor::new(Duration::from_secs(5))
            .unwrap()
            .ingest(&url)
            .await
            .unwrap();
        assert_eq!(result.source_type, SourceType::Web);
        assert_eq!(result.title, "Launch");
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = WebIngestor::new(Duration::from_secs(5))
            .unwrap()
            .ingest(&server.uri())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Provider(ProviderError::Http { status: 404, .. })
        ));
    }
}

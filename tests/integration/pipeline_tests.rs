use crate::common::{mount_page, mount_status, page, root_url, test_config};
use async_trait::async_trait;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use web_content_analyzer::analysis::{AnalysisReport, Analyzer, LlmAnalyzer};
use web_content_analyzer::config::{load_config_with_hash, AnalysisConfig};
use web_content_analyzer::output::{render, OutputFormat};
use web_content_analyzer::{
    AnalysisError, Pipeline, ScrapeError, ScrapeRequest, ScrapeStatus,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Returns a fixed report and remembers the last user prompt
#[derive(Default)]
struct RecordingAnalyzer {
    last_prompt: Mutex<Option<String>>,
}

#[async_trait]
impl Analyzer for RecordingAnalyzer {
    async fn analyze(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(user_prompt.to_string());
        }
        AnalysisReport::from_value(json!({"summary": "stub", "topics": ["testing"]}))
    }
}

struct FailingAnalyzer;

#[async_trait]
impl Analyzer for FailingAnalyzer {
    async fn analyze(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        Err(AnalysisError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        })
    }
}

fn request(server: &MockServer) -> ScrapeRequest {
    ScrapeRequest::new(root_url(server).to_string())
}

fn chat_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 8 }
    }))
}

fn analysis_config(server: &MockServer) -> AnalysisConfig {
    AnalysisConfig {
        api_base_url: format!("{}/v1/", server.uri()),
        api_key_env: "WCA_TEST_UNSET_KEY_INTEGRATION".to_string(),
        timeout_secs: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scrape_single_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        page("Hello World", "The Quick, brown fox!", &["/next"]),
        1,
    )
    .await;
    mount_page(&server, "/next", page("Next", "Unused", &[]), 0).await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let scraped = pipeline
        .scrape(&request(&server))
        .await
        .expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Complete);
    assert!(scraped.is_complete());
    assert_eq!(scraped.content.title.as_deref(), Some("Hello World"));
    assert_eq!(scraped.content_type, "text/html");
    assert_eq!(scraped.normalized.with_stopwords, "the quick brown fox");
    assert!(scraped.normalized.without_stopwords.is_none());
    assert!(scraped.analysis.is_none());
    assert!(scraped.warnings.is_empty());
    assert_eq!(scraped.crawl.visited.len(), 1);
}

#[tokio::test]
async fn test_scrape_with_depth_merges_children() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Root text", &["/a"]), 1).await;
    mount_page(&server, "/a", page("A", "Child text", &[]), 1).await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let mut req = request(&server);
    req.depth = 1;
    req.max_pages = 1;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Complete);
    assert!(scraped.warnings.is_empty());
    assert_eq!(scraped.crawl.visited.len(), 2);
    assert_eq!(scraped.normalized.with_stopwords, "root text child text");
}

#[tokio::test]
async fn test_crawl_without_links_is_partial() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Nothing to follow", &[]), 1).await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let mut req = request(&server);
    req.depth = 1;
    req.max_pages = 5;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Partial);
    assert!(scraped.crawl.frontier_exhausted);
    assert_eq!(scraped.crawl.visited.len(), 1);
    assert_eq!(
        scraped.warnings,
        vec!["ran out of links to follow after 0 linked page(s)".to_string()]
    );
}

#[tokio::test]
async fn test_one_failed_child_keeps_the_others() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Root text", &["/a", "/broken", "/c"]), 1).await;
    mount_page(&server, "/a", page("A", "Alpha text", &[]), 1).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(
            ResponseTemplate::new(500).set_body_raw(page("Oops", "Broken text", &[]), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/c", page("C", "Gamma text", &[]), 1).await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let mut req = request(&server);
    req.depth = 1;
    req.max_pages = 3;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Partial);
    assert_eq!(scraped.crawl.visited.len(), 4);
    assert_eq!(scraped.crawl.pages_merged, 3);
    assert_eq!(scraped.crawl.failures.len(), 1);
    assert!(scraped.crawl.failures[0].url.ends_with("/broken"));

    let text = &scraped.content.main_text;
    assert!(text.contains("Alpha text"));
    assert!(text.contains("Gamma text"));
    assert!(!text.contains("Broken text"));
    assert!(!scraped.normalized.with_stopwords.contains("broken"));
    for child in ["/a", "/broken", "/c"] {
        assert!(scraped.content.links.iter().any(|l| l.ends_with(child)));
    }
}

#[tokio::test]
async fn test_stopword_variant_when_requested() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Fox", "The quick brown fox and the dog", &[]), 1).await;

    let mut config = test_config();
    config.normalize.remove_stopwords = true;
    config.normalize.extra_stopwords = vec!["Dog".to_string()];

    let pipeline = Pipeline::new(config).expect("Failed to build pipeline");
    let scraped = pipeline
        .scrape(&request(&server))
        .await
        .expect("Scrape failed");

    assert_eq!(
        scraped.normalized.with_stopwords,
        "the quick brown fox and the dog"
    );
    assert_eq!(
        scraped.normalized.without_stopwords.as_deref(),
        Some("quick brown fox")
    );
}

#[tokio::test]
async fn test_child_failure_marks_result_partial() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Root", &["/broken"]), 1).await;
    mount_status(&server, "/broken", 500).await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let mut req = request(&server);
    req.depth = 1;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Partial);
    assert_eq!(scraped.crawl.failures.len(), 1);
    assert!(scraped.warnings.iter().any(|w| w.contains("could not be fetched")));
}

#[tokio::test]
async fn test_root_failure_fails_the_scrape() {
    let server = MockServer::start().await;
    mount_status(&server, "/", 404).await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let err = pipeline
        .scrape(&request(&server))
        .await
        .expect_err("Root 404 must fail");

    assert!(matches!(err, ScrapeError::Fetch { status: Some(404), .. }));
}

#[tokio::test]
async fn test_analysis_included_when_requested() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Analyzed", "Worth a look", &[]), 1).await;

    let analyzer = Arc::new(RecordingAnalyzer::default());
    let pipeline = Pipeline::new(test_config())
        .expect("Failed to build pipeline")
        .with_analyzer(analyzer.clone());

    let mut req = request(&server);
    req.run_analysis = true;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Complete);
    let report = scraped.analysis.as_ref().expect("analysis missing");
    assert_eq!(report.get("summary"), Some(&json!("stub")));

    let prompt = analyzer
        .last_prompt
        .lock()
        .expect("prompt lock poisoned")
        .clone()
        .expect("analyzer was not called");
    assert!(prompt.contains("Title: Analyzed"));
    assert!(prompt.contains("Worth a look"));
}

#[tokio::test]
async fn test_analysis_failure_degrades_gracefully() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Content", &[]), 1).await;

    let pipeline = Pipeline::new(test_config())
        .expect("Failed to build pipeline")
        .with_analyzer(Arc::new(FailingAnalyzer));

    let mut req = request(&server);
    req.run_analysis = true;
    let scraped = pipeline.scrape(&req).await.expect("Scrape must still succeed");

    assert_eq!(scraped.status, ScrapeStatus::Partial);
    assert!(scraped.analysis.is_none());
    assert_eq!(scraped.content.title.as_deref(), Some("Home"));
    assert!(scraped.warnings.iter().any(|w| w.contains("analysis omitted")));
}

#[tokio::test]
async fn test_analysis_not_run_unless_requested() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Content", &[]), 1).await;

    let analyzer = Arc::new(RecordingAnalyzer::default());
    let pipeline = Pipeline::new(test_config())
        .expect("Failed to build pipeline")
        .with_analyzer(analyzer.clone());

    let scraped = pipeline
        .scrape(&request(&server))
        .await
        .expect("Scrape failed");

    assert!(scraped.analysis.is_none());
    assert!(analyzer.last_prompt.lock().expect("lock").is_none());
}

#[tokio::test]
async fn test_scrape_feed() {
    let server = MockServer::start().await;
    let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <description>News from the example site</description>
    <item>
      <title>First Post</title>
      <link>/posts/1</link>
      <description>&lt;p&gt;Hello &lt;b&gt;readers&lt;/b&gt;&lt;/p&gt;</description>
    </item>
    <item>
      <title>Second Post</title>
      <link>/posts/2</link>
      <description>More news</description>
    </item>
  </channel>
</rss>"#;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(rss, "application/rss+xml"))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config()).expect("Failed to build pipeline");
    let url = root_url(&server).join("/feed.xml").expect("join");
    let scraped = pipeline
        .scrape(&ScrapeRequest::new(url.to_string()))
        .await
        .expect("Scrape failed");

    assert_eq!(scraped.content.title.as_deref(), Some("Example Feed"));
    assert_eq!(scraped.content.headings, vec!["First Post", "Second Post"]);
    assert!(scraped.content.main_text.contains("Hello readers"));
    assert!(scraped.content.main_text.contains("More news"));
    assert!(scraped
        .content
        .links
        .iter()
        .any(|l| l.ends_with("/posts/1")));
    assert_eq!(
        scraped.content.meta.get("description").map(String::as_str),
        Some("News from the example site")
    );
}

#[tokio::test]
async fn test_pipeline_from_config_file() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Configured", "The text", &[]), 1).await;

    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"
[fetch]
allow-private-addresses = true
max-attempts = 1

[normalize]
remove-stopwords = true
"#
    )
    .expect("Failed to write config");

    let (config, hash) = load_config_with_hash(file.path()).expect("Failed to load config");
    assert_eq!(hash.len(), 64);
    assert_eq!(config.fetch.max_attempts, 1);

    let pipeline = Pipeline::new(config).expect("Failed to build pipeline");
    let scraped = pipeline
        .scrape(&request(&server))
        .await
        .expect("Scrape failed");

    assert_eq!(scraped.normalized.without_stopwords.as_deref(), Some("text"));

    let markdown = render(&scraped, OutputFormat::Markdown, true).expect("render");
    assert!(markdown.starts_with("# Configured"));
    let json = render(&scraped, OutputFormat::Json, false).expect("render");
    assert!(json.contains("\"status\":\"complete\""));
}

#[tokio::test]
async fn test_llm_analyzer_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "response_format": { "type": "json_object" }
        })))
        .respond_with(chat_response(
            r#"{"summary": "A page about foxes", "topics": ["foxes"]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = analysis_config(&server);
    config.schema = Some(r#"{"type": "object", "required": ["summary", "topics"]}"#.to_string());

    let analyzer = LlmAnalyzer::from_config(&config)
        .expect("Failed to build analyzer")
        .with_api_key("test-key");
    assert_eq!(
        analyzer.endpoint(),
        format!("{}/v1/chat/completions", server.uri())
    );

    let report = analyzer
        .analyze("system", "URL: https://example.com/\n\nContent:\nfoxes")
        .await
        .expect("Analysis failed");

    assert_eq!(report.get("summary"), Some(&json!("A page about foxes")));
    assert_eq!(report.get("topics"), Some(&json!(["foxes"])));
}

#[tokio::test]
async fn test_llm_analyzer_rejects_non_json_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_response("Sure! Here is a summary: foxes."))
        .mount(&server)
        .await;

    let analyzer = LlmAnalyzer::from_config(&analysis_config(&server))
        .expect("Failed to build analyzer")
        .with_api_key("test-key");

    let err = analyzer
        .analyze("system", "user")
        .await
        .expect_err("Prose reply must be rejected");
    assert!(matches!(err, AnalysisError::Malformed(_)));
}

#[tokio::test]
async fn test_llm_analyzer_requires_schema_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_response(r#"{"summary": "no topics here"}"#))
        .mount(&server)
        .await;

    let mut config = analysis_config(&server);
    config.schema = Some(r#"{"required": ["summary", "topics"]}"#.to_string());
    let analyzer = LlmAnalyzer::from_config(&config)
        .expect("Failed to build analyzer")
        .with_api_key("test-key");

    match analyzer.analyze("system", "user").await {
        Err(AnalysisError::Malformed(message)) => assert!(message.contains("topics")),
        other => panic!("unexpected result: {:?}", other.map(|r| r.into_value())),
    }
}

#[tokio::test]
async fn test_llm_analyzer_reports_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let analyzer = LlmAnalyzer::from_config(&analysis_config(&server))
        .expect("Failed to build analyzer")
        .with_api_key("wrong-key");

    match analyzer.analyze("system", "user").await {
        Err(AnalysisError::Upstream { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid api key"));
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.into_value())),
    }
}

#[tokio::test]
async fn test_pipeline_with_llm_analyzer() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Foxes", "All about foxes", &[]), 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_response(r#"{"summary": "foxes"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.analysis = analysis_config(&server);
    let analyzer = LlmAnalyzer::from_config(&config.analysis)
        .expect("Failed to build analyzer")
        .with_api_key("test-key");

    let pipeline = Pipeline::new(config)
        .expect("Failed to build pipeline")
        .with_analyzer(Arc::new(analyzer));

    let mut req = request(&server);
    req.run_analysis = true;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Complete);
    assert_eq!(
        scraped.analysis.and_then(|a| a.get("summary").cloned()),
        Some(json!("foxes"))
    );
}

#[tokio::test]
async fn test_missing_api_key_degrades_to_partial() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Content", &[]), 1).await;

    let mut config = test_config();
    config.analysis = analysis_config(&server);

    let pipeline = Pipeline::new(config).expect("Failed to build pipeline");
    let mut req = request(&server);
    req.run_analysis = true;
    let scraped = pipeline.scrape(&req).await.expect("Scrape failed");

    assert_eq!(scraped.status, ScrapeStatus::Partial);
    assert!(scraped
        .warnings
        .iter()
        .any(|w| w.contains("WCA_TEST_UNSET_KEY_INTEGRATION")));
}

use crate::common::{mount_page, mount_status, page, root_url, test_config, test_fetcher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use web_content_analyzer::config::Config;
use web_content_analyzer::{ScrapeError, UrlError};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url_for(server: &MockServer, route: &str) -> Url {
    root_url(server).join(route).expect("Failed to join route")
}

#[tokio::test]
async fn test_fetch_returns_body_type_and_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(page("Page", "Body", &[]), "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(&test_config());
    let result = fetcher
        .fetch(&url_for(&server, "/page"))
        .await
        .expect("Fetch failed");

    assert_eq!(result.final_url, url_for(&server, "/page"));
    assert!(result.content_type.starts_with("text/html"));
    assert!(String::from_utf8_lossy(&result.body).contains("<title>Page</title>"));
}

#[tokio::test]
async fn test_fetch_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", page("New", "Moved here", &[]), 1).await;

    let fetcher = test_fetcher(&test_config());
    let result = fetcher
        .fetch(&url_for(&server, "/old"))
        .await
        .expect("Fetch failed");

    assert_eq!(result.final_url.path(), "/new");
}

#[tokio::test]
async fn test_rate_limited_fetch_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/busy", page("Busy", "Finally", &[]), 1).await;

    let fetcher = test_fetcher(&test_config());
    let result = fetcher
        .fetch(&url_for(&server, "/busy"))
        .await
        .expect("Fetch should succeed on the third attempt");

    assert!(String::from_utf8_lossy(&result.body).contains("Finally"));
}

#[tokio::test]
async fn test_forbidden_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(&test_config());
    let err = fetcher
        .fetch(&url_for(&server, "/denied"))
        .await
        .expect_err("403 on every attempt must fail");

    match err {
        ScrapeError::Fetch {
            attempts, status, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(status, Some(403));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_not_found_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(&test_config());
    let err = fetcher
        .fetch(&url_for(&server, "/missing"))
        .await
        .expect_err("404 must fail");

    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, ScrapeError::Fetch { attempts: 1, .. }));
}

#[tokio::test]
async fn test_unsupported_content_type_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x25, 0x50, 0x44, 0x46], "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(&test_config());
    let err = fetcher
        .fetch(&url_for(&server, "/doc.pdf"))
        .await
        .expect_err("PDF must be rejected");

    match err {
        ScrapeError::UnsupportedContentType { content_type, .. } => {
            assert_eq!(content_type, "application/pdf");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_feed_content_types_are_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<rss version=\"2.0\"><channel><title>T</title></channel></rss>",
            "application/rss+xml",
        ))
        .mount(&server)
        .await;

    let fetcher = test_fetcher(&test_config());
    let result = fetcher
        .fetch(&url_for(&server, "/feed"))
        .await
        .expect("Feeds must be fetchable");
    assert_eq!(result.content_type, "application/rss+xml");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = MockServer::start().await;
    mount_page(&server, "/big", "x".repeat(4_096), 1).await;

    let mut config = test_config();
    config.fetch.max_page_bytes = 1_024;

    let fetcher = test_fetcher(&config);
    let err = fetcher
        .fetch(&url_for(&server, "/big"))
        .await
        .expect_err("Body over the page limit must fail");

    assert!(matches!(err, ScrapeError::TooLarge { limit: 1_024, .. }));
}

#[tokio::test]
async fn test_private_address_rejected_by_default() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("Home", "Root", &[]), 0).await;

    let fetcher = test_fetcher(&Config::default());
    let err = fetcher
        .fetch(&root_url(&server))
        .await
        .expect_err("Loopback targets must be refused");

    assert!(matches!(err, ScrapeError::InvalidUrl(UrlError::Blocked(_))));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_status(&server, "/error", 503).await;

    let fetcher = test_fetcher(&test_config());
    let err = fetcher
        .fetch(&url_for(&server, "/error"))
        .await
        .expect_err("503 must fail");

    assert!(matches!(
        err,
        ScrapeError::Fetch {
            attempts: 1,
            status: Some(503),
            ..
        }
    ));
}

#[tokio::test]
async fn test_truncated_body_reports_the_attempt_it_failed_on() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    // First connection is rate limited, the second promises more body than it sends
    let server = tokio::spawn(async move {
        let replies = [
            "HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 1000\r\nconnection: close\r\n\r\n<html><body>cut",
        ];
        for reply in replies {
            let (mut socket, _) = listener.accept().await.expect("Failed to accept");
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(reply.as_bytes())
                .await
                .expect("Failed to write reply");
            let _ = socket.shutdown().await;
        }
    });

    let fetcher = test_fetcher(&test_config());
    let url = Url::parse(&format!("http://{}/cut", addr)).expect("Failed to parse URL");
    let err = fetcher
        .fetch(&url)
        .await
        .expect_err("A truncated body must fail");

    match err {
        ScrapeError::Fetch {
            attempts,
            status,
            message,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(status, None);
            assert!(message.contains("failed reading body"), "{}", message);
        }
        other => panic!("unexpected error: {}", other),
    }
    server.await.expect("Server task panicked");
}

use std::sync::Arc;
use url::Url;
use web_content_analyzer::config::Config;
use web_content_analyzer::crawler::{Crawler, Fetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Default configuration with the address guard off and near-instant retries
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.fetch.allow_private_addresses = true;
    config.fetch.max_attempts = 3;
    config.fetch.retry_base_delay_ms = 10;
    config.fetch.retry_max_delay_ms = 40;
    config.fetch.timeout_secs = 5;
    config
}

pub fn test_fetcher(config: &Config) -> Arc<Fetcher> {
    Arc::new(Fetcher::new(config.fetch.clone()).expect("Failed to build fetcher"))
}

pub fn test_crawler(config: &Config) -> Crawler {
    Crawler::new(test_fetcher(config), config.crawl.clone())
}

pub fn root_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).expect("Failed to parse mock server URL")
}

/// A small HTML document with a title, one paragraph and the given hrefs
pub fn page(title: &str, text: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1><p>{}</p>{}</body></html>",
        title, title, text, anchors
    )
}

/// Serves `html` as `text/html` at `route`, expecting exactly `hits` GETs
pub async fn mount_page(server: &MockServer, route: &str, html: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .expect(hits)
        .mount(server)
        .await;
}

/// Serves `status` with an empty body at `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

use homeflix::config::{ProxyConfig, ScraperConfig, DEFAULT_USER_AGENT};
use homeflix::error::FetchError;
use homeflix::fetcher::{PageFetcher, PageSource};
use wiremock::matchers::{headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn returns_body_and_sends_user_agent() {
    // The mock server reads a comma in a header value as a list separator.
    let agent_parts: Vec<&str> = DEFAULT_USER_AGENT.split(", ").collect();
    assert_eq!(agent_parts.len(), 2);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(headers("user-agent", agent_parts))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&ScraperConfig::default()).unwrap();
    let html = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
    assert_eq!(html, "<html>hi</html>");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&ScraperConfig::default()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 503));
}

#[tokio::test]
async fn slow_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = ScraperConfig {
        timeout_secs: 1,
        ..ScraperConfig::default()
    };
    let fetcher = PageFetcher::new(&config).unwrap();
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn proxy_receives_target_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/"))
        .and(query_param("api_key", "bee-key"))
        .and(query_param("url", "https://oneddl.net/search/Heat"))
        .and(query_param("render_js", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rendered"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ScraperConfig {
        proxy: Some(ProxyConfig {
            api_key: "bee-key".to_string(),
            render_js: true,
            base_url: format!("{}/api/v1/", server.uri()),
        }),
        ..ScraperConfig::default()
    };
    let fetcher = PageFetcher::new(&config).unwrap();
    let html = fetcher.fetch("https://oneddl.net/search/Heat").await.unwrap();
    assert_eq!(html, "rendered");
}

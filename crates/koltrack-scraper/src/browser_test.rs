use std::time::Duration;

use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{Browser, RenderedBrowser, SessionConfig, Viewport};
use crate::ScrapeError;

fn session_config() -> SessionConfig {
    SessionConfig {
        user_agent: "test-agent/1.0".to_owned(),
        viewport: Viewport {
            width: 1920,
            height: 1080,
        },
        proxy: None,
        stealth: true,
    }
}

#[tokio::test]
async fn navigate_loads_rendered_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/content"))
        .and(body_partial_json(serde_json::json!({
            "url": "https://www.tiktok.com/@jane",
            "userAgent": "test-agent/1.0",
            "stealth": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><strong data-e2e=\"followers-count\">2.4M</strong></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let browser = RenderedBrowser::new(&server.uri(), None).unwrap();
    let mut session = browser.new_session(session_config()).await.unwrap();
    session
        .navigate("https://www.tiktok.com/@jane", Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(
        session.text("[data-e2e=\"followers-count\"]").await.as_deref(),
        Some("2.4M")
    );
    assert!(session.exists("[data-e2e=\"followers-count\"]").await);
    assert_eq!(session.count("strong").await, 1);
}

#[tokio::test]
async fn token_is_passed_as_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/content"))
        .and(query_param("token", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let browser = RenderedBrowser::new(&server.uri(), Some("s3cret".to_owned())).unwrap();
    let mut session = browser.new_session(session_config()).await.unwrap();
    session
        .navigate("https://example.com", Duration::from_secs(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn render_service_error_is_a_navigation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/content"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let browser = RenderedBrowser::new(&server.uri(), None).unwrap();
    let mut session = browser.new_session(session_config()).await.unwrap();
    let err = session
        .navigate("https://example.com", Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        ScrapeError::Navigation { timed_out, .. } => assert!(!timed_out),
        other => panic!("expected navigation error, got {other:?}"),
    }
    assert!(session.full_text().await.is_empty());
}

#[tokio::test]
async fn queries_before_navigation_return_defaults() {
    let server = MockServer::start().await;
    let browser = RenderedBrowser::new(&server.uri(), None).unwrap();
    let session = browser.new_session(session_config()).await.unwrap();

    assert_eq!(session.text("h1").await, None);
    assert!(!session.exists("h1").await);
    assert_eq!(session.count("h1").await, 0);
    assert!(session.full_text().await.is_empty());
}

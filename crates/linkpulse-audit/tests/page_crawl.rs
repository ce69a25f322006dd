//! Integration tests for the bio-page crawler against a `wiremock` server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use linkpulse_audit::{build_detector_client, crawl_page, AuditError, LinkClassification};

fn test_client() -> reqwest::Client {
    build_detector_client(5, "linkpulse-test/0.1").expect("failed to build test client")
}

const BIO_PAGE: &str = r##"
    <html><head><title>Creator Links</title></head><body>
    <a href="/newsletter">Newsletter</a>
    <a href="https://www.amazon.com/dp/B0LAMP?tag=creator-20">Desk lamp</a>
    <a href="https://amzn.to/3xYzAbC">Camera deal</a>
    <a href="#top">Back to top</a>
    <a href="mailto:hi@example.com">Say hi</a>
    <a href="https://shop.partner.com/mug?utm_source=bio">Mug</a>
    </body></html>
"##;

#[tokio::test]
async fn crawl_extracts_resolves_and_classifies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@creator"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BIO_PAGE))
        .mount(&server)
        .await;

    let page_url = format!("{}/@creator", server.uri());
    let crawl = crawl_page(&test_client(), &page_url)
        .await
        .expect("crawl should succeed");

    assert_eq!(crawl.page_title.as_deref(), Some("Creator Links"));
    assert_eq!(crawl.links.len(), 4, "skips fragment and mailto links");

    assert_eq!(crawl.links[0].url, format!("{}/newsletter", server.uri()));
    assert_eq!(crawl.links[0].classification, LinkClassification::Internal);

    assert_eq!(
        crawl.links[1].url,
        "https://www.amazon.com/dp/B0LAMP?tag=creator-20"
    );
    assert_eq!(crawl.links[1].classification, LinkClassification::Affiliate);

    assert_eq!(crawl.links[2].classification, LinkClassification::Affiliate);
    assert_eq!(crawl.links[3].classification, LinkClassification::External);

    // Document order is preserved and positions are dense.
    let positions: Vec<usize> = crawl.links.iter().map(|l| l.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn crawl_surfaces_http_status_as_structured_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@creator"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = crawl_page(&test_client(), &format!("{}/@creator", server.uri())).await;

    match result {
        Err(AuditError::HttpStatus { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected AuditError::HttpStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn crawl_surfaces_unreachable_host_as_network_error() {
    let result = crawl_page(&test_client(), "http://127.0.0.1:1/@creator").await;

    assert!(
        matches!(result, Err(AuditError::Network { .. })),
        "expected AuditError::Network, got: {result:?}"
    );
}

#[tokio::test]
async fn crawl_rejects_invalid_page_url() {
    let result = crawl_page(&test_client(), "not a url").await;

    assert!(
        matches!(result, Err(AuditError::InvalidUrl { .. })),
        "expected AuditError::InvalidUrl, got: {result:?}"
    );
}

#[tokio::test]
async fn crawl_of_page_without_links_is_empty_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@creator"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>no links here</body></html>"),
        )
        .mount(&server)
        .await;

    let crawl = crawl_page(&test_client(), &format!("{}/@creator", server.uri()))
        .await
        .expect("crawl should succeed");

    assert!(crawl.links.is_empty());
    assert!(crawl.page_title.is_none());
}

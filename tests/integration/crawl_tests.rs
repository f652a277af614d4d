//! Integration tests for fetching, sitemap resolution, link discovery and
//! the crawl worker pool
//!
//! These tests use wiremock to stand up local HTTP servers.

use llms_harvest::config::GenerateOptions;
use llms_harvest::crawler::{CrawlTarget, Crawler, Fetcher, SkipReason};
use llms_harvest::discovery::{
    discover_links, resolve_sitemap, DiscoveredUrl, DiscoveryMethod, LinkDiscoveryOptions,
};
use llms_harvest::extract::{ContentExtractor, ExtractOptions};
use llms_harvest::url::UrlFilter;
use llms_harvest::HarvestError;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Options pointed at a mock server with fast retries
fn test_options(base_url: &str) -> GenerateOptions {
    let mut options = GenerateOptions::for_site(base_url);
    options.retries = 2;
    options.retry_delay_ms = 10;
    options.timeout_ms = 2_000;
    options.request_delay_ms = 0;
    options
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html; charset=utf-8",
    )
}

fn remote(url: String) -> CrawlTarget {
    CrawlTarget::Remote(DiscoveredUrl::root(url, DiscoveryMethod::Seed, None))
}

fn crawler(options: &GenerateOptions, concurrency: usize) -> Crawler {
    Crawler::new(
        Fetcher::new(options).expect("fetcher"),
        ContentExtractor::new(ExtractOptions::from_options(options)).expect("extractor"),
        None,
        concurrency,
    )
}

#[tokio::test]
async fn test_http_error_status_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&test_options(&mock_server.uri())).unwrap();
    let response = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await
        .expect("a 404 is a response, not an error");

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut options = test_options(&mock_server.uri());
    options.timeout_ms = 100;
    options.retries = 1;

    let fetcher = Fetcher::new(&options).unwrap();
    let result = fetcher
        .fetch(&format!("{}/slow", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(HarvestError::Timeout { .. })));
}

#[tokio::test]
async fn test_body_limit_rejects_oversized_response_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(4096), "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/small"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(512), "text/html"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/big-error"))
        .respond_with(ResponseTemplate::new(500).set_body_raw("x".repeat(4096), "text/html"))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&test_options(&mock_server.uri()))
        .unwrap()
        .with_body_limit(1024);

    let result = fetcher.fetch(&format!("{}/big", mock_server.uri())).await;
    assert!(matches!(
        result,
        Err(HarvestError::ContentTooLarge { limit: 1024, .. })
    ));

    let small = fetcher
        .fetch(&format!("{}/small", mock_server.uri()))
        .await
        .expect("under the limit");
    assert_eq!(small.body.len(), 512);

    let error_page = fetcher
        .fetch(&format!("{}/big-error", mock_server.uri()))
        .await
        .expect("non-2xx bodies are not limited");
    assert_eq!(error_page.status, 500);
}

#[tokio::test]
async fn test_results_follow_input_order() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Earlier pages answer last
    for i in 0..5u64 {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(
                html_page(
                    &format!("Page {}", i),
                    "<main><p>This paragraph is long enough to count as real page content.</p></main>",
                )
                .set_delay(Duration::from_millis(250 - i * 50)),
            )
            .mount(&mock_server)
            .await;
    }

    let options = test_options(&base_url);
    let targets = (0..5).map(|i| remote(format!("{}/p{}", base_url, i))).collect();
    let pages = crawler(&options, 5).crawl(targets).await;

    assert_eq!(pages.len(), 5);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.url, format!("{}/p{}", base_url, i));
        assert_eq!(page.title, format!("Page {}", i));
        assert!(page.success);
        assert_eq!(page.status_code, Some(200));
    }
}

#[tokio::test]
async fn test_failures_become_skipped_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html_page(
            "OK",
            "<article><p>Plenty of article text to pass the minimum content length check.</p></article>",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("a".repeat(6 * 1024 * 1024), "text/html"),
        )
        .mount(&mock_server)
        .await;

    let options = test_options(&base_url);
    let targets = ["/ok", "/gone", "/file.pdf", "/huge"]
        .iter()
        .map(|p| remote(format!("{}{}", base_url, p)))
        .collect();
    let pages = crawler(&options, 2).crawl(targets).await;

    assert!(pages[0].success);
    assert_eq!(pages[1].skip_reason, Some(SkipReason::HttpStatus(404)));
    assert_eq!(pages[2].skip_reason, Some(SkipReason::ContentType));
    assert_eq!(pages[3].skip_reason, Some(SkipReason::TooLarge));
    assert!(pages[1..].iter().all(|p| !p.success));
}

#[tokio::test]
async fn test_sitemap_index_union() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <sitemap><loc>{0}/sitemap-docs.xml</loc></sitemap>
                <sitemap><loc>{0}/sitemap-blog.xml</loc></sitemap>
            </sitemapindex>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-docs.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<urlset>
                <url><loc>{0}/docs/a</loc><lastmod>2024-01-02</lastmod></url>
                <url><loc>{0}/docs/b</loc></url>
            </urlset>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-blog.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<urlset>
                <url><loc>{0}/blog/x</loc></url>
                <url><loc>{0}/docs/a</loc></url>
            </urlset>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&test_options(&base_url)).unwrap();
    let entries = resolve_sitemap(&fetcher, &format!("{}/sitemap.xml", base_url), &base_url)
        .await
        .expect("sitemap resolves");

    let mut locations: Vec<_> = entries.iter().map(|e| e.location.clone()).collect();
    locations.sort();
    assert_eq!(
        locations,
        vec![
            format!("{}/blog/x", base_url),
            format!("{}/docs/a", base_url),
            format!("{}/docs/b", base_url),
        ]
    );
}

#[tokio::test]
async fn test_failed_child_sitemap_is_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<sitemapindex><sitemap><loc>{0}/good.xml</loc></sitemap><sitemap><loc>{0}/bad.xml</loc></sitemap></sitemapindex>",
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/good.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{}/page</loc></url></urlset>",
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bad.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&test_options(&base_url)).unwrap();
    let entries = resolve_sitemap(&fetcher, &format!("{}/sitemap.xml", base_url), &base_url)
        .await
        .expect("one bad child does not fail resolution");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].location, format!("{}/page", base_url));
}

#[tokio::test]
async fn test_missing_root_sitemap_is_network_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&test_options(&base_url)).unwrap();
    let result = resolve_sitemap(&fetcher, &format!("{}/sitemap.xml", base_url), &base_url).await;

    assert!(matches!(result, Err(HarvestError::Network { .. })));
}

#[tokio::test]
async fn test_link_discovery_respects_depth() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/a">A</a><a href="https://elsewhere.example/">Elsewhere</a><a href="/a#top">A again</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", r#"<a href="/b">B</a><a href="/">Home</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("B", r#"<a href="/c">C</a>"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let options = test_options(&base_url);
    let fetcher = Fetcher::new(&options).unwrap();
    let seed = DiscoveredUrl::root(format!("{}/", base_url), DiscoveryMethod::Seed, None);

    let discovered = discover_links(
        &fetcher,
        vec![seed],
        &base_url,
        &UrlFilter::default(),
        LinkDiscoveryOptions {
            max_depth: 2,
            max_links_per_page: 50,
            concurrency: 2,
            request_delay: Duration::ZERO,
        },
    )
    .await;

    let found: Vec<_> = discovered
        .iter()
        .map(|d| (d.url.trim_start_matches(&base_url).to_string(), d.depth))
        .collect();
    assert_eq!(
        found,
        vec![
            ("/".to_string(), 0),
            ("/a".to_string(), 1),
            ("/b".to_string(), 2),
        ]
    );
    assert_eq!(discovered[2].parent_url, Some(format!("{}/a", base_url)));
    assert_eq!(discovered[2].method, DiscoveryMethod::InternalLink);
}

#[tokio::test]
async fn test_oversized_page_contributes_no_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let padding = "a".repeat(6 * 1024 * 1024);
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(r#"<a href="/a">A</a><p>{}</p>"#, padding),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", "<p>never reached</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let options = test_options(&base_url);
    let fetcher = Fetcher::new(&options).unwrap();
    let seed = DiscoveredUrl::root(format!("{}/", base_url), DiscoveryMethod::Seed, None);

    let discovered = discover_links(
        &fetcher,
        vec![seed],
        &base_url,
        &UrlFilter::default(),
        LinkDiscoveryOptions {
            max_depth: 2,
            max_links_per_page: 50,
            concurrency: 2,
            request_delay: Duration::ZERO,
        },
    )
    .await;

    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].url, format!("{}/", base_url));
}

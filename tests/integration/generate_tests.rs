//! End-to-end tests for `generate`
//!
//! A wiremock server plays the site; local-file tests add a temporary
//! source tree.

use llms_harvest::config::{FileSystemOptions, GenerateOptions};
use llms_harvest::{generate, HarvestError};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILLER: &str = "This paragraph carries enough words to be treated as genuine page content by the extractor.";

fn test_options(base_url: &str) -> GenerateOptions {
    let mut options = GenerateOptions::for_site(base_url);
    options.retries = 0;
    options.timeout_ms = 2_000;
    options.request_delay_ms = 0;
    options
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body><main>{}</main></body></html>",
            title, body
        ),
        "text/html",
    )
}

/// Mounts `/sitemap.xml` listing `(path, lastmod)` entries
async fn mount_sitemap(server: &MockServer, entries: &[(&str, Option<&str>)]) {
    let urls: String = entries
        .iter()
        .map(|(p, lastmod)| match lastmod {
            Some(date) => format!(
                "<url><loc>{}{}</loc><lastmod>{}</lastmod></url>",
                server.uri(),
                p,
                date
            ),
            None => format!("<url><loc>{}{}</loc></url>", server.uri(), p),
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(format!("<urlset>{}</urlset>", urls), "application/xml"),
        )
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page_path: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(title, body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sitemap_pages_ordered_by_lastmod() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_sitemap(
        &server,
        &[("/b", Some("2024-01-01")), ("/a", Some("2024-01-02"))],
    )
    .await;
    mount_page(&server, "/a", "Page A", &format!("<p>{}</p>", FILLER)).await;
    mount_page(&server, "/b", "Page B", &format!("<p>{}</p>", FILLER)).await;

    let (document, stats) = generate(test_options(&base_url)).await.expect("generation");

    let a = document
        .find(&format!("1. [Page A]({}/a)", base_url))
        .expect("A listed first");
    let b = document
        .find(&format!("2. [Page B]({}/b)", base_url))
        .expect("B listed second");
    assert!(a < b);

    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.successful_pages, 2);
    assert_eq!(stats.failed_pages, 0);
    assert_eq!(stats.discovered_urls, 2);
    assert!(document.starts_with("<SYSTEM>"));
    assert!(document.contains("> Pages: 2"));
    assert!(document.contains(&format!("URL: {}/a", base_url)));
}

#[tokio::test]
async fn test_failed_pages_are_marked_not_fatal() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_sitemap(
        &server,
        &[("/ok", Some("2024-02-01")), ("/missing", Some("2024-01-01"))],
    )
    .await;
    mount_page(&server, "/ok", "Fine", &format!("<p>{}</p>", FILLER)).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (document, stats) = generate(test_options(&base_url)).await.expect("generation");

    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.successful_pages, 1);
    assert_eq!(stats.failed_pages, 1);
    assert!(document.contains(&format!(
        "2. (Skipped) [{0}/missing]({0}/missing)",
        base_url
    )));
    assert!(document.contains("> This page was skipped: http-404"));
    assert!(document.contains("\n\n---\n\n"));
}

#[tokio::test]
async fn test_missing_sitemap_fails_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = generate(test_options(&server.uri())).await;
    assert!(matches!(result, Err(HarvestError::Network { .. })));
}

#[tokio::test]
async fn test_invalid_site_url_fails_before_crawling() {
    let result = generate(GenerateOptions::for_site("ftp://example.com")).await;
    assert!(matches!(result, Err(HarvestError::InvalidUrl(_))));

    let result = generate(GenerateOptions::default()).await;
    assert!(matches!(result, Err(HarvestError::InvalidUrl(_))));
}

#[tokio::test]
async fn test_character_budgets() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let long_text = FILLER.repeat(5);

    mount_sitemap(
        &server,
        &[
            ("/one", Some("2024-03-03")),
            ("/two", Some("2024-03-02")),
            ("/three", Some("2024-03-01")),
        ],
    )
    .await;
    for (p, title) in [("/one", "One"), ("/two", "Two"), ("/three", "Three")] {
        mount_page(&server, p, title, &format!("<p>{}</p>", long_text)).await;
    }

    let mut options = test_options(&base_url);
    options.max_chars_per_page = 200;
    options.max_total_chars = 300;

    let (document, stats) = generate(options).await.expect("generation");

    assert_eq!(stats.total_pages, 1);
    assert_eq!(stats.truncated_pages, 1);
    assert_eq!(stats.total_content_length, 200);
    assert!(stats.global_limit_reached);
    assert!(document.contains("[Content truncated: page exceeded 200 characters"));
    assert!(document.contains("[One]"));
    assert!(!document.contains("[Two]"));
}

#[tokio::test]
async fn test_local_files_become_pages() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_page(&server, "/", "Home", &format!("<p>{}</p>", FILLER)).await;

    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("docs")).unwrap();
    fs::write(
        dir.path().join("docs/intro.md"),
        "# Introduction\n\nLocal documentation that never lived on the web server.\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
    fs::write(dir.path().join("node_modules/pkg/readme.md"), "# Vendored\n").unwrap();

    let mut options = test_options(&base_url);
    options.use_sitemap = false;
    options.filesystem = FileSystemOptions {
        enabled: true,
        base_path: dir.path().to_path_buf(),
        ..FileSystemOptions::default()
    };

    let (document, stats) = generate(options).await.expect("generation");

    assert_eq!(stats.discovered_files, 1);
    assert_eq!(stats.total_pages, 2);
    assert!(document.contains(&format!("[Introduction]({}/docs/intro)", base_url)));
    assert!(document.contains("## Introduction"));
    assert!(document.contains("Local documentation that never lived on the web server."));
    assert!(!document.contains("Vendored"));
}

#[tokio::test]
async fn test_content_filter_drops_excluded_pages() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_sitemap(
        &server,
        &[("/docs/guide", Some("2024-01-02")), ("/blog/old", Some("2024-01-01"))],
    )
    .await;
    mount_page(&server, "/docs/guide", "Guide", &format!("<p>{}</p>", FILLER)).await;
    mount_page(
        &server,
        "/blog/old",
        "Old",
        &format!("<p>{} This feature is deprecated.</p>", FILLER),
    )
    .await;

    let mut options = test_options(&base_url);
    options.content_filter.enabled = true;
    options.content_filter.min_content_length = 0;
    options.content_filter.exclude_keywords = vec!["deprecated".to_string()];

    let (document, stats) = generate(options).await.expect("generation");

    assert_eq!(stats.filtered_out, 1);
    assert_eq!(stats.total_pages, 1);
    assert!(document.contains("[Guide]"));
    assert!(!document.contains("[Old]"));
}

#[tokio::test]
async fn test_exclude_patterns_and_transform() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_sitemap(&server, &[("/public", None), ("/internal/secret", None)]).await;
    mount_page(&server, "/public", "Public", &format!("<p>{}</p>", FILLER)).await;
    Mock::given(method("GET"))
        .and(path("/internal/secret"))
        .respond_with(html_page("Secret", "<p>hidden</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = test_options(&base_url);
    options.exclude_patterns = vec!["/internal/".to_string()];
    options.content_transform = Some(llms_harvest::config::ContentTransform::new(
        |_url: &str, content: &str| format!("{}\n\nTRANSFORMED", content),
    ));

    let (document, stats) = generate(options).await.expect("generation");

    assert_eq!(stats.total_pages, 1);
    assert!(document.contains("TRANSFORMED"));
    assert!(!document.contains("Secret"));
}

#[tokio::test]
async fn test_excluded_seed_is_never_fetched_when_following_links() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_sitemap(&server, &[("/docs", None), ("/private", None)]).await;
    mount_page(&server, "/", "Home", &format!("<p>{}</p>", FILLER)).await;
    mount_page(&server, "/docs", "Docs", &format!("<p>{}</p>", FILLER)).await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html_page("Private", r#"<a href="/leak">Leak</a>"#))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = test_options(&base_url);
    options.recursive = true;
    options.max_depth = 1;
    options.exclude_patterns = vec!["/private".to_string()];

    let (document, stats) = generate(options).await.expect("generation");

    assert_eq!(stats.total_pages, 2);
    assert!(document.contains("[Docs]"));
    assert!(!document.contains("Private"));
}

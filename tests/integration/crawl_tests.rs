//! End-to-end crawl tests against wiremock servers
//!
//! The mock server listens on 127.0.0.1, so the domain gate falls back to
//! exact host comparison; links to other hosts are never fetched.

use site_scout::config::CrawlConfig;
use site_scout::crawler::parse_site_async;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Small budgets and no backoff so tests stay fast.
fn test_config() -> CrawlConfig {
    CrawlConfig {
        max_seconds: 15.0,
        max_depth: 2,
        max_pages: 50,
        max_concurrency: 2,
        request_timeout: 5.0,
        retry_total: 0,
        retry_backoff_factor: 0.0,
        ..CrawlConfig::default()
    }
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_response(body))
        .mount(server)
        .await;
}

async fn count_requests(server: &MockServer, page_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == page_path)
        .count()
}

#[tokio::test]
async fn test_single_page_with_mailto() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="mailto:info@A.test">x</a>"#).await;

    let result = parse_site_async(&format!("{}/", server.uri()), &test_config())
        .await
        .unwrap();

    assert_eq!(result.url, server.uri());
    assert_eq!(result.emails, vec!["info@a.test"]);
    assert!(result.phones.is_empty());
}

#[tokio::test]
async fn test_cloaked_email_in_text() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>contact us at info [at] a.test</p>").await;

    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();

    assert_eq!(result.emails, vec!["info@a.test"]);
}

#[tokio::test]
async fn test_joomla_cloaked_email_in_script() {
    let server = MockServer::start().await;
    let body = concat!(
        "<p>see below</p><script>",
        "var addy1234 = 'sales' + '&#64;';",
        "addy1234 = addy1234 + 'a' + '&#46;' + 'test';",
        "document.getElementById('cloak1234').innerHTML += addy1234;",
        "</script>"
    );
    mount_page(&server, "/", body).await;

    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();

    assert_eq!(result.emails, vec!["sales@a.test"]);
}

#[tokio::test]
async fn test_phone_in_tel_link() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="tel:+74951234567">c</a>"#).await;

    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();

    assert_eq!(result.phones, vec!["+74951234567"]);
    assert!(result.emails.is_empty());
}

#[tokio::test]
async fn test_local_phone_needs_region_hint() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>(495) 123-45-67</p>").await;

    // Without a region hint the local number is ambiguous and dropped
    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();
    assert!(result.phones.is_empty());

    let config = CrawlConfig {
        phone_regions: vec!["RU".to_string()],
        ..test_config()
    };
    let result = parse_site_async(&server.uri(), &config).await.unwrap();
    assert_eq!(result.phones, vec!["+74951234567"]);
}

#[tokio::test]
async fn test_off_domain_link_ignored() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="http://b.invalid/contact">other site</a>"#,
    )
    .await;

    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();

    assert!(result.emails.is_empty());
    // Only the start page was fetched; the off-domain link never was
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_depth_and_dedup_on_cycle() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<p>root@a.test</p><a href="/about">about</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/about",
        r#"<p>about@a.test</p><a href="/">home</a>"#,
    )
    .await;

    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();

    assert_eq!(result.emails, vec!["about@a.test", "root@a.test"]);
    // The cycle back to / must not refetch it
    assert_eq!(count_requests(&server, "/").await, 1);
    assert_eq!(count_requests(&server, "/about").await, 1);
}

#[tokio::test]
async fn test_email_domain_allowlist() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>x@a.test y@evil.test</p>").await;

    let config = CrawlConfig {
        email_domain_allowlist: vec!["a.test".to_string()],
        ..test_config()
    };
    let result = parse_site_async(&server.uri(), &config).await.unwrap();

    assert_eq!(result.emails, vec!["x@a.test"]);
}

#[tokio::test]
async fn test_time_budget_with_stalling_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            html_response("<p>late@a.test</p>")
                .set_delay(std::time::Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let config = CrawlConfig {
        max_seconds: 0.1,
        request_timeout: 1.0,
        ..test_config()
    };

    let started = std::time::Instant::now();
    let result = parse_site_async(&server.uri(), &config).await.unwrap();
    let elapsed = started.elapsed();

    assert!(result.emails.is_empty());
    assert!(
        elapsed < std::time::Duration::from_secs(3),
        "engine took {elapsed:?} despite a 0.1s budget"
    );
}

#[tokio::test]
async fn test_depth_zero_page_budget_one() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/one">1</a><a href="/two">2</a>"#,
    )
    .await;

    let config = CrawlConfig {
        max_depth: 0,
        max_pages: 1,
        ..test_config()
    };
    parse_site_async(&server.uri(), &config).await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_in_scope_redirect_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/contact"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/contact", "<p>moved@a.test</p>").await;

    let result = parse_site_async(&format!("{}/old", server.uri()), &test_config())
        .await
        .unwrap();

    assert_eq!(result.url, server.uri());
    assert_eq!(result.emails, vec!["moved@a.test"]);
}

#[tokio::test]
async fn test_out_of_scope_redirect_absorbed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://b.invalid/"),
        )
        .mount(&server)
        .await;

    let result = parse_site_async(&server.uri(), &test_config())
        .await
        .unwrap();

    assert_eq!(result.url, server.uri());
    assert!(result.emails.is_empty());
    assert!(result.phones.is_empty());
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>back@a.test</p>").await;

    let config = CrawlConfig {
        retry_total: 2,
        ..test_config()
    };
    let result = parse_site_async(&server.uri(), &config).await.unwrap();

    assert_eq!(result.emails, vec!["back@a.test"]);
    assert_eq!(count_requests(&server, "/").await, 2);
}

#[tokio::test]
async fn test_non_html_counts_toward_budget_but_yields_nothing() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/report.pdf">report</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hidden@a.test")
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let config = CrawlConfig {
        max_depth: 1,
        max_pages: 2,
        ..test_config()
    };
    let result = parse_site_async(&server.uri(), &config).await.unwrap();

    assert!(result.emails.is_empty());
    assert_eq!(count_requests(&server, "/report.pdf").await, 1);
}

#[tokio::test]
async fn test_focused_crawl_prefers_contact_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/blog/post">post</a><a href="/contact">reach us</a>"#,
    )
    .await;
    mount_page(&server, "/contact", "<p>contact@a.test</p>").await;
    mount_page(&server, "/blog/post", "<p>blog@a.test</p>").await;

    // Budget for the start page plus exactly one link; the contact page
    // must win the frontier
    let config = CrawlConfig {
        max_depth: 1,
        max_pages: 2,
        max_concurrency: 1,
        ..test_config()
    };
    let result = parse_site_async(&server.uri(), &config).await.unwrap();

    assert_eq!(result.emails, vec!["contact@a.test"]);
}

#[tokio::test]
async fn test_body_cap_truncates_silently() {
    let server = MockServer::start().await;
    let mut body = String::from("<p>first@a.test</p>");
    body.push_str(&"x".repeat(4096));
    body.push_str("<p>second@a.test</p>");
    mount_page(&server, "/", &body).await;

    let config = CrawlConfig {
        max_body_bytes: 256,
        ..test_config()
    };
    let result = parse_site_async(&server.uri(), &config).await.unwrap();

    // Extraction proceeds on the truncated prefix
    assert_eq!(result.emails, vec!["first@a.test"]);
}

#[tokio::test]
async fn test_deterministic_given_identical_responses() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<p>b@a.test a@a.test +7 495 123-45-67</p>
           <a href="/one">1</a><a href="/two">2</a>"#,
    )
    .await;
    mount_page(&server, "/one", "<p>one@a.test</p>").await;
    mount_page(&server, "/two", "<p>two@a.test</p>").await;

    let config = CrawlConfig {
        max_concurrency: 1,
        ..test_config()
    };
    let first = parse_site_async(&server.uri(), &config).await.unwrap();
    let second = parse_site_async(&server.uri(), &config).await.unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    // Sorted ascending and unique
    let mut sorted = first.emails.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(first.emails, sorted);
}

#[tokio::test]
async fn test_max_links_per_page_cap() {
    let server = MockServer::start().await;
    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{i}">l</a>"#))
        .collect();
    mount_page(&server, "/", &links).await;
    for i in 0..20 {
        mount_page(&server, &format!("/p{i}"), "<p>nothing here</p>").await;
    }

    let config = CrawlConfig {
        max_depth: 1,
        max_links_per_page: 5,
        ..test_config()
    };
    parse_site_async(&server.uri(), &config).await.unwrap();

    // Start page plus at most five links
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing site and run the
//! full search → listings → export cycle end-to-end.

use listing_harvest::config::{validate, Config};
use listing_harvest::crawler::{harvest, shutdown_channel, Coordinator, ShutdownSignal};
use listing_harvest::output::{read_csv, read_json, ExportFormat};
use listing_harvest::state::{CrawlPhase, FailureKind, StopReason};
use listing_harvest::{FetchError, HarvestError, SearchQuery};
use std::path::Path;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server, with no pacing
fn create_test_config(base_url: &str, out_dir: &Path) -> Config {
    let mut config = Config::default();
    config.search.base_url = base_url.to_string();
    config.crawler.max_pages = 10;
    config.crawler.min_delay_ms = 0;
    config.crawler.max_delay_ms = 0;
    config.crawler.max_retries = 2;
    config.crawler.backoff_base_ms = 0;
    config.crawler.backoff_max_ms = 0;
    config.crawler.blocked_delay_ms = 0;
    config.crawler.request_timeout_secs = 5;
    config.output.directory = out_dir.display().to_string();
    config.output.prefix = "lamps".to_string();
    config.output.formats = vec![ExportFormat::Csv, ExportFormat::Json];
    config
}

fn query(max_pages: u32) -> SearchQuery {
    SearchQuery::new("desk lamp", max_pages).unwrap()
}

/// A results page with one card per id and an optional link to page `next`
fn search_page_html(ids: impl IntoIterator<Item = u32>, next: Option<u32>) -> String {
    let mut html = String::from("<html><head><title>desk lamp | eBay</title></head><body><ul class=\"srp-results\">\n");
    for id in ids {
        html.push_str(&format!(
            r#"<li class="s-item"><a class="s-item__link" href="/itm/Desk-Lamp-{id}/{id}?hash=item{id}"><div class="s-item__title">Desk Lamp #{id}</div></a><span class="s-item__price">$1{id}.50</span></li>
"#,
            id = id
        ));
    }
    html.push_str("</ul>\n");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<a class="pagination__next" href="/sch/i.html?_nkw=desk+lamp&amp;_pgn={}">Next</a>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

fn listing_html(id: u32, with_quantity_sold: bool) -> String {
    let sold = if with_quantity_sold {
        format!(r#"<div class="quantity-sold">{} sold</div>"#, id * 2)
    } else {
        String::new()
    };
    format!(
        r#"<html><head><title>Desk Lamp #{id} | eBay</title></head><body>
<h1 class="x-item-title__mainTitle"><span>Desk Lamp #{id}</span></h1>
<div class="x-price-primary"><span>US $1{id}.50</span></div>
<div class="x-item-condition-text"><span class="ux-textspans">Used</span></div>
{sold}
<div class="ux-image-carousel-item"><img src="https://i.ebayimg.com/images/g/{id}/s-l1600.jpg"></div>
<div class="ux-layout-section-evo"><div class="ux-labels-values">
  <div class="ux-labels-values__labels">Brand</div><div class="ux-labels-values__values">Acme</div>
</div></div>
<div class="x-item-description">A sturdy lamp.</div>
</body></html>"#,
        id = id,
        sold = sold
    )
}

async fn mount_search_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_pgn", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body).insert_header("content-type", "text/html"))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, id: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/itm/{}", id)))
        .respond_with(response)
        .mount(server)
        .await;
}

fn listing_ok(id: u32) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(listing_html(id, true))
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_three_pages_with_one_blocked_listing() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html(1..=10, Some(2))).await;
    mount_search_page(&server, 2, search_page_html(11..=20, Some(3))).await;
    mount_search_page(&server, 3, search_page_html(21..=30, None)).await;
    for id in 1..=30 {
        if id == 15 {
            mount_listing(&server, id, ResponseTemplate::new(429)).await;
        } else {
            mount_listing(&server, id, listing_ok(id)).await;
        }
    }

    let config = create_test_config(&server.uri(), out.path());
    validate(&config).unwrap();

    let summary = harvest(&config, query(10), ShutdownSignal::never())
        .await
        .expect("harvest should succeed");

    assert_eq!(summary.search_pages_visited, 3);
    assert_eq!(summary.listings_attempted, 30);
    assert_eq!(summary.listings_succeeded, 29);
    assert_eq!(summary.listings_failed(), 1);
    assert_eq!(summary.failures.get(&FailureKind::Blocked), Some(&1));
    assert_eq!(summary.total_failures(), 1);
    assert_eq!(summary.stop_reason, StopReason::EndOfResults);
    assert!(!summary.interrupted);
    assert_eq!(summary.files_written.len(), 2);

    let json = std::fs::File::open(out.path().join("lamps.json")).unwrap();
    let records = read_json(json).unwrap();
    assert_eq!(records.len(), 29);
    assert!(records.iter().all(|r| r.item_id != "15"));

    // Crawl order is preserved
    let ids: Vec<u32> = records.iter().map(|r| r.item_id.parse().unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    let first = &records[0];
    assert_eq!(first.url, format!("{}/itm/1", server.uri()));
    assert_eq!(first.title, "Desk Lamp #1");
    assert_eq!(first.price.as_ref().map(|p| p.amount), Some(11.5));
    assert_eq!(first.price.as_ref().map(|p| p.currency.as_str()), Some("USD"));
    assert_eq!(first.condition.as_deref(), Some("Used"));
    assert_eq!(first.quantity_sold, Some(2));
    assert_eq!(first.image_urls, vec!["https://i.ebayimg.com/images/g/1/s-l1600.jpg"]);
    assert_eq!(first.item_specifics.get("Brand").map(String::as_str), Some("Acme"));

    let csv = std::fs::File::open(out.path().join("lamps.csv")).unwrap();
    assert_eq!(read_csv(csv).unwrap().len(), 29);
}

#[tokio::test]
async fn test_missing_quantity_sold_keeps_record() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1, 2], None)).await;
    mount_listing(&server, 1, listing_ok(1)).await;
    mount_listing(
        &server,
        2,
        ResponseTemplate::new(200).set_body_string(listing_html(2, false)),
    )
    .await;

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].quantity_sold, Some(2));
    assert_eq!(outcome.records[1].quantity_sold, None);
    assert_eq!(outcome.records[1].title, "Desk Lamp #2");
    assert_eq!(outcome.state.total_failures(), 0);
    assert_eq!(coordinator.phase(), CrawlPhase::Done);
}

#[tokio::test]
async fn test_first_page_unreachable_is_fatal() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), out.path());
    let err = harvest(&config, query(3), ShutdownSignal::never())
        .await
        .unwrap_err();

    match err {
        HarvestError::FirstPageUnreachable { source, .. } => {
            assert!(matches!(
                source,
                FetchError::HttpStatus {
                    status: 500,
                    attempts: 3,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {}", other),
    }

    // Nothing is exported when the run never started
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_later_search_page_failure_keeps_partial_results() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html(1..=3, Some(2))).await;
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_pgn", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    for id in 1..=3 {
        mount_listing(&server, id, listing_ok(id)).await;
    }

    let config = create_test_config(&server.uri(), out.path());
    let summary = harvest(&config, query(5), ShutdownSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::SearchPageFailed);
    assert_eq!(summary.listings_succeeded, 3);
    assert_eq!(summary.failures.get(&FailureKind::HttpStatus), Some(&1));

    let json = std::fs::File::open(out.path().join("lamps.json")).unwrap();
    assert_eq!(read_json(json).unwrap().len(), 3);
}

#[tokio::test]
async fn test_page_limit_stops_pagination() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1], Some(2))).await;
    mount_search_page(&server, 2, search_page_html([2], Some(3))).await;
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_pgn", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page_html([3], None)))
        .expect(0)
        .mount(&server)
        .await;
    for id in 1..=3 {
        mount_listing(&server, id, listing_ok(id)).await;
    }

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(2)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::PageLimit);
    assert_eq!(outcome.state.search_pages_visited, 2);
    assert_eq!(outcome.records.len(), 2);
}

#[tokio::test]
async fn test_listing_limit_stops_crawl() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html(1..=5, Some(2))).await;
    for id in 1..=5 {
        mount_listing(&server, id, listing_ok(id)).await;
    }

    let mut config = create_test_config(&server.uri(), out.path());
    config.crawler.max_listings = Some(3);

    let mut coordinator = Coordinator::new(config, query(5)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ListingLimit);
    assert_eq!(outcome.state.listings_attempted, 3);
    assert_eq!(outcome.records.len(), 3);
}

#[tokio::test]
async fn test_pagination_loop_and_repeated_listings() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    // Page 2 repeats listing 2; page 3 links back to page 2
    mount_search_page(&server, 1, search_page_html([1, 2], Some(2))).await;
    mount_search_page(&server, 2, search_page_html([2, 3], Some(3))).await;
    mount_search_page(&server, 3, search_page_html([3], Some(2))).await;
    for id in 1..=3 {
        mount_listing(&server, id, listing_ok(id)).await;
    }

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(10)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::PaginationLoop);
    assert_eq!(outcome.state.search_pages_visited, 3);
    assert_eq!(outcome.state.listings_attempted, 3);
    let ids: Vec<&str> = outcome.records.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1], None)).await;
    // First request gets a 503, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/itm/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing(&server, 1, listing_ok(1)).await;

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.state.listings_succeeded, 1);
    assert_eq!(outcome.state.total_failures(), 0);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1, 2], None)).await;
    Mock::given(method("GET"))
        .and(path("/itm/1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 2, listing_ok(2)).await;

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.state.failures_of(FailureKind::HttpStatus), 1);
}

#[tokio::test]
async fn test_unparseable_listings_are_counted_by_kind() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1, 2, 3], None)).await;
    mount_listing(&server, 1, ResponseTemplate::new(200).set_body_string("")).await;
    mount_listing(
        &server,
        2,
        ResponseTemplate::new(200).set_body_string("<html><body><p>No title here</p></body></html>"),
    )
    .await;
    mount_listing(&server, 3, listing_ok(3)).await;

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.state.listings_attempted, 3);
    assert_eq!(outcome.state.failures_of(FailureKind::EmptyBody), 1);
    assert_eq!(outcome.state.failures_of(FailureKind::MissingRequiredField), 1);
}

#[tokio::test]
async fn test_challenge_page_counts_as_blocked() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1], None)).await;
    mount_listing(
        &server,
        1,
        ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Pardon Our Interruption...</title></head><body>Please verify</body></html>",
        ),
    )
    .await;

    let config = create_test_config(&server.uri(), out.path());
    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.state.failures_of(FailureKind::Blocked), 1);
}

#[tokio::test]
async fn test_robots_disallowed_listing_is_skipped() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /itm/2\n"))
        .mount(&server)
        .await;
    mount_search_page(&server, 1, search_page_html([1, 2], None)).await;
    mount_listing(&server, 1, listing_ok(1)).await;
    Mock::given(method("GET"))
        .and(path("/itm/2"))
        .respond_with(listing_ok(2))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), out.path());
    config.crawler.respect_robots_txt = true;

    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.state.listings_attempted, 2);
    assert_eq!(outcome.state.failures_of(FailureKind::Disallowed), 1);
}

#[tokio::test]
async fn test_robots_disallowed_search_is_fatal() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /sch/\n"))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), out.path());
    config.crawler.respect_robots_txt = true;

    let mut coordinator = Coordinator::new(config, query(1)).unwrap();
    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::FirstPageUnreachable {
            source: FetchError::Disallowed { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_interrupt_exports_partial_results() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html(1..=3, None)).await;
    mount_listing(&server, 1, listing_ok(1)).await;
    mount_listing(&server, 2, listing_ok(2).set_delay(Duration::from_secs(30))).await;
    mount_listing(&server, 3, listing_ok(3)).await;

    let mut config = create_test_config(&server.uri(), out.path());
    config.crawler.request_timeout_secs = 60;

    let (trigger, signal) = shutdown_channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.trigger();
    });

    let started = Instant::now();
    let summary = harvest(&config, query(1), signal).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(summary.interrupted);
    assert_eq!(summary.stop_reason, StopReason::Interrupted);
    assert_eq!(summary.listings_succeeded, 1);

    let json = std::fs::File::open(out.path().join("lamps.json")).unwrap();
    let records = read_json(json).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].item_id, "1");
}

#[tokio::test]
async fn test_harvest_writes_summary_report() {
    let server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();

    mount_search_page(&server, 1, search_page_html([1, 2], None)).await;
    mount_listing(&server, 1, listing_ok(1)).await;
    mount_listing(&server, 2, listing_ok(2)).await;

    let mut config = create_test_config(&server.uri(), out.path());
    config.output.formats = vec![ExportFormat::Xlsx];
    config.output.summary_report = true;

    let summary = harvest(&config, query(1), ShutdownSignal::never())
        .await
        .unwrap();

    let report = out.path().join("lamps_summary.md");
    assert_eq!(summary.report_path.as_deref(), Some(report.as_path()));
    let markdown = std::fs::read_to_string(&report).unwrap();
    assert!(markdown.contains("- **Listings Succeeded**: 2"));
    assert!(markdown.contains("| Used | 2 |"));
    assert!(out.path().join("lamps.xlsx").exists());
}

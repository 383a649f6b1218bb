//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the listing site and run the
//! full discovery + detail cycle end-to-end against it.

use bizcrawl::config::{Config, JitterWindow};
use bizcrawl::crawler::Coordinator;
use bizcrawl::model::{BusinessRecord, BusinessStub, ScrapedBusiness};
use bizcrawl::storage::{read_ndjson, Checkpoint, NdjsonSink, RecordSink};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server with every delay zeroed
fn create_test_config(origin: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.origin = origin.to_string();
    config.search.batch_size = 2;
    config.crawler.concurrency = 3;
    config.crawler.max_attempts = 2;
    config.crawler.request_timeout_secs = 5;
    config.crawler.retry_backoff = JitterWindow::zero();
    config.crawler.search_start_delay = JitterWindow::zero();
    config.crawler.snippet_delay = JitterWindow::zero();
    config.crawler.detail_delay = JitterWindow::zero();
    config.output.checkpoint_path = dir.join("businesses.ndjson");
    config.output.output_path = dir.join("results.ndjson");
    config
}

fn search_entry(id: &str, ranking: u32, is_ad: bool) -> String {
    format!(
        r#"{{"bizId": "{id}", "searchResultBusiness": {{"ranking": {ranking}, "isAd": {is_ad}, "name": "Business {id}", "rating": 4.5, "businessUrl": "/biz/{id}?osq=Restaurants"}}}}"#
    )
}

fn snippet(entries: &[String]) -> String {
    format!(
        r#"{{"searchPageProps": {{"mainContentComponentsListProps": [{}]}}}}"#,
        entries.join(", ")
    )
}

const END_OF_RESULTS: &str = r#"{"searchPageProps": {"errorType": "excessivePaging"}}"#;

fn detail_page(name: &str) -> String {
    format!(
        r#"<html><head><title>{name}</title></head><body>
        <div data-testid="photoHeader"><h1>{name}</h1>
          <span data-testid="BizHeaderCategory"><a>Diners</a></span><span>$$</span></div>
        <section>
          <div><p>Phone number</p><p>(702) 555-0101</p></div>
          <div><span><a href="/inspections">Health Score</a></span><span>A</span></div>
        </section>
        <table class="hours-table__09f24__KR8wh"><thead><tr><th></th><th></th></tr></thead>
          <tbody><tr><th><p>Mon</p></th><td><p>Closed</p></td></tr></tbody></table>
        </body></html>"#
    )
}

async fn mount_warm_up(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Search</body></html>"))
        .mount(server)
        .await;
}

async fn mount_snippet(server: &MockServer, start: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/search/snippet"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_any_business(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+/props$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"bizDetailsPageProps": {"businessHighlights": [{"title": "Family owned"}]}}"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Test Business")))
        .mount(server)
        .await;
}

fn stub(origin: &str, id: &str, ranking: u32) -> BusinessStub {
    BusinessStub {
        biz_id: id.to_string(),
        ranking,
        name: format!("Business {}", id),
        business_url: format!("{}/biz/{}", origin, id),
    }
}

fn output_ids(path: &Path) -> Vec<String> {
    read_ndjson::<Value>(path)
        .expect("Failed to read output")
        .iter()
        .map(|line| line["bizId"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_harvest() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_warm_up(&mock_server).await;

    // Round 1: offsets 0 and 10; round 2: offsets 20 and 30, both past the end
    mount_snippet(
        &mock_server,
        "0",
        snippet(&[
            search_entry("ad-1", 1, true),
            search_entry("aaa", 1, false),
            search_entry("bbb", 2, false),
        ]),
        1,
    )
    .await;
    mount_snippet(&mock_server, "10", snippet(&[search_entry("ccc", 11, false)]), 1).await;
    mount_snippet(&mock_server, "20", END_OF_RESULTS.to_string(), 1).await;
    mount_snippet(&mock_server, "30", END_OF_RESULTS.to_string(), 1).await;

    // Auxiliary documents must be requested as XHR
    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+/props$"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"bizDetailsPageProps": {"businessHighlights": [{"title": "Family owned"}]}}"#,
        ))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Test Business")))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path());
    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("Harvest failed");

    let discovery = report.discovery.expect("Discovery should have run");
    assert_eq!(discovery.rounds, 2);
    assert_eq!(discovery.businesses, 3);
    assert!(discovery.reached_end);
    assert_eq!(report.succeeded, 3);
    assert!(report.failed.is_empty());

    // Sponsored entry dropped, URLs absolute and query-free
    let stubs = Checkpoint::load(&config.output.checkpoint_path).unwrap();
    let ids: HashSet<&str> = stubs.iter().map(|s| s.biz_id.as_str()).collect();
    assert_eq!(ids, ["aaa", "bbb", "ccc"].into_iter().collect());
    for stub in &stubs {
        assert_eq!(stub.business_url, format!("{}/biz/{}", base_url, stub.biz_id));
    }

    let lines = read_ndjson::<Value>(&config.output.output_path).unwrap();
    assert_eq!(lines.len(), 3);
    let first = lines
        .iter()
        .find(|line| line["bizId"] == "aaa")
        .expect("aaa should be in the output");
    assert_eq!(first["ranking"], 1);
    assert_eq!(first["name"], "Test Business");
    assert_eq!(first["phone_number"], "(702) 555-0101");
    assert_eq!(first["health_score"], "A");
    assert_eq!(first["price"], "$$");
    assert_eq!(first["website"], Value::Null);
    assert_eq!(first["food_category"][0], "Diners");
    assert_eq!(first["open_hours"][0]["weekday"], "Mon");
    assert_eq!(first["open_hours"][0]["open_hours"], "Closed");
    assert_eq!(first["highlights"][0], "Family owned");
}

#[tokio::test]
async fn test_end_of_results_finishes_the_round() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_warm_up(&mock_server).await;
    mount_any_business(&mock_server).await;

    mount_snippet(&mock_server, "0", snippet(&[search_entry("first", 1, false)]), 1).await;
    mount_snippet(&mock_server, "10", END_OF_RESULTS.to_string(), 1).await;
    mount_snippet(&mock_server, "20", snippet(&[search_entry("third", 21, false)]), 1).await;
    // The next round must never start
    mount_snippet(&mock_server, "30", END_OF_RESULTS.to_string(), 0).await;

    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.search.batch_size = 3;

    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("Harvest failed");

    let discovery = report.discovery.expect("Discovery should have run");
    assert_eq!(discovery.rounds, 1);
    assert_eq!(discovery.pages_fetched, 2);

    let stubs = Checkpoint::load(&config.output.checkpoint_path).unwrap();
    let ids: HashSet<String> = stubs.into_iter().map(|s| s.biz_id).collect();
    assert_eq!(ids, ["first", "third"].iter().map(|s| s.to_string()).collect());
}

#[tokio::test]
async fn test_resume_skips_scraped_businesses() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    // An interrupted run: four discovered, two already scraped
    let stubs: Vec<BusinessStub> = ["a", "b", "c", "d"]
        .iter()
        .enumerate()
        .map(|(i, id)| stub(&base_url, id, i as u32 + 1))
        .collect();
    Checkpoint::open(&config.output.checkpoint_path)
        .unwrap()
        .record(&stubs)
        .unwrap();
    {
        let sink = NdjsonSink::open(&config.output.output_path).unwrap();
        for done in &stubs[..2] {
            sink.append(&ScrapedBusiness::new(done, BusinessRecord::named(&done.name)))
                .unwrap();
        }
    }

    Mock::given(method("GET"))
        .and(path_regex(r"^/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;
    for (id, expected) in [("a", 0), ("b", 0), ("c", 1), ("d", 1)] {
        Mock::given(method("GET"))
            .and(path(format!("/biz/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(id)))
            .expect(expected)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+/props$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("Harvest failed");

    assert!(report.discovery.is_none());
    assert_eq!(report.candidates, 4);
    assert_eq!(report.already_scraped, 2);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 2);

    let mut ids = output_ids(&config.output.output_path);
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_detail_concurrency_is_bounded() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    let stubs: Vec<BusinessStub> = (0..12)
        .map(|i| stub(&base_url, &format!("biz-{}", i), i + 1))
        .collect();
    Checkpoint::open(&config.output.checkpoint_path)
        .unwrap()
        .record(&stubs)
        .unwrap();

    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_page("Slow Business"))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+/props$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("Harvest failed");

    assert_eq!(report.succeeded, 12);
    assert_eq!(
        report.peak_in_flight, config.crawler.concurrency as usize,
        "the pool should saturate its bound without exceeding it"
    );
}

#[tokio::test]
async fn test_challenged_business_is_retried_then_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    Checkpoint::open(&config.output.checkpoint_path)
        .unwrap()
        .record(&[stub(&base_url, "blocked", 1), stub(&base_url, "open", 2)])
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/biz/blocked"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            r#"<html><body><script src="https://ct.captcha-delivery.com/i.js"></script></body></html>"#,
        ))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/biz/open"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Open Business")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/biz/[^/]+/props$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("A blocked business must not fail the run");

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, vec!["blocked".to_string()]);
    assert_eq!(output_ids(&config.output.output_path), vec!["open"]);
}

#[tokio::test]
async fn test_failed_search_page_does_not_stop_discovery() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_warm_up(&mock_server).await;
    mount_any_business(&mock_server).await;

    // Round 1: the middle page never loads and exhausts both attempts
    mount_snippet(&mock_server, "0", snippet(&[search_entry("left", 1, false)]), 1).await;
    mount_snippet(&mock_server, "10", "<html>oops</html>".to_string(), 2).await;
    mount_snippet(&mock_server, "20", snippet(&[search_entry("right", 21, false)]), 1).await;
    // Round 2 still runs
    for start in ["30", "40", "50"] {
        mount_snippet(&mock_server, start, END_OF_RESULTS.to_string(), 1).await;
    }

    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.search.batch_size = 3;

    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("A failed search page must not fail the run");

    let discovery = report.discovery.expect("Discovery should have run");
    assert_eq!(discovery.rounds, 2);
    assert_eq!(discovery.pages_fetched, 2);
    assert_eq!(discovery.pages_failed, 1);
    assert!(discovery.reached_end);
    assert_eq!(report.succeeded, 2);

    let mut ids = output_ids(&config.output.output_path);
    ids.sort();
    assert_eq!(ids, vec!["left", "right"]);
}

#[tokio::test]
async fn test_backoff_releases_the_detail_slot() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.concurrency = 1;
    config.crawler.retry_backoff = JitterWindow::from_millis(1_000, 1_000);

    Checkpoint::open(&config.output.checkpoint_path)
        .unwrap()
        .record(&[stub(&base_url, "blocked", 1), stub(&base_url, "open", 2)])
        .unwrap();

    // A reused session would send the cookie set by the previous attempt
    Mock::given(method("GET"))
        .and(path("/biz/blocked"))
        .and(header_exists("cookie"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/biz/blocked"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("set-cookie", "session=blocked; Path=/")
                .set_body_string(
                    r#"<html><body><script src="https://ct.captcha-delivery.com/i.js"></script></body></html>"#,
                ),
        )
        .expect(2)
        .mount(&mock_server)
        .await;
    // Within one attempt the auxiliary request shares the page's session
    Mock::given(method("GET"))
        .and(path("/biz/blocked/props"))
        .and(header_exists("cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/biz/open"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Open Business")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/biz/open/props"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let report = Coordinator::new(config.clone(), Vec::new())
        .run()
        .await
        .expect("Harvest failed");

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, vec!["blocked".to_string()]);
    assert_eq!(report.peak_in_flight, 1);

    // With a single slot, "open" can only run while "blocked" backs off
    let paths: Vec<String> = mock_server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    let page_requests: Vec<&str> = paths
        .iter()
        .map(String::as_str)
        .filter(|p| !p.ends_with("/props"))
        .collect();
    assert_eq!(page_requests, vec!["/biz/blocked", "/biz/open", "/biz/blocked"]);
}

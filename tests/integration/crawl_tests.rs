//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock marketplace servers and run link
//! collection and listing scraping end-to-end over HTTP.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use sumi_sieve::config::Config;
use sumi_sieve::crawler::{
    build_http_client, Coordinator, CrawlContext, HttpFetcher, LinkOverrides, PageFetcher,
    PlanBasis, ProgressEvent, ProgressSink,
};
use sumi_sieve::{FetchError, PageOutcome, SieveError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server's host
fn create_test_config() -> Config {
    let mut config = Config::builtin().expect("built-in config");
    config.marketplace.domain = "127.0.0.1".to_string();
    config.crawler.request_delay_ms = 0;
    config.crawler.jitter_ms = 0;
    config.crawler.request_timeout_secs = 1;
    config
}

/// A search results page with one anchor per listing id
fn search_page(ids: std::ops::Range<u64>, extra: &str) -> String {
    let anchors: String = ids
        .map(|id| {
            format!(
                r#"<li><a href="/autos-e-pecas/carro-{}">Carro {}</a></li>"#,
                10_000_000_000u64 + id,
                id
            )
        })
        .collect();
    format!(
        "<html><head><title>Carros</title></head><body>{}<ul>{}</ul></body></html>",
        extra, anchors
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts result page `page` (2 and up) of `/autos`
async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/autos"))
        .and(query_param("o", page.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts the first result page; must be mounted after the numbered pages
async fn mount_first_page(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/autos"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<ProgressEvent>>);

impl ProgressSink for RecordingSink {
    fn on_page(&self, event: &ProgressEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_collects_all_pages_from_estimated_total() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 2, html(search_page(50..100, ""))).await;
    mount_page(&mock_server, 3, html(search_page(100..120, ""))).await;
    mount_first_page(
        &mock_server,
        html(search_page(0..50, "<h2>120 resultados</h2>")),
    )
    .await;

    let sink = Arc::new(RecordingSink::default());
    let coordinator = Coordinator::new(create_test_config())
        .unwrap()
        .with_context(CrawlContext::new(tracing::info_span!("test"), sink.clone()));

    let start = format!("{}/autos", mock_server.uri());
    let report = coordinator
        .collect_links(&start, LinkOverrides::default())
        .await
        .unwrap();

    assert_eq!(report.estimate.count, 120);
    assert_eq!(report.basis, PlanBasis::Estimated { total: 120 });
    assert_eq!(report.state.count(), 120);
    assert_eq!(report.pages_fetched(), 3);
    assert_eq!(report.pages_failed(), 0);
    assert_eq!(report.outcomes[&3], PageOutcome::Extracted(20));

    let links = report.links();
    assert!(links.windows(2).all(|w| w[0] < w[1]));
    assert!(links
        .iter()
        .all(|l| l.starts_with(&format!("{}/autos-e-pecas/carro-", mock_server.uri()))));

    let events = sink.0.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events.iter().map(|e| e.new_keys).sum::<usize>(), 120);
    assert_eq!(
        events.iter().map(|e| e.pages_done).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(events.iter().all(|e| e.pages_total == 3));
    assert_eq!(events.last().unwrap().total_keys, 120);
}

#[tokio::test]
async fn test_overlapping_pages_are_deduplicated() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 2, html(search_page(40..90, ""))).await;
    mount_first_page(
        &mock_server,
        html(search_page(0..50, "<p>100 anúncios</p>")),
    )
    .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let start = format!("{}/autos", mock_server.uri());
    let report = coordinator
        .collect_links(&start, LinkOverrides::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.state.count(), 90);
    let unique: HashSet<&str> = report.links().into_iter().collect();
    assert_eq!(unique.len(), 90);
    assert_eq!(report.statistics().items_found, 100);
}

#[tokio::test]
async fn test_incremental_pagination_stops_on_empty_page() {
    let mock_server = MockServer::start().await;
    let next = r#"<nav><a href="/autos?o=2">Próxima página</a></nav>"#;

    mount_page(&mock_server, 2, html(search_page(5..8, next))).await;
    mount_page(&mock_server, 3, html(search_page(0..0, next))).await;
    Mock::given(method("GET"))
        .and(path("/autos"))
        .and(query_param("o", "4"))
        .respond_with(html(search_page(8..20, next)))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_first_page(&mock_server, html(search_page(0..5, next))).await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let start = format!("{}/autos", mock_server.uri());
    let report = coordinator
        .collect_links(&start, LinkOverrides::default())
        .await
        .unwrap();

    assert!(!report.estimate.is_known());
    assert_eq!(report.basis, PlanBasis::Incremental);
    assert_eq!(report.state.count(), 8);
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.outcomes[&3], PageOutcome::Empty);
}

#[tokio::test]
async fn test_first_page_failure_aborts() {
    let mock_server = MockServer::start().await;

    mount_first_page(&mock_server, ResponseTemplate::new(503)).await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let start = format!("{}/autos", mock_server.uri());
    let err = coordinator
        .collect_links(&start, LinkOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SieveError::Fetch(FetchError::Status { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_later_page_failures_degrade() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 2, ResponseTemplate::new(500)).await;
    mount_page(
        &mock_server,
        3,
        html(search_page(100..150, "")).set_delay(std::time::Duration::from_secs(3)),
    )
    .await;
    mount_page(&mock_server, 4, html(search_page(150..200, ""))).await;
    mount_first_page(
        &mock_server,
        html(search_page(0..50, "<span>200 resultados</span>")),
    )
    .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let start = format!("{}/autos", mock_server.uri());
    let report = coordinator
        .collect_links(&start, LinkOverrides::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.outcomes[&2], PageOutcome::FetchFailed);
    assert_eq!(report.outcomes[&3], PageOutcome::TimedOut);
    assert_eq!(report.pages_failed(), 2);
    assert_eq!(report.state.count(), 100);
    assert_eq!(report.statistics().failed_pages, vec![2, 3]);
}

#[tokio::test]
async fn test_page_override_bounds_the_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 2, html(search_page(50..100, ""))).await;
    Mock::given(method("GET"))
        .and(path("/autos"))
        .and(query_param("o", "3"))
        .respond_with(html(search_page(100..150, "")))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_first_page(
        &mock_server,
        html(search_page(0..50, "<p>5000 resultados</p>")),
    )
    .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let start = format!("{}/autos", mock_server.uri());
    let report = coordinator
        .collect_links(&start, LinkOverrides { pages: Some(2) })
        .await
        .unwrap();

    assert_eq!(report.basis, PlanBasis::Override);
    assert_eq!(report.state.count(), 100);
}

#[tokio::test]
async fn test_listing_fields_fall_back_to_markup() {
    let mock_server = MockServer::start().await;

    let body = r#"<html><head><title>Uno | OLX</title></head><body>
        <div id="initial-data" data-json='{"ad": {"subject": '></div>
        <h1>Fiat Uno Mille 2010</h1>
        <h2 class="olx-text--title-large">R$ 18.500</h2>
        <span class="typo-body-large ad__sc-ypp2u2-4">João Pereira</span>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/autos-e-pecas/uno-1234567890"))
        .respond_with(html(body.to_string()))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let url = format!("{}/autos-e-pecas/uno-1234567890", mock_server.uri());
    let record = coordinator.scrape_listing(&url).await.unwrap();

    assert!(record.is_complete());
    let price = record.fields.get("price").unwrap();
    assert_eq!(price.value, "R$ 18.500");
    assert_eq!(price.source, "dom:price-heading");
    let model = record.fields.get("model").unwrap();
    assert_eq!(model.value, "Fiat Uno Mille");
    assert_eq!(model.source, "dom:h1");
    assert_eq!(record.fields.get("seller_name").unwrap().source, "dom:seller-name");
    assert_eq!(record.fields.get("listing_id").unwrap().source, "url:id");
    assert_eq!(
        record.short_link.as_deref(),
        Some("https://olx.com.br/vi/1234567890")
    );
}

#[tokio::test]
async fn test_listing_fields_prefer_embedded_data() {
    let mock_server = MockServer::start().await;

    let body = r#"<html><body>
        <div id="initial-data" data-json='{"ad": {
            "listId": 987654321,
            "subject": "Gol G5 2012",
            "priceValue": "R$ 29.900",
            "user": {"name": "Maria Souza"}
        }}'></div>
        <h1>Gol G5 2012</h1>
        <h2 class="olx-text--title-large">R$ 1</h2>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/autos-e-pecas/gol-987654321"))
        .respond_with(html(body.to_string()))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let url = format!("{}/autos-e-pecas/gol-987654321", mock_server.uri());
    let record = coordinator.scrape_listing(&url).await.unwrap();

    let price = record.fields.get("price").unwrap();
    assert_eq!(price.value, "R$ 29.900");
    assert_eq!(price.source, "json:priceValue");
    assert_eq!(record.fields.get("listing_id").unwrap().source, "json:listId");
    assert_eq!(record.fields.value("seller_name"), Some("Maria Souza"));
    assert!(record.fields.get("phone").is_none());
    assert!(record.missing_required.is_empty());
}

#[tokio::test]
async fn test_listing_missing_required_field_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/autos-e-pecas/moto-55555555"))
        .respond_with(html(
            "<html><body><h1>Honda CG 160</h1><h2 class=\"olx-text--title-large\">R$ 12.000</h2></body></html>"
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let url = format!("{}/autos-e-pecas/moto-55555555", mock_server.uri());
    let record = coordinator.scrape_listing(&url).await.unwrap();

    assert_eq!(record.missing_required, vec!["seller_name".to_string()]);
    assert_eq!(record.fields.value("model"), Some("Honda CG 160"));
}

#[tokio::test]
async fn test_batch_scrape_skips_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/autos-e-pecas/gol-11111111"))
        .respond_with(html(
            "<html><body><h1>Gol</h1><h2 class=\"olx-text--title-large\">R$ 20.000</h2></body></html>"
                .to_string(),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/autos-e-pecas/uno-22222222"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let urls = vec![
        format!("{}/autos-e-pecas/gol-11111111", mock_server.uri()),
        format!("{}/autos-e-pecas/uno-22222222", mock_server.uri()),
        "https://example.com/autos-e-pecas/gol-33333333".to_string(),
    ];
    let report = coordinator.scrape_listings(&urls).await;

    assert_eq!(report.state.count(), 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.outcomes[&1], PageOutcome::Extracted(1));
    assert_eq!(report.outcomes[&2], PageOutcome::FetchFailed);
}

#[tokio::test]
async fn test_foreign_start_url_is_rejected() {
    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let err = coordinator
        .collect_links("https://example.com/autos", LinkOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SieveError::Url(_)));
}

#[tokio::test]
async fn test_link_set_independent_of_concurrency() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        2,
        html(search_page(30..80, "")).set_delay(std::time::Duration::from_millis(300)),
    )
    .await;
    mount_page(&mock_server, 3, html(search_page(70..120, ""))).await;
    mount_page(&mock_server, 4, html(search_page(110..150, ""))).await;
    mount_first_page(
        &mock_server,
        html(search_page(0..50, "<p>200 resultados</p>")),
    )
    .await;

    let start = format!("{}/autos", mock_server.uri());
    let mut runs = Vec::new();
    for concurrency in [1, 8] {
        let mut config = create_test_config();
        config.crawler.concurrency = concurrency;
        let report = Coordinator::new(config)
            .unwrap()
            .collect_links(&start, LinkOverrides::default())
            .await
            .unwrap();
        assert_eq!(report.pages_fetched(), 4);
        runs.push(
            report
                .links()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<String>>(),
        );
    }

    assert_eq!(runs[0].len(), 150);
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_http_fetcher_with_custom_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/autos"))
        .respond_with(html("<html><body>ok</body></html>".to_string()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let config = create_test_config();
    let client = build_http_client(&config.fetch, std::time::Duration::from_secs(2)).unwrap();
    let fetcher = HttpFetcher::with_client(client);

    let page = fetcher
        .fetch(&format!("{}/autos", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("ok"));

    let err = fetcher
        .fetch(&format!("{}/gone", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 410, .. }));
}

use catsync_client::{HttpClient, ProductFilter, SourceApi, TargetApi};
use catsync_core::AppConfig;
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn test_config(server: &MockServer) -> AppConfig {
    AppConfig {
        source_base_url: server.uri(),
        target_base_url: server.uri(),
        target_api_key: Some("test-api-key-12345".to_owned()),
        accept_invalid_certs: false,
        request_timeout_secs: 5,
        user_agent: "catsync-test/0.1".to_owned(),
        default_currency: "USD".to_owned(),
        page_size: None,
        category: None,
        inventory_batch_size: 100,
        fetch_details: false,
        detail_concurrency: 2,
        log_level: "info".to_owned(),
    }
}

fn gateways(config: &AppConfig) -> (SourceApi, TargetApi) {
    let http = HttpClient::from_app_config(config).expect("client");
    let source = SourceApi::new(http.clone(), &config.source_base_url).expect("source");
    let target = crate::build_target(http, config).expect("target");
    (source, target)
}

fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

async fn run(config: &AppConfig, mode: SyncMode) -> RunReport {
    let (source, target) = gateways(config);
    run_sync(
        &source,
        &target,
        config,
        &ProductFilter::from_app_config(config),
        mode,
        started_at(),
    )
    .await
}

async fn mount_listing(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/source_api/products/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_inventory(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/source_api/inventory-status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_import(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/target_api/import/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"imported": true})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn sent_batch(server: &MockServer) -> serde_json::Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("an import request");
    serde_json::from_slice(&post.body).expect("json body")
}

#[tokio::test]
async fn empty_listing_never_calls_import() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([])).await;
    mount_import(&server, 200, 0).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;

    assert_eq!(report.fetched, 0);
    assert_eq!(report.submission, Submission::NothingToSubmit);
}

#[tokio::test]
async fn product_without_inventory_gets_zero_stock_and_batch_is_submitted() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([
            {"id": "A1", "name": "Widget", "price": "19.99"},
            {"id": "B2", "name": "Gadget", "price": 5}
        ]),
    )
    .await;
    mount_inventory(&server, json!({"A1": {"available": 5, "reserved": 1}})).await;
    mount_import(&server, 200, 1).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.missing_inventory, 1);
    assert_eq!(
        report.submission,
        Submission::Accepted(json!({"imported": true}))
    );

    let sent = sent_batch(&server).await;
    assert_eq!(sent["products"][0]["productId"], "A1");
    assert_eq!(
        sent["products"][0]["inventory"],
        json!({"available": 5, "reserved": 1})
    );
    assert_eq!(
        sent["products"][1]["inventory"],
        json!({"available": 0, "reserved": 0})
    );
    assert_eq!(sent["products"][1]["lastUpdated"], "2024-06-01T00:00:00Z");
}

#[tokio::test]
async fn inventory_is_requested_for_listed_ids() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([
            {"id": "A1", "name": "Widget", "price": 1},
            {"id": 7, "name": "Numeric", "price": 2}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/source_api/inventory-status/"))
        .and(query_param("product_ids", "A1,7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    mount_import(&server, 200, 1).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;
    assert_eq!(report.normalized, 2);
}

#[tokio::test]
async fn listing_failure_stops_before_inventory_and_import() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/source_api/products/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/source_api/inventory-status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    mount_import(&server, 200, 0).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;
    assert_eq!(report.submission, Submission::ProductsUnavailable);
}

#[tokio::test]
async fn inventory_failure_aborts_batch() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([{"id": "A1", "name": "Widget", "price": 1}])).await;
    Mock::given(method("GET"))
        .and(path("/source_api/inventory-status/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_import(&server, 200, 0).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;
    assert_eq!(report.fetched, 1);
    assert_eq!(report.submission, Submission::InventoryUnavailable);
}

#[tokio::test]
async fn invalid_records_are_excluded_and_duplicates_dropped() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([
            {"id": "A1", "name": "Widget", "price": 1},
            {"id": "A1", "name": "Widget again", "price": 1},
            {"id": "C3", "price": 4},
            {"id": "D4", "name": "Negative", "price": -2}
        ]),
    )
    .await;
    mount_inventory(&server, json!([])).await;
    mount_import(&server, 200, 1).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;

    assert_eq!(report.fetched, 4);
    assert_eq!(report.rejected_records, 2);
    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.submitted, 1);
    assert_eq!(sent_batch(&server).await["products"][0]["name"], "Widget");
}

#[tokio::test]
async fn all_records_invalid_means_nothing_to_submit() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([{"id": "C3"}])).await;
    mount_inventory(&server, json!([])).await;
    mount_import(&server, 200, 0).await;

    let report = run(&test_config(&server), SyncMode::Submit).await;
    assert_eq!(report.rejected_records, 1);
    assert_eq!(report.submission, Submission::NothingToSubmit);
}

#[tokio::test]
async fn rejected_import_keeps_error_body() {
    let server = MockServer::start().await;
    let error_body = json!({"errors": [{"productId": "A1", "message": "bad"}]});
    mount_listing(&server, json!([{"id": "A1", "name": "Widget", "price": 1}])).await;
    mount_inventory(&server, json!([])).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
        .mount(&server)
        .await;

    let report = run(&test_config(&server), SyncMode::Submit).await;
    assert_eq!(report.submission, Submission::Rejected(error_body));
}

#[tokio::test]
async fn failed_import_is_reported() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([{"id": "A1", "name": "Widget", "price": 1}])).await;
    mount_inventory(&server, json!([])).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let report = run(&test_config(&server), SyncMode::Submit).await;
    assert_eq!(report.submission, Submission::Failed);
}

#[tokio::test]
async fn details_overlay_listing_and_failures_fall_back() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([
            {"id": "A1", "name": "Widget", "price": 1},
            {"id": "B2", "name": "Gadget", "price": 2, "description": "short"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/source_api/products/A1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "A1", "description": "Full widget description", "category": "Tools"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/source_api/products/B2/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_inventory(&server, json!([])).await;

    let mut config = test_config(&server);
    config.fetch_details = true;
    let report = run(&config, SyncMode::DryRun).await;

    assert_eq!(report.details_merged, 1);
    let Submission::DryRun(batch) = report.submission else {
        panic!("expected dry run, got: {:?}", report.submission);
    };
    let ids: Vec<_> = batch.products.iter().map(|p| p.product_id.as_str()).collect();
    assert_eq!(ids, vec!["A1", "B2"]);
    assert_eq!(batch.products[0].description, "Full widget description");
    assert_eq!(batch.products[0].category, "Tools");
    assert_eq!(batch.products[1].description, "short");
}

#[tokio::test]
async fn dry_run_does_not_submit_and_is_repeatable() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([{"id": "A1", "name": "Widget", "price": {"amount": "12.50", "currency": "eur"}}]),
    )
    .await;
    mount_inventory(&server, json!([{"product_id": "A1", "available": 3}])).await;
    mount_import(&server, 200, 0).await;

    let config = test_config(&server);
    let first = run(&config, SyncMode::DryRun).await;
    let second = run(&config, SyncMode::DryRun).await;

    assert_eq!(first, second);
    let Submission::DryRun(batch) = first.submission else {
        panic!("expected dry run");
    };
    assert_eq!(batch.products[0].price.currency, "EUR");
    assert_eq!(batch.products[0].price.amount, rust_decimal::Decimal::new(1250, 2));
    assert_eq!(batch.products[0].inventory.available, 3);
}

#[test]
fn unique_ids_keeps_first_occurrence_order() {
    let products: Vec<RawProduct> = [
        json!({"id": "B2"}),
        json!({"id": "A1"}),
        json!({"id": "B2"}),
        json!({}),
    ]
    .into_iter()
    .filter_map(RawProduct::from_value)
    .collect();
    assert_eq!(unique_ids(&products), vec!["B2".to_owned(), "A1".to_owned()]);
}

/// End-to-end tests for the row enricher with mocked enrichment and submission APIs
mod common;

use common::test_client;
use order_enrichment::enricher::RowEnricher;
use order_enrichment::filters::{aggregate_by_customer, filter_by_city, filter_by_start_date};
use order_enrichment::models::{CustomerAggregate, CustomerOrder};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn customer(id: i64, email: Option<&str>, total: f64) -> CustomerAggregate {
    CustomerAggregate {
        customer_id: id,
        name: Some(format!("Customer {}", id)),
        email: email.map(str::to_string),
        total_spend: total,
    }
}

#[tokio::test]
async fn test_enrich_all_handles_mixed_outcomes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/enrichment"))
        .and(query_param("email", "found@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"social_handle": "@found"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/enrichment"))
        .and(query_param("email", "ghost@example.com"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/submission"))
        .and(body_partial_json(json!({"customer_id": 1, "social_handle": "@found"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/submission"))
        .and(body_partial_json(json!({"customer_id": 2, "social_handle": ""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/submission"))
        .and(body_partial_json(json!({"customer_id": 3, "email": ""})))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "invalid email"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = test_client(&mock_server.uri(), 5);
    let enricher = RowEnricher::new(client);

    let customers = vec![
        customer(1, Some("found@example.com"), 30.0),
        customer(2, Some("ghost@example.com"), 12.5),
        customer(3, None, 7.0),
    ];
    let results = enricher.enrich_all(&customers).await;

    assert_eq!(results.len(), 3);

    assert_eq!(results[0].customer_id, 1);
    assert!(results[0].success);
    assert_eq!(results[0].social_handle.as_deref(), Some("@found"));
    assert_eq!(results[0].submission_status, "Successfully submitted customer 1");

    assert!(!results[1].success);
    assert_eq!(results[1].social_handle, None);
    assert_eq!(results[1].reason, "Profile not found (404)");

    assert!(!results[2].success);
    assert_eq!(results[2].reason, "No email provided");
    assert_eq!(
        results[2].submission_status,
        r#"Validation error (422): {"error":"invalid email"}"#
    );
}

#[tokio::test]
async fn test_submission_follows_fetch_for_each_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"social_handle": "@h"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let (client, _) = test_client(&mock_server.uri(), 5);
    let customers = vec![
        customer(1, Some("a@example.com"), 1.0),
        customer(2, Some("b@example.com"), 2.0),
    ];
    RowEnricher::new(client).enrich_all(&customers).await;

    let methods: Vec<String> = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.method.to_string())
        .collect();
    assert_eq!(methods, vec!["GET", "POST", "GET", "POST"]);
}

#[tokio::test]
async fn test_fetch_failure_does_not_block_submission() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"social_handle": ""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, sleeper) = test_client(&mock_server.uri(), 2);
    let results = RowEnricher::new(client)
        .enrich_all(&[customer(5, Some("down@example.com"), 9.0)])
        .await;

    assert!(!results[0].success);
    assert_eq!(results[0].reason, "Max retries (2) exceeded");
    assert!(results[0].submission_status.starts_with("Successfully submitted"));
    // Budget is per call: one wait for the failed fetch, none for the submit
    assert_eq!(sleeper.waits().len(), 1);
}

#[test]
fn test_filters_feed_aggregates() {
    let order = |id: i64, customer: i64, date: &str, total: f64, city: &str| CustomerOrder {
        order_id: id,
        customer_id: customer,
        order_date: date.to_string(),
        order_total: total,
        name: Some(format!("Customer {}", customer)),
        email: Some(format!("c{}@example.com", customer)),
        city: Some(city.to_string()),
    };

    let orders = vec![
        order(1, 2, "2024-09-10", 10.0, "Manchester"),
        order(2, 2, "15/09/2024", 5.0, " manchester"),
        order(3, 1, "2024-08-31", 99.0, "Manchester"),
        order(4, 1, "2024-09-02", 1.5, "MANCHESTER"),
        order(5, 3, "2024-09-02", 50.0, "Leeds"),
    ];

    let orders = filter_by_city(orders, "manchester");
    let orders = filter_by_start_date(orders, "2024-09-01").unwrap();
    let aggregates = aggregate_by_customer(&orders);

    assert_eq!(aggregates.len(), 2);
    assert_eq!(aggregates[0].customer_id, 1);
    assert_eq!(aggregates[0].total_spend, 1.5);
    assert_eq!(aggregates[1].customer_id, 2);
    assert_eq!(aggregates[1].total_spend, 15.0);
}

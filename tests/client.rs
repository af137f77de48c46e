//! Integration tests for `LookupClient` using wiremock HTTP mocks.
//!
//! The client is blocking, so each call runs on a blocking thread while the
//! mock server lives on the async runtime.

use goupc::api::{lookup_batch, BarcodeLookup, BatchResult, LookupClient, LookupError};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn lookup_via(base_url: String, code: &str) -> Result<Value, LookupError> {
    let code = code.to_owned();
    tokio::task::spawn_blocking(move || {
        let client = LookupClient::with_base_url("test-key", &base_url)?;
        client.lookup(&code)
    })
    .await
    .expect("lookup task should not panic")
}

async fn mount_status(server: &MockServer, code: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/code/{code}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_returns_body_unchanged_and_sends_headers() {
    let server = MockServer::start().await;
    let body = json!({
        "code": "012345678905",
        "codeType": "UPC",
        "product": { "name": "Widget", "brand": "Acme", "specs": [["Size", "L"]] }
    });

    Mock::given(method("GET"))
        .and(path("/code/012345678905"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let data = lookup_via(server.uri(), "012345678905")
        .await
        .expect("lookup should succeed");

    assert_eq!(data, body);
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_maps_to_setup_instructions() {
    let server = MockServer::start().await;
    mount_status(&server, "111", 401, json!({ "message": "bad key" })).await;

    let err = lookup_via(server.uri(), "111").await.unwrap_err();

    assert!(matches!(err, LookupError::Unauthorized), "got {err:?}");
    assert!(err.to_string().contains("config set --api-key"));
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_names_the_barcode() {
    let server = MockServer::start().await;
    mount_status(&server, "5901234123457", 404, json!({})).await;

    let err = lookup_via(server.uri(), "5901234123457").await.unwrap_err();

    assert!(matches!(err, LookupError::NotFound { .. }), "got {err:?}");
    assert!(err.to_string().contains("5901234123457"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/code/222"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = lookup_via(server.uri(), "222").await.unwrap_err();

    assert!(matches!(err, LookupError::RateLimited), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn other_status_carries_body_message() {
    let server = MockServer::start().await;
    mount_status(&server, "333", 503, json!({ "error": "maintenance" })).await;

    let err = lookup_via(server.uri(), "333").await.unwrap_err();

    match err {
        LookupError::Api { status, ref message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_success_body_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/code/444"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let err = lookup_via(server.uri(), "444").await.unwrap_err();

    assert!(matches!(err, LookupError::InvalidBody(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn barcode_is_percent_encoded_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/code/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let data = lookup_via(server.uri(), "a/b").await.expect("lookup should succeed");

    assert_eq!(data["ok"], true);
}

#[test]
fn connection_failure_is_a_network_error() {
    // Grab a free port, then close it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LookupClient::with_base_url("test-key", &format!("http://{addr}")).unwrap();
    let err = client.lookup("012345678905").unwrap_err();

    match &err {
        LookupError::Network(detail) => assert!(!detail.is_empty()),
        other => panic!("expected Network error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Network error: "));
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_records_middle_failure_in_order() {
    let server = MockServer::start().await;
    mount_status(&server, "1", 200, json!({ "product": { "name": "One" } })).await;
    mount_status(&server, "2", 404, json!({})).await;
    mount_status(&server, "3", 200, json!({ "product": { "name": "Three" } })).await;

    let base_url = server.uri();
    let results = tokio::task::spawn_blocking(move || {
        let client = LookupClient::with_base_url("test-key", &base_url).unwrap();
        let codes: Vec<String> = ["1", "2", "3"].iter().map(|s| (*s).to_string()).collect();
        lookup_batch(&client, &codes)
    })
    .await
    .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(
        results.iter().map(BatchResult::code).collect::<Vec<_>>(),
        ["1", "2", "3"]
    );
    assert!(results[0].is_success());
    assert_eq!(
        results[1],
        BatchResult::Failure {
            code: "2".into(),
            error: "Product not found for barcode: 2".into(),
        }
    );
    match &results[2] {
        BatchResult::Success { data, .. } => assert_eq!(data["product"]["name"], "Three"),
        other => panic!("expected success, got {other:?}"),
    }
}

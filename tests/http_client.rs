mod common;

use common::MockTransport;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::json;
use servicestage_mcp::http::transport::TransportErrorKind;
use servicestage_mcp::http::{HttpClient, OutgoingRequest};
use servicestage_mcp::services::logger::{LogLevel, Logger};
use std::sync::Arc;
use std::time::Duration;

fn client(transport: Arc<MockTransport>) -> HttpClient {
    HttpClient::new(transport, Logger::with_level("test", LogLevel::Error), 2)
}

fn get(url: &str) -> OutgoingRequest {
    OutgoingRequest::new(Method::GET, url, HeaderMap::new())
}

#[tokio::test(start_paused = true)]
async fn two_connect_failures_then_success_backs_off_exponentially() {
    let transport = Arc::new(MockTransport::new());
    transport
        .push_error(TransportErrorKind::Connect, "connection refused")
        .push_error(TransportErrorKind::Timeout, "read timed out")
        .push_json(200, json!({"items": [1, 2]}));

    let result = client(transport.clone())
        .execute(get("https://ss.test/v3/p/cas/environments"), 2)
        .await;

    assert_eq!(result.status_code, 200);
    assert!(!result.is_error);
    assert_eq!(result.payload, json!({"items": [1, 2]}));

    let seen = transport.requests();
    assert_eq!(seen.len(), 3);
    let first_gap = seen[1].at - seen[0].at;
    let second_gap = seen[2].at - seen[1].at;
    assert!(first_gap >= Duration::from_millis(300), "{first_gap:?}");
    assert!(first_gap < Duration::from_millis(400), "{first_gap:?}");
    assert!(second_gap >= Duration::from_millis(600), "{second_gap:?}");
    assert!(second_gap < Duration::from_millis(700), "{second_gap:?}");
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_not_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(500, json!({"error_msg": "boom"}));

    let result = client(transport.clone())
        .execute(get("https://ss.test/x"), 2)
        .await;

    assert_eq!(transport.request_count(), 1);
    assert!(result.is_error);
    assert_eq!(
        result.payload,
        json!({"error": true, "status_code": 500, "data": {"error_msg": "boom"}})
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_yield_599_with_last_message() {
    let transport = Arc::new(MockTransport::new());
    for message in ["refused 1", "refused 2", "refused 3"] {
        transport.push_error(TransportErrorKind::Connect, message);
    }
    let started = tokio::time::Instant::now();

    let result = client(transport.clone())
        .execute(get("https://ss.test/x"), 2)
        .await;

    assert_eq!(transport.request_count(), 3);
    assert_eq!(
        result.payload,
        json!({"error": true, "status_code": 599, "data": {"message": "refused 3"}})
    );
    // no sleep after the final attempt
    assert!(started.elapsed() < Duration::from_millis(300 + 600 + 200));
}

#[tokio::test(start_paused = true)]
async fn non_retryable_failure_stops_immediately() {
    let transport = Arc::new(MockTransport::new());
    transport
        .push_error(TransportErrorKind::Other, "invalid proxy")
        .push_json(200, json!({}));

    let result = client(transport.clone())
        .execute(get("https://ss.test/x"), 2)
        .await;

    assert_eq!(transport.request_count(), 1);
    assert_eq!(result.status_code, 599);
}

#[tokio::test]
async fn zero_retries_means_a_single_attempt() {
    let transport = Arc::new(MockTransport::new());
    transport.push_error(TransportErrorKind::Timeout, "timeout");

    let result = client(transport.clone())
        .execute(get("https://ss.test/x"), 0)
        .await;

    assert_eq!(transport.request_count(), 1);
    assert_eq!(result.status_code, 599);
}

#[tokio::test]
async fn undecodable_success_body_is_wrapped_as_text() {
    let transport = Arc::new(MockTransport::new());
    transport.push_raw(200, "OK");

    let result = client(transport).send(get("https://ss.test/x")).await;

    assert_eq!(result.payload, json!({"status_code": 200, "text": "OK"}));
}

#[tokio::test]
async fn closed_client_fails_as_transport_error() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(200, json!({}));
    let client = client(transport.clone());

    client.close().await;
    client.close().await;
    let result = client.send(get("https://ss.test/x")).await;

    assert!(transport.is_closed());
    assert_eq!(transport.request_count(), 0);
    assert_eq!(result.status_code, 599);
    assert_eq!(result.payload["data"]["message"], "HTTP client is closed");
}

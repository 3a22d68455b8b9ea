//! Tests for the HTTP module

use super::*;
use crate::auth::StaticCredentials;
use crate::error::Error;
use crate::types::{JsonValue, Method};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Account {
    id: u32,
    name: String,
}

fn executor(limiter: RateLimiter) -> RequestExecutor {
    let transport = ReqwestTransport::new(&TransportConfig::default()).unwrap();
    RequestExecutor::new(
        Arc::new(transport),
        Arc::new(StaticCredentials::ssws("secret").unwrap()),
        limiter,
    )
}

#[test]
fn test_transport_config_default() {
    let config = TransportConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.user_agent.starts_with("pagewise/"));
}

#[tokio::test]
async fn test_execute_get_decodes_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/42"))
        .and(header("Authorization", "SSWS secret"))
        .and(header("Accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 42, "name": "Ada"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let exec = executor(RateLimiter::default());
    let account: Account = exec
        .execute::<(), _>(
            Method::GET,
            &format!("{}/api/v1/users/42", mock_server.uri()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        account,
        Account {
            id: 42,
            name: "Ada".to_string()
        }
    );
}

#[tokio::test]
async fn test_execute_post_sends_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(serde_json::json!({"start": 0, "length": 75})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let exec = executor(RateLimiter::default());
    let body = serde_json::json!({"start": 0, "length": 75});
    let value = exec
        .execute_value(
            Method::POST,
            &format!("{}/search", mock_server.uri()),
            Some(&body),
        )
        .await
        .unwrap();

    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let exec = executor(RateLimiter::default());
    let result: crate::Result<JsonValue> = exec
        .execute::<(), _>(Method::GET, &format!("{}/flaky", mock_server.uri()), None)
        .await;

    match result {
        Err(Error::HttpStatus { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "try later");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_decode_error_surfaces() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
        .mount(&mock_server)
        .await;

    let exec = executor(RateLimiter::default());
    let result: crate::Result<Account> = exec
        .execute::<(), _>(Method::GET, &format!("{}/users/1", mock_server.uri()), None)
        .await;

    match result {
        Err(Error::Decode { message }) => assert!(message.contains("/users/1")),
        other => panic!("Expected Decode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_each_request_charged_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(10));
    let exec = executor(limiter.clone());
    for _ in 0..3 {
        exec.execute_value::<()>(Method::GET, &mock_server.uri(), None)
            .await
            .unwrap();
    }

    assert_eq!(limiter.remaining().await, 7);
}

#[tokio::test]
async fn test_reset_aware_limiter_reads_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Rate-Limit-Limit", "100")
                .insert_header("X-Rate-Limit-Remaining", "17")
                .set_body_json(serde_json::json!({})),
        )
        .mount(&mock_server)
        .await;

    let limiter =
        RateLimiter::new(&RateLimiterConfig::reset_aware(100, Duration::from_secs(60)));
    let exec = executor(limiter.clone());
    exec.execute_value::<()>(Method::GET, &mock_server.uri(), None)
        .await
        .unwrap();

    assert_eq!(limiter.remaining().await, 17);
}

#[tokio::test]
async fn test_quota_deadline_skips_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(1));
    let exec = executor(limiter).with_acquire_timeout(Some(Duration::from_millis(50)));

    exec.execute_value::<()>(Method::GET, &mock_server.uri(), None)
        .await
        .unwrap();
    let err = exec
        .execute_value::<()>(Method::GET, &mock_server.uri(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QuotaWaitTimeout { waited_ms: 50 }));
}

struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn send(
        &self,
        _method: Method,
        url: &str,
        _headers: &HeaderMap,
        _body: Option<&JsonValue>,
    ) -> crate::Result<RawResponse> {
        Err(Error::transport(format!("connection refused: {url}")))
    }
}

#[tokio::test]
async fn test_transport_error_propagates() {
    let exec = RequestExecutor::new(
        Arc::new(FailingTransport),
        Arc::new(StaticCredentials::none()),
        RateLimiter::default(),
    );

    let err = exec
        .execute_value::<()>(Method::GET, "http://unreachable.invalid/users", None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.is_retryable());
}

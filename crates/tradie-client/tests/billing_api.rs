//! Integration tests for the billing API client
//!
//! These tests use wiremock to stand in for billing-api.

use std::time::Duration;

use serde_json::json;
use tradie_client::{BillingApiClient, ClientConfig, ClientError, SubscriptionChecker};
use tradie_types::{SubscriptionProvider, Tier, UserId};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> BillingApiClient {
    let config = ClientConfig::new(server.uri())
        .unwrap()
        .with_api_key("client-key")
        .with_request_timeout(Duration::from_secs(2));
    BillingApiClient::new(config).unwrap()
}

#[tokio::test]
async fn test_get_subscription() {
    let server = MockServer::start().await;
    let user = UserId::new();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/subscription/{user}")))
        .and(header("authorization", "Bearer client-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": user,
            "tier": "solo",
            "provider": "revenuecat",
            "expires_at": "2026-01-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = client(&server).check_subscription(&user).await.unwrap();
    assert_eq!(state.tier, Tier::Solo);
    assert_eq!(state.provider, SubscriptionProvider::Revenuecat);
    assert!(state.expires_at.is_some());
}

#[tokio::test]
async fn test_not_found_maps_error_message() {
    let server = MockServer::start().await;
    let user = UserId::new();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "NOT_FOUND", "message": "profile not found" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_subscription(&user).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref m) if m == "profile not found"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_subscription(&UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_mismatched_user_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": UserId::new(),
            "tier": "pro",
            "provider": "stripe",
            "expires_at": null,
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_subscription(&UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Serialization(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .unwrap()
        .with_request_timeout(Duration::from_millis(200));
    let err = BillingApiClient::new(config)
        .unwrap()
        .get_subscription(&UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout));
}

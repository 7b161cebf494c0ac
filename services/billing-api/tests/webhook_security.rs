//! Webhook authentication at the HTTP boundary
//!
//! Every rejection here happens before the database is touched.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::json;

use common::{json_body, send, test_config, test_router, test_router_with};
use tradie_billing_core::sign_stripe_payload;

fn stripe_event_body() -> Vec<u8> {
    json!({
        "id": "evt_test_123",
        "type": "customer.subscription.updated",
        "data": {
            "object": {
                "id": "sub_123",
                "customer": "cus_123",
                "status": "active",
                "items": { "data": [{ "price": { "id": "price_solo" } }] }
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn stripe_request(uri: &str, body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

fn revenuecat_request(auth: Option<&str>) -> Request<Body> {
    let body = json!({
        "event": {
            "id": "rc_evt_1",
            "type": "INITIAL_PURCHASE",
            "app_user_id": "8f14e45f-ceea-467f-a0e6-1d2b3c4d5e6f",
            "entitlement_ids": ["pro_access"]
        }
    });
    let mut builder = Request::post("/webhooks/revenuecat").header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn stripe_webhook_without_signature_is_rejected() {
    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe", stripe_event_body(), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "WEBHOOK_ERROR");
}

#[tokio::test]
async fn stripe_webhook_with_forged_signature_is_rejected() {
    let now = Utc::now().timestamp();
    let forged = format!("t={now},v1={}", "0".repeat(64));

    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe", stripe_event_body(), Some(forged)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stripe_webhook_signed_with_other_secret_is_rejected() {
    let body = stripe_event_body();
    let signature = sign_stripe_payload("whsec_attacker", &body, Utc::now().timestamp()).unwrap();

    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe", body, Some(signature)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stripe_webhook_with_stale_timestamp_is_rejected() {
    let body = stripe_event_body();
    let ten_minutes_ago = Utc::now().timestamp() - 600;
    let signature = sign_stripe_payload(common::STRIPE_SECRET, &body, ten_minutes_ago).unwrap();

    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe", body, Some(signature)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stripe_webhook_with_tampered_body_is_rejected() {
    let body = stripe_event_body();
    let signature =
        sign_stripe_payload(common::STRIPE_SECRET, &body, Utc::now().timestamp()).unwrap();
    let tampered = String::from_utf8(body)
        .unwrap()
        .replace("price_solo", "price_pro")
        .into_bytes();

    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe", tampered, Some(signature)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn connect_webhook_does_not_accept_platform_secret() {
    let body = stripe_event_body();
    let signature =
        sign_stripe_payload(common::STRIPE_SECRET, &body, Utc::now().timestamp()).unwrap();

    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe-connect", body, Some(signature)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verified_webhook_with_database_down_asks_provider_to_retry() {
    let body = stripe_event_body();
    let signature =
        sign_stripe_payload(common::STRIPE_SECRET, &body, Utc::now().timestamp()).unwrap();

    let response = send(
        test_router(),
        stripe_request("/webhooks/stripe", body, Some(signature)),
    )
    .await;

    assert!(response.status().is_server_error());
}

#[tokio::test]
async fn revenuecat_webhook_requires_authorization() {
    let response = send(test_router(), revenuecat_request(None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(test_router(), revenuecat_request(Some("Bearer wrong"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "WEBHOOK_ERROR");
}

#[tokio::test]
async fn revenuecat_webhook_rejected_when_not_configured() {
    let mut config = test_config(&[]);
    config.billing.revenuecat_webhook_auth = None;

    let response = send(
        test_router_with(config),
        revenuecat_request(Some(common::REVENUECAT_AUTH)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

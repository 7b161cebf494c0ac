//! Provider webhook handlers
//!
//! Each handler verifies the delivery, then runs the side effect through the
//! idempotency guard. A failed side effect is recorded permanently and
//! answered with 500 and `{success:false}`.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{instrument, warn};

use tradie_billing_core::{
    verify_revenuecat_auth, BillingError, ProcessedWebhook, RevenueCatEvent,
    StripeSignatureVerifier, StripeEvent,
};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

/// POST /webhooks/stripe
///
/// Platform account events (subscriptions).
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let start = Instant::now();
    let (event, payload) = verify_stripe(&state.platform_verifier, &headers, &body)?;

    let events = state.events.clone();
    let incoming = event.to_incoming(payload, false);
    let processed = state
        .guard
        .process_with_idempotency(incoming, move || async move {
            events.handle_platform(&event).await
        })
        .await;

    respond("stripe_webhook", start, processed)
}

/// POST /webhooks/stripe-connect
///
/// Connected account events (invoice payments).
#[instrument(skip_all)]
pub async fn stripe_connect_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let start = Instant::now();
    let (event, payload) = verify_stripe(&state.connect_verifier, &headers, &body)?;

    let events = state.events.clone();
    let incoming = event.to_incoming(payload, true);
    let processed = state
        .guard
        .process_with_idempotency(incoming, move || async move {
            events.handle_connect(&event, Utc::now()).await
        })
        .await;

    respond("stripe_connect_webhook", start, processed)
}

/// POST /webhooks/revenuecat
#[instrument(skip_all)]
pub async fn revenuecat_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let start = Instant::now();

    let Some(expected) = state.config.billing.revenuecat_webhook_auth.as_deref() else {
        warn!("RevenueCat webhook received but REVENUECAT_WEBHOOK_AUTH is not set");
        return Err(ApiError::WebhookError("revenuecat webhooks not configured".into()));
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    verify_revenuecat_auth(expected, provided)?;

    let (event, payload) = RevenueCatEvent::parse(&body)?;

    let events = state.events.clone();
    let incoming = event.to_incoming(payload);
    let processed = state
        .guard
        .process_with_idempotency(incoming, move || async move {
            events.handle_revenuecat(&event).await
        })
        .await;

    respond("revenuecat_webhook", start, processed)
}

fn verify_stripe(
    verifier: &StripeSignatureVerifier,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(StripeEvent, serde_json::Value), ApiError> {
    let Some(sig_header) = headers.get("stripe-signature") else {
        warn!("Missing Stripe-Signature header");
        return Err(ApiError::WebhookError("missing Stripe-Signature header".into()));
    };
    let Ok(signature) = sig_header.to_str() else {
        warn!("Invalid Stripe-Signature header encoding");
        return Err(ApiError::WebhookError("invalid Stripe-Signature header".into()));
    };

    let event = verifier.verify_and_parse(body, signature, Utc::now())?;
    let payload = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON payload: {e}")))?;

    Ok((event, payload))
}

fn respond(
    operation: &'static str,
    start: Instant,
    processed: Result<ProcessedWebhook, BillingError>,
) -> ApiResult<Response> {
    let processed = match processed {
        Ok(processed) => processed,
        Err(e) => {
            record_op_duration(operation, start, false);
            return Err(e.into());
        }
    };

    record_op_duration(operation, start, processed.success);
    let status = if processed.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(processed)).into_response())
}

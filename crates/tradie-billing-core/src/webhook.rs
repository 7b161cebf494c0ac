//! Provider webhook verification and envelope parsing

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, instrument, warn};

use tradie_types::WebhookSource;

use crate::config::DEFAULT_SIGNATURE_TOLERANCE_SECS;
use crate::error::BillingError;
use crate::idempotency::IncomingEvent;

/// Verifies `Stripe-Signature` headers
#[derive(Clone)]
pub struct StripeSignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl StripeSignatureVerifier {
    /// Create a verifier with the default 5 minute tolerance
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
        }
    }

    /// Override the timestamp tolerance
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify the signature and parse the event
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<StripeEvent, BillingError> {
        self.verify_signature(payload, signature, now)?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;

        debug!(event_id = %event.id, event_type = %event.event_type, "Parsed Stripe event");

        Ok(event)
    }

    /// Verify a Stripe webhook signature: `t=timestamp,v1=signature`
    pub fn verify_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BillingError::WebhookVerification("missing timestamp".to_string())
        })?;

        if candidates.is_empty() {
            warn!("Missing v1 signature in webhook signature");
            return Err(BillingError::WebhookVerification(
                "missing signature".to_string(),
            ));
        }

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        // Stripe sends one v1 per active secret during rotation.
        if !candidates
            .iter()
            .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
        {
            error!("Webhook signature verification failed");
            return Err(BillingError::WebhookVerification(
                "signature mismatch".to_string(),
            ));
        }

        let ts: i64 = timestamp.parse().map_err(|_| {
            BillingError::WebhookVerification("invalid timestamp format".to_string())
        })?;
        let now = now.timestamp();
        if (now - ts).abs() > self.tolerance_secs {
            warn!(timestamp = ts, now = now, "Webhook timestamp outside tolerance");
            return Err(BillingError::WebhookVerification(
                "timestamp outside tolerance".to_string(),
            ));
        }

        Ok(())
    }
}

/// Compute a `Stripe-Signature` header value for a payload
pub fn sign_stripe_payload(
    secret: &str,
    payload: &[u8],
    timestamp: i64,
) -> Result<String, BillingError> {
    let ts = timestamp.to_string();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
    mac.update(ts.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={ts},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a RevenueCat `Authorization` header against the configured value
pub fn verify_revenuecat_auth(expected: &str, provided: Option<&str>) -> Result<(), BillingError> {
    let provided = provided.ok_or_else(|| {
        warn!("Missing Authorization header on RevenueCat webhook");
        BillingError::WebhookVerification("missing authorization".to_string())
    })?;

    let matches = constant_time_eq(provided.as_bytes(), expected.as_bytes())
        || provided
            .strip_prefix("Bearer ")
            .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));

    if !matches {
        error!("RevenueCat webhook authorization failed");
        return Err(BillingError::WebhookVerification(
            "authorization mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Constant-time comparison of secrets
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Stripe event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Connected account the event belongs to, for Connect events
    #[serde(default)]
    pub account: Option<String>,
    pub data: StripeEventData,
    #[serde(default)]
    pub created: i64,
}

/// Stripe event data wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Source of this event given the endpoint it arrived on
    pub fn source(&self, connect_endpoint: bool) -> WebhookSource {
        if connect_endpoint || self.account.is_some() {
            WebhookSource::Connect
        } else {
            WebhookSource::Platform
        }
    }

    /// Build the idempotency record for this event
    pub fn to_incoming(&self, payload: serde_json::Value, connect_endpoint: bool) -> IncomingEvent {
        IncomingEvent {
            event_id: self.id.clone(),
            event_type: self.event_type.clone(),
            source: self.source(connect_endpoint),
            payload,
        }
    }
}

/// RevenueCat webhook envelope
#[derive(Debug, Clone, Deserialize)]
struct RevenueCatEnvelope {
    event: RevenueCatEvent,
}

/// RevenueCat subscription event
#[derive(Debug, Clone, Deserialize)]
pub struct RevenueCatEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub app_user_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub entitlement_ids: Option<Vec<String>>,
    #[serde(default)]
    pub expiration_at_ms: Option<i64>,
}

impl RevenueCatEvent {
    /// Parse a RevenueCat payload
    pub fn parse(payload: &[u8]) -> Result<(Self, serde_json::Value), BillingError> {
        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;
        let envelope: RevenueCatEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;
        Ok((envelope.event, raw))
    }

    /// Build the idempotency record for this event
    pub fn to_incoming(&self, payload: serde_json::Value) -> IncomingEvent {
        IncomingEvent {
            event_id: self.id.clone(),
            event_type: self.event_type.clone(),
            source: WebhookSource::Revenuecat,
            payload,
        }
    }

    /// Entitlement IDs followed by the product ID
    pub fn grant_ids(&self) -> impl Iterator<Item = &str> {
        self.entitlement_ids
            .iter()
            .flatten()
            .map(String::as_str)
            .chain(self.product_id.as_deref())
    }

    /// Subscription expiry carried by the event
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_at_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

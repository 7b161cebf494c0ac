//! Webhook event handlers
//!
//! Side effects run inside [`IdempotencyGuard`](crate::IdempotencyGuard):
//! subscription sync for platform and RevenueCat events, and invoice payment
//! for Connect events. Handlers return a small JSON summary of what they did.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tradie_db::{InvoiceRepository, ProfileRepository};
use tradie_types::{InvoiceStatus, SubscriptionProvider, SubscriptionState, UserId};

use crate::webhook::{RevenueCatEvent, StripeEvent};
use crate::{BillingConfig, BillingError, TierResolver};

/// Applies verified provider events to profiles and invoices
#[derive(Clone)]
pub struct WebhookEventHandler {
    profiles: Arc<dyn ProfileRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    resolver: TierResolver,
    config: Arc<BillingConfig>,
}

impl WebhookEventHandler {
    /// Create a new handler
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        resolver: TierResolver,
        config: Arc<BillingConfig>,
    ) -> Self {
        Self {
            profiles,
            invoices,
            resolver,
            config,
        }
    }

    /// Handle an event from the Stripe platform account
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_platform(&self, event: &StripeEvent) -> Result<Option<Value>, BillingError> {
        match event.event_type.as_str() {
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.sync_stripe_subscription(&event.data.object, false).await
            }
            "customer.subscription.deleted" => {
                self.sync_stripe_subscription(&event.data.object, true).await
            }
            other => Ok(Some(ignored(other))),
        }
    }

    /// Handle an event from a connected account
    #[instrument(skip(self, event, now), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_connect(
        &self,
        event: &StripeEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<Value>, BillingError> {
        match event.event_type.as_str() {
            "checkout.session.completed" | "payment_intent.succeeded" => {
                match metadata_str(&event.data.object, "invoice_id") {
                    Some(invoice_id) => self.mark_invoice_paid(invoice_id, now).await,
                    None => Ok(Some(ignored("no invoice metadata"))),
                }
            }
            other => Ok(Some(ignored(other))),
        }
    }

    /// Handle a RevenueCat subscription event
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_revenuecat(&self, event: &RevenueCatEvent) -> Result<Option<Value>, BillingError> {
        let user_id = UserId::parse(&event.app_user_id).map_err(|_| {
            BillingError::InvalidPayload(format!("app_user_id is not a user id: {}", event.app_user_id))
        })?;

        let state = match event.event_type.as_str() {
            "INITIAL_PURCHASE" | "RENEWAL" | "PRODUCT_CHANGE" | "UNCANCELLATION" => {
                let tier = self
                    .config
                    .tier_for_entitlements(event.grant_ids())
                    .ok_or_else(|| {
                        BillingError::UnknownPrice(event.product_id.clone().unwrap_or_default())
                    })?;
                SubscriptionState {
                    tier,
                    provider: SubscriptionProvider::Revenuecat,
                    expires_at: event.expires_at(),
                }
            }
            "EXPIRATION" => SubscriptionState::free(),
            // Access continues until expiry; EXPIRATION follows.
            "CANCELLATION" | "BILLING_ISSUE" => {
                return Ok(Some(json!({ "action": "acknowledged" })));
            }
            other => return Ok(Some(ignored(other))),
        };

        self.apply_subscription(user_id, &state).await
    }

    async fn sync_stripe_subscription(
        &self,
        subscription: &Value,
        deleted: bool,
    ) -> Result<Option<Value>, BillingError> {
        let user_id = self.stripe_subscription_owner(subscription).await?;

        let status = subscription["status"].as_str().unwrap_or_default();
        let state = if !deleted && matches!(status, "active" | "trialing") {
            let price_id = subscription["items"]["data"][0]["price"]["id"]
                .as_str()
                .ok_or_else(|| BillingError::InvalidPayload("subscription has no price".to_string()))?;
            let tier = self
                .config
                .tier_for_price(price_id)
                .ok_or_else(|| BillingError::UnknownPrice(price_id.to_string()))?;
            SubscriptionState {
                tier,
                provider: SubscriptionProvider::Stripe,
                expires_at: subscription["current_period_end"]
                    .as_i64()
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            }
        } else {
            SubscriptionState::free()
        };

        self.apply_subscription(user_id, &state).await
    }

    /// Owner from `metadata.user_id`, else by Stripe customer ID
    async fn stripe_subscription_owner(&self, subscription: &Value) -> Result<UserId, BillingError> {
        if let Some(user_id) = metadata_str(subscription, "user_id").and_then(|s| UserId::parse(s).ok()) {
            return Ok(user_id);
        }

        let customer = subscription["customer"]
            .as_str()
            .ok_or_else(|| BillingError::InvalidPayload("subscription has no customer".to_string()))?;
        let profile = self
            .profiles
            .find_by_stripe_customer_id(customer)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        Ok(profile.user_id())
    }

    async fn apply_subscription(
        &self,
        user_id: UserId,
        state: &SubscriptionState,
    ) -> Result<Option<Value>, BillingError> {
        self.profiles.update_subscription(user_id.0, state).await?;
        self.resolver.invalidate(&user_id).await;

        info!(user_id = %user_id, tier = %state.tier, provider = %state.provider, "Subscription synced");

        Ok(Some(json!({
            "action": "subscription_synced",
            "user_id": user_id,
            "tier": state.tier,
        })))
    }

    async fn mark_invoice_paid(&self, invoice_id: &str, now: DateTime<Utc>) -> Result<Option<Value>, BillingError> {
        let id = Uuid::parse_str(invoice_id)
            .map_err(|_| BillingError::InvalidPayload(format!("invalid invoice_id: {invoice_id}")))?;

        let invoice = self
            .invoices
            .find_by_id(id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;

        if invoice.status == InvoiceStatus::Paid.as_str() {
            warn!(invoice_id = %id, "Invoice already paid");
            return Ok(Some(json!({ "action": "already_paid", "invoice_id": id })));
        }

        self.invoices.mark_paid(id, now).await?;
        info!(invoice_id = %id, "Invoice marked paid");

        Ok(Some(json!({ "action": "invoice_paid", "invoice_id": id })))
    }
}

fn metadata_str<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object["metadata"][key].as_str().filter(|s| !s.is_empty())
}

fn ignored(event_type: &str) -> Value {
    json!({ "action": "ignored", "reason": event_type })
}

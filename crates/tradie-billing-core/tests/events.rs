//! Integration tests for webhook event handlers

mod common;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{EnforcerHarness, MockInvoiceRepository, MockProfileRepository};
use serde_json::json;
use tradie_billing_core::{
    BillingConfig, BillingError, RevenueCatEvent, StripeEvent, WebhookEventHandler,
};
use tradie_types::{SubscriptionProvider, Tier, UsageType, UserId};

struct Fixture {
    h: EnforcerHarness,
    invoices: MockInvoiceRepository,
    handler: WebhookEventHandler,
}

impl Fixture {
    fn new() -> Self {
        let h = EnforcerHarness::new();
        let invoices = MockInvoiceRepository::new();
        let config = BillingConfig::new("whsec_test")
            .with_price("price_solo", Tier::Solo)
            .with_price("price_crew", Tier::Crew)
            .with_entitlement("solo", Tier::Solo)
            .with_entitlement("pro", Tier::Pro);
        let handler = WebhookEventHandler::new(
            Arc::new(h.profiles.clone()),
            Arc::new(invoices.clone()),
            h.resolver.clone(),
            Arc::new(config),
        );
        Self { h, invoices, handler }
    }

    fn customer(&self, customer_id: &str) -> UserId {
        let mut row = MockProfileRepository::create_test_profile(Some("free"));
        row.stripe_customer_id = Some(customer_id.to_string());
        let id = UserId(row.id);
        self.h.profiles.insert_profile(row);
        id
    }
}

fn stripe_event(event_type: &str, object: serde_json::Value) -> StripeEvent {
    serde_json::from_value(json!({
        "id": "evt_test",
        "type": event_type,
        "data": { "object": object },
        "created": 1_700_000_000,
    }))
    .unwrap()
}

fn subscription(customer: &str, status: &str, price: &str) -> serde_json::Value {
    json!({
        "id": "sub_1",
        "customer": customer,
        "status": status,
        "current_period_end": 1_767_225_600,
        "items": { "data": [ { "price": { "id": price } } ] },
    })
}

#[tokio::test]
async fn test_active_subscription_sets_tier_and_invalidates_cache() {
    let f = Fixture::new();
    let user = f.customer("cus_1");

    // Prime the cached free tier.
    let before = f.h.enforcer.check_usage_limit(&user, UsageType::Quotes).await;
    assert_eq!(before.tier, Tier::Free);

    let event = stripe_event(
        "customer.subscription.updated",
        subscription("cus_1", "active", "price_crew"),
    );
    f.handler.handle_platform(&event).await.unwrap();

    let profile = f.h.profiles.get(&user).unwrap();
    let state = profile.subscription();
    assert_eq!(state.tier, Tier::Crew);
    assert_eq!(state.provider, SubscriptionProvider::Stripe);
    assert_eq!(
        state.expires_at,
        DateTime::<Utc>::from_timestamp(1_767_225_600, 0)
    );

    let after = f.h.enforcer.check_usage_limit(&user, UsageType::Quotes).await;
    assert_eq!(after.tier, Tier::Crew);
}

#[tokio::test]
async fn test_deleted_or_lapsed_subscription_downgrades() {
    let f = Fixture::new();
    let user = f.customer("cus_2");
    f.h.profiles.set_tier(&user, "solo");

    let lapsed = stripe_event(
        "customer.subscription.updated",
        subscription("cus_2", "past_due", "price_solo"),
    );
    f.handler.handle_platform(&lapsed).await.unwrap();
    assert_eq!(f.h.profiles.get(&user).unwrap().tier(), Tier::Free);

    f.h.profiles.set_tier(&user, "solo");
    let deleted = stripe_event(
        "customer.subscription.deleted",
        subscription("cus_2", "canceled", "price_solo"),
    );
    f.handler.handle_platform(&deleted).await.unwrap();
    assert_eq!(f.h.profiles.get(&user).unwrap().tier(), Tier::Free);
}

#[tokio::test]
async fn test_unknown_price_is_an_error() {
    let f = Fixture::new();
    f.customer("cus_3");

    let event = stripe_event(
        "customer.subscription.created",
        subscription("cus_3", "active", "price_mystery"),
    );
    let err = f.handler.handle_platform(&event).await.unwrap_err();
    assert!(matches!(err, BillingError::UnknownPrice(p) if p == "price_mystery"));
}

#[tokio::test]
async fn test_unknown_customer_is_not_found() {
    let f = Fixture::new();
    let event = stripe_event(
        "customer.subscription.created",
        subscription("cus_nobody", "active", "price_solo"),
    );
    let err = f.handler.handle_platform(&event).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unhandled_platform_event_is_ignored() {
    let f = Fixture::new();
    let data = f
        .handler
        .handle_platform(&stripe_event("invoice.created", json!({})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(data["action"], "ignored");
}

#[tokio::test]
async fn test_connect_payment_marks_invoice_paid() {
    let f = Fixture::new();
    let user = f.h.profiles.insert_user(Some("solo"));
    let invoice = f.invoices.insert_invoice(&user, "INV-0007", Utc::now());

    let event = stripe_event(
        "checkout.session.completed",
        json!({ "id": "cs_1", "metadata": { "invoice_id": invoice.id.to_string() } }),
    );
    let now = Utc::now();
    let data = f.handler.handle_connect(&event, now).await.unwrap().unwrap();

    assert_eq!(data["action"], "invoice_paid");
    let paid = f.invoices.get(invoice.id).unwrap();
    assert_eq!(paid.status, "paid");
    assert_eq!(paid.paid_at, Some(now));

    let again = f.handler.handle_connect(&event, Utc::now()).await.unwrap().unwrap();
    assert_eq!(again["action"], "already_paid");
    assert_eq!(f.invoices.get(invoice.id).unwrap().paid_at, Some(now));
}

#[tokio::test]
async fn test_connect_payment_for_missing_invoice_fails() {
    let f = Fixture::new();
    let event = stripe_event(
        "payment_intent.succeeded",
        json!({ "id": "pi_1", "metadata": { "invoice_id": uuid::Uuid::new_v4().to_string() } }),
    );
    let err = f.handler.handle_connect(&event, Utc::now()).await.unwrap_err();
    assert!(matches!(err, BillingError::InvoiceNotFound));
}

fn revenuecat(event_type: &str, user: &UserId, entitlements: &[&str]) -> RevenueCatEvent {
    let body = json!({
        "event": {
            "id": "rc_evt",
            "type": event_type,
            "app_user_id": user.to_string(),
            "product_id": "tm_monthly",
            "entitlement_ids": entitlements,
            "expiration_at_ms": 1_767_225_600_000i64,
        }
    });
    RevenueCatEvent::parse(body.to_string().as_bytes()).unwrap().0
}

#[tokio::test]
async fn test_revenuecat_purchase_and_expiration() {
    let f = Fixture::new();
    let user = f.h.profiles.insert_user(Some("free"));

    f.handler
        .handle_revenuecat(&revenuecat("INITIAL_PURCHASE", &user, &["solo", "pro"]))
        .await
        .unwrap();
    let state = f.h.profiles.get(&user).unwrap().subscription();
    assert_eq!(state.tier, Tier::Pro);
    assert_eq!(state.provider, SubscriptionProvider::Revenuecat);
    assert!(state.expires_at.is_some());

    f.handler
        .handle_revenuecat(&revenuecat("CANCELLATION", &user, &[]))
        .await
        .unwrap();
    assert_eq!(f.h.profiles.get(&user).unwrap().tier(), Tier::Pro);

    f.handler
        .handle_revenuecat(&revenuecat("EXPIRATION", &user, &[]))
        .await
        .unwrap();
    assert_eq!(f.h.profiles.get(&user).unwrap().tier(), Tier::Free);
}

#[tokio::test]
async fn test_revenuecat_non_uuid_user_is_invalid() {
    let f = Fixture::new();
    let body = json!({ "event": { "id": "rc_1", "type": "RENEWAL", "app_user_id": "$RCAnonymousID:abc" } });
    let (event, _) = RevenueCatEvent::parse(body.to_string().as_bytes()).unwrap();

    let err = f.handler.handle_revenuecat(&event).await.unwrap_err();
    assert!(err.is_client_error());
}

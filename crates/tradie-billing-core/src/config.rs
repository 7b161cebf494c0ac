//! Billing configuration

use std::collections::HashMap;
use std::time::Duration;

use tradie_types::{Tier, UsageType};

/// Default retention for processed webhook events
pub const DEFAULT_WEBHOOK_RETENTION_DAYS: u32 = 90;

/// Default tolerance for Stripe signature timestamps, in seconds
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Fixed-window burst limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Hits allowed per window
    pub max_hits: u32,
    /// Window length
    pub window: Duration,
}

impl RatePolicy {
    /// `max_hits` per minute
    pub const fn per_minute(max_hits: u32) -> Self {
        Self {
            max_hits,
            window: Duration::from_secs(60),
        }
    }
}

/// Billing core configuration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Stripe platform webhook secret
    pub stripe_webhook_secret: String,
    /// Stripe Connect webhook secret (falls back to the platform secret)
    pub stripe_connect_webhook_secret: Option<String>,
    /// Expected `Authorization` header value on RevenueCat webhooks
    pub revenuecat_webhook_auth: Option<String>,
    /// Stripe price ID → tier
    pub price_tiers: HashMap<String, Tier>,
    /// RevenueCat entitlement or product ID → tier
    pub revenuecat_entitlement_tiers: HashMap<String, Tier>,
    /// How long processed webhook events are kept
    pub webhook_retention_days: u32,
    /// Maximum age of a signed Stripe payload
    pub signature_tolerance_secs: i64,
    /// How long a resolved tier is cached
    pub tier_cache_ttl: Duration,
    /// Burst limits per usage type
    pub rate_policies: HashMap<UsageType, RatePolicy>,
}

impl BillingConfig {
    /// Create a new billing config
    pub fn new(stripe_webhook_secret: impl Into<String>) -> Self {
        Self {
            stripe_webhook_secret: stripe_webhook_secret.into(),
            stripe_connect_webhook_secret: None,
            revenuecat_webhook_auth: None,
            price_tiers: HashMap::new(),
            revenuecat_entitlement_tiers: HashMap::new(),
            webhook_retention_days: DEFAULT_WEBHOOK_RETENTION_DAYS,
            signature_tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
            tier_cache_ttl: Duration::from_secs(60),
            rate_policies: HashMap::from([
                (UsageType::Sms, RatePolicy::per_minute(10)),
                (UsageType::Emails, RatePolicy::per_minute(30)),
            ]),
        }
    }

    /// Set the Connect webhook secret
    pub fn with_connect_secret(mut self, secret: impl Into<String>) -> Self {
        self.stripe_connect_webhook_secret = Some(secret.into());
        self
    }

    /// Set the RevenueCat authorization value
    pub fn with_revenuecat_auth(mut self, auth: impl Into<String>) -> Self {
        self.revenuecat_webhook_auth = Some(auth.into());
        self
    }

    /// Map a Stripe price ID to a tier
    pub fn with_price(mut self, price_id: impl Into<String>, tier: Tier) -> Self {
        self.price_tiers.insert(price_id.into(), tier);
        self
    }

    /// Map a RevenueCat entitlement or product ID to a tier
    pub fn with_entitlement(mut self, id: impl Into<String>, tier: Tier) -> Self {
        self.revenuecat_entitlement_tiers.insert(id.into(), tier);
        self
    }

    /// Set webhook event retention
    pub fn with_webhook_retention_days(mut self, days: u32) -> Self {
        self.webhook_retention_days = days;
        self
    }

    /// Set the tier cache TTL
    pub fn with_tier_cache_ttl(mut self, ttl: Duration) -> Self {
        self.tier_cache_ttl = ttl;
        self
    }

    /// Set a burst limit for a usage type
    pub fn with_rate_policy(mut self, usage_type: UsageType, policy: RatePolicy) -> Self {
        self.rate_policies.insert(usage_type, policy);
        self
    }

    /// Secret used to verify Connect webhooks
    pub fn connect_secret(&self) -> &str {
        self.stripe_connect_webhook_secret
            .as_deref()
            .unwrap_or(&self.stripe_webhook_secret)
    }

    /// Tier for a Stripe price ID
    pub fn tier_for_price(&self, price_id: &str) -> Option<Tier> {
        self.price_tiers.get(price_id).copied()
    }

    /// Highest tier granted by any of the given RevenueCat IDs
    pub fn tier_for_entitlements<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<Tier> {
        ids.into_iter()
            .filter_map(|id| self.revenuecat_entitlement_tiers.get(id).copied())
            .max()
    }
}

/// Parse a `key=tier,key=tier` mapping, as used by the price and entitlement
/// environment variables. Unknown tier names are rejected.
pub fn parse_tier_map(raw: &str) -> Result<HashMap<String, Tier>, tradie_types::ParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, tier) = pair
                .split_once('=')
                .ok_or_else(|| tradie_types::ParseError::InvalidTier(pair.to_string()))?;
            Ok((key.trim().to_string(), tier.trim().parse::<Tier>()?))
        })
        .collect()
}

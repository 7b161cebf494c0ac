//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Tier;

/// Who bills the subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionProvider {
    /// Web checkout through Stripe
    Stripe,
    /// In-app purchase through RevenueCat
    Revenuecat,
    /// No paid subscription
    #[default]
    None,
}

impl SubscriptionProvider {
    /// Provider name as stored in `profiles.subscription_provider`
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Revenuecat => "revenuecat",
            Self::None => "none",
        }
    }

    /// Parse a stored provider, treating unknown values as `None`
    pub fn parse_or_none(s: Option<&str>) -> Self {
        match s {
            Some("stripe") => Self::Stripe,
            Some("revenuecat") => Self::Revenuecat,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for SubscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative subscription state of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    /// Current tier
    pub tier: Tier,
    /// Billing provider
    pub provider: SubscriptionProvider,
    /// When the paid period ends, if known
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// The free, provider-less state
    pub fn free() -> Self {
        Self {
            tier: Tier::Free,
            provider: SubscriptionProvider::None,
            expires_at: None,
        }
    }

    /// Whether the subscription's own expiry has passed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

//! Tier policy table
//!
//! The single authoritative mapping from (tier, usage type) to a monthly
//! limit. The server enforces it and clients derive their optimistic gating
//! from [`tier_limit_table`] rather than keeping their own copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Tier, UsageType};

/// Wire sentinel for an unlimited allowance
pub const UNLIMITED: i64 = -1;

/// A monthly allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    /// At most this many per period; zero means the plan excludes the type
    Finite(u32),
    /// No cap
    Unlimited,
}

impl Limit {
    /// Whether one more action is admitted given `used` so far
    pub const fn admits(&self, used: u32) -> bool {
        match self {
            Self::Finite(limit) => used < *limit,
            Self::Unlimited => true,
        }
    }

    /// Remaining allowance given `used` so far
    pub const fn remaining(&self, used: u32) -> Limit {
        match self {
            Self::Finite(limit) => Self::Finite(limit.saturating_sub(used)),
            Self::Unlimited => Self::Unlimited,
        }
    }

    /// Whether this is the unlimited sentinel
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(limit) => write!(f, "{limit}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Finite(limit) => i64::from(limit),
            Limit::Unlimited => UNLIMITED,
        }
    }
}

impl TryFrom<i64> for Limit {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            UNLIMITED => Ok(Self::Unlimited),
            v if v >= 0 => u32::try_from(v)
                .map(Self::Finite)
                .map_err(|_| format!("limit out of range: {v}")),
            v => Err(format!("invalid limit: {v}")),
        }
    }
}

/// Monthly limit for a tier and usage type
pub const fn limit_for(tier: Tier, usage_type: UsageType) -> Limit {
    use Limit::{Finite, Unlimited};

    match (tier, usage_type) {
        (Tier::Free, UsageType::Sms) => Finite(0),
        (Tier::Free, _) => Finite(5),

        // Outbound SMS is the one type gated on paid tiers
        (Tier::Solo, UsageType::Sms) => Finite(50),
        (Tier::Crew, UsageType::Sms) => Finite(200),
        (Tier::Pro, UsageType::Sms) => Finite(500),

        (Tier::Solo | Tier::Crew | Tier::Pro, _) => Unlimited,
    }
}

/// Monthly limit for a raw tier name; unknown names get the free tier's limit
pub fn limit_for_tier_name(tier: &str, usage_type: UsageType) -> Limit {
    limit_for(Tier::parse_or_free(tier), usage_type)
}

/// All limits for one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Tier
    pub tier: Tier,
    /// Limit per usage type
    pub limits: BTreeMap<UsageType, Limit>,
}

impl TierLimits {
    /// Build the limits for a tier from the policy table
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            tier,
            limits: UsageType::ALL
                .into_iter()
                .map(|usage_type| (usage_type, limit_for(tier, usage_type)))
                .collect(),
        }
    }
}

/// Export the full policy table, lowest tier first
pub fn tier_limit_table() -> Vec<TierLimits> {
    Tier::ALL.into_iter().map(TierLimits::for_tier).collect()
}

//! Optimistic client-side usage gating
//!
//! Mirrors the server's tier table so the UI can grey out actions early. The
//! server still enforces every limit.

use tradie_types::{limit_for, Limit, Tier, TierLimits, UsageCounts, UsageType};

/// Usage gate for a resolved tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageGate {
    tier: Tier,
}

impl UsageGate {
    pub fn new(tier: Tier) -> Self {
        Self { tier }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Limit for `usage_type` on this tier
    pub fn limit(&self, usage_type: UsageType) -> Limit {
        limit_for(self.tier, usage_type)
    }

    /// Whether one more `usage_type` action fits under the limit
    pub fn can_use(&self, usage_type: UsageType, used: u32) -> bool {
        self.limit(usage_type).admits(used)
    }

    /// Remaining allowance for `usage_type`
    pub fn remaining(&self, usage_type: UsageType, used: u32) -> Limit {
        self.limit(usage_type).remaining(used)
    }

    /// Usage types that are exhausted given the local counts
    pub fn exhausted(&self, counts: &UsageCounts) -> Vec<UsageType> {
        UsageType::ALL
            .into_iter()
            .filter(|t| !self.can_use(*t, counts.get(*t)))
            .collect()
    }

    /// All limits for this tier
    pub fn limits(&self) -> TierLimits {
        TierLimits::for_tier(self.tier)
    }
}

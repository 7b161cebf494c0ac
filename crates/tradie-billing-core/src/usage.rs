//! Usage enforcement
//!
//! Server-side quota checks against the monthly usage ledger. The two
//! infrastructure failure modes resolve differently:
//!
//! - tier unknown (profile lookup failed): deny
//! - usage unknown (ledger read failed): allow
//!
//! Callers check before performing an action and increment only after the
//! action has committed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tradie_db::UsageRepository;
use tradie_types::{
    limit_for, CheckOutcome, Limit, Tier, UsageCheck, UsageCounts, UsageDenial, UsagePeriod,
    UsageType, UserId,
};

use crate::{BillingError, TierResolver};

/// Result of `enforce_usage_limit`; a denial is a value, never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enforcement {
    /// The action may proceed
    Allowed(UsageCheck),
    /// The action must be rejected
    Denied(UsageDenial),
}

impl Enforcement {
    /// Whether the action may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// One usage type's position within a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLine {
    pub used: u32,
    pub limit: Limit,
    pub remaining: Limit,
}

/// All counters of a period together with the tier's limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub user_id: UserId,
    pub period: UsagePeriod,
    pub tier: Tier,
    pub usage: BTreeMap<UsageType, UsageLine>,
}

/// Quota checks and usage recording
#[derive(Clone)]
pub struct UsageEnforcer {
    resolver: TierResolver,
    usage: Arc<dyn UsageRepository>,
}

impl UsageEnforcer {
    /// Create a new enforcer
    pub fn new(resolver: TierResolver, usage: Arc<dyn UsageRepository>) -> Self {
        Self { resolver, usage }
    }

    /// The tier resolver, for cache invalidation on subscription changes
    pub fn resolver(&self) -> &TierResolver {
        &self.resolver
    }

    /// Check whether the user may perform one more action of `usage_type`
    /// in the current period. Read-only.
    pub async fn check_usage_limit(&self, user_id: &UserId, usage_type: UsageType) -> UsageCheck {
        self.check_usage_limit_at(user_id, usage_type, Utc::now()).await
    }

    /// [`check_usage_limit`](Self::check_usage_limit) against the period containing `now`
    #[instrument(skip(self), fields(user_id = %user_id, usage_type = %usage_type))]
    pub async fn check_usage_limit_at(
        &self,
        user_id: &UserId,
        usage_type: UsageType,
        now: DateTime<Utc>,
    ) -> UsageCheck {
        let start = Instant::now();
        let check = self.evaluate(user_id, usage_type, now).await;

        metrics::counter!(
            "billing_usage_checks_total",
            "usage_type" => usage_type.as_str(),
            "outcome" => outcome_label(check.outcome)
        )
        .increment(1);
        metrics::histogram!("billing_operation_duration_seconds", "operation" => "check_usage")
            .record(start.elapsed().as_secs_f64());

        check
    }

    async fn evaluate(&self, user_id: &UserId, usage_type: UsageType, now: DateTime<Utc>) -> UsageCheck {
        let tier = match self.resolver.resolve(user_id).await {
            Ok(tier) => tier,
            Err(e) => {
                warn!(error = %e, "Tier lookup failed, denying");
                let limit = limit_for(Tier::Free, usage_type);
                return UsageCheck {
                    allowed: false,
                    tier: Tier::Free,
                    usage_type,
                    used: 0,
                    limit,
                    remaining: Limit::Finite(0),
                    outcome: CheckOutcome::TierUnavailable,
                    error: Some(e.to_string()),
                };
            }
        };

        let limit = limit_for(tier, usage_type);
        if limit.is_unlimited() {
            return UsageCheck::unlimited(tier, usage_type);
        }

        let period = UsagePeriod::containing(now);
        match self.usage.get_period(user_id.0, period).await {
            Ok(row) => {
                let used = row.map(|r| r.counts().get(usage_type)).unwrap_or(0);
                let check = UsageCheck::evaluate(tier, usage_type, used, limit);
                debug!(tier = %tier, used, limit = %limit, allowed = check.allowed, "Usage checked");
                check
            }
            Err(e) => {
                warn!(error = %e, tier = %tier, "Usage ledger read failed, allowing");
                UsageCheck {
                    allowed: true,
                    tier,
                    usage_type,
                    used: 0,
                    limit,
                    remaining: limit,
                    outcome: CheckOutcome::LedgerUnavailable,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Record one action of `usage_type` in the current period.
    ///
    /// Call only after the gated action has committed.
    pub async fn increment_usage(
        &self,
        user_id: &UserId,
        usage_type: UsageType,
    ) -> Result<(), BillingError> {
        self.increment_usage_at(user_id, usage_type, Utc::now()).await
    }

    /// [`increment_usage`](Self::increment_usage) into the period containing `now`
    #[instrument(skip(self), fields(user_id = %user_id, usage_type = %usage_type))]
    pub async fn increment_usage_at(
        &self,
        user_id: &UserId,
        usage_type: UsageType,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        let period = UsagePeriod::containing(now);
        self.usage.increment(user_id.0, period, usage_type).await?;
        debug!(period = %period, "Usage incremented");
        Ok(())
    }

    /// Check and, when denied, describe the denial for the caller
    pub async fn enforce_usage_limit(&self, user_id: &UserId, usage_type: UsageType) -> Enforcement {
        let check = self.check_usage_limit(user_id, usage_type).await;
        Self::enforcement_for(check)
    }

    /// Turn a check into an allow/deny decision
    pub fn enforcement_for(check: UsageCheck) -> Enforcement {
        if check.allowed {
            return Enforcement::Allowed(check);
        }

        let denial = UsageDenial::from_check(&check);
        info!(
            tier = %denial.tier,
            usage_type = %denial.usage_type,
            used = denial.used,
            limit = %denial.limit,
            reason = ?denial.reason,
            "Usage denied"
        );
        metrics::counter!(
            "billing_usage_denied_total",
            "usage_type" => denial.usage_type.as_str()
        )
        .increment(1);

        Enforcement::Denied(denial)
    }

    /// Every counter for a period, alongside the tier's limits
    #[instrument(skip(self), fields(user_id = %user_id, period = %period))]
    pub async fn usage_summary(
        &self,
        user_id: &UserId,
        period: UsagePeriod,
    ) -> Result<UsageSummary, BillingError> {
        let tier = self.resolver.resolve(user_id).await?;
        let counts = self
            .usage
            .get_period(user_id.0, period)
            .await?
            .map(|row| row.counts())
            .unwrap_or_default();

        Ok(UsageSummary {
            user_id: *user_id,
            period,
            tier,
            usage: summary_lines(tier, &counts),
        })
    }
}

fn summary_lines(tier: Tier, counts: &UsageCounts) -> BTreeMap<UsageType, UsageLine> {
    UsageType::ALL
        .into_iter()
        .map(|usage_type| {
            let used = counts.get(usage_type);
            let limit = limit_for(tier, usage_type);
            let line = UsageLine {
                used,
                limit,
                remaining: limit.remaining(used),
            };
            (usage_type, line)
        })
        .collect()
}

fn outcome_label(outcome: CheckOutcome) -> &'static str {
    match outcome {
        CheckOutcome::Unlimited => "unlimited",
        CheckOutcome::WithinLimit => "within_limit",
        CheckOutcome::LimitReached => "limit_reached",
        CheckOutcome::TierUnavailable => "tier_unavailable",
        CheckOutcome::LedgerUnavailable => "ledger_unavailable",
    }
}

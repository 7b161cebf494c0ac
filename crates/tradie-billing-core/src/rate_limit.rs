//! Persisted burst rate limiting for outbound messaging
//!
//! Fixed windows counted in the `rate_limits` table so every service instance
//! shares the same counts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use tradie_db::RateLimitRepository;
use tradie_types::{UsageType, UserId};

use crate::{BillingError, RatePolicy};

/// Result of a rate limit hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Hits in the current window, including this one
    pub hits: u32,
    /// Window maximum, if a policy applies
    pub limit: Option<u32>,
    /// Seconds until the window resets
    pub retry_after_secs: u64,
}

impl RateDecision {
    fn unlimited() -> Self {
        Self {
            allowed: true,
            hits: 0,
            limit: None,
            retry_after_secs: 0,
        }
    }
}

/// Fixed-window limiter over [`RateLimitRepository`]
#[derive(Clone)]
pub struct PersistentRateLimiter {
    repo: Arc<dyn RateLimitRepository>,
    policies: HashMap<UsageType, RatePolicy>,
}

impl PersistentRateLimiter {
    /// Create a limiter enforcing `policies`
    pub fn new(repo: Arc<dyn RateLimitRepository>, policies: HashMap<UsageType, RatePolicy>) -> Self {
        Self { repo, policies }
    }

    /// Record a hit for the user's `usage_type` window. Storage failures allow.
    pub async fn hit(&self, user_id: &UserId, usage_type: UsageType, now: DateTime<Utc>) -> RateDecision {
        let Some(policy) = self.policies.get(&usage_type).copied() else {
            return RateDecision::unlimited();
        };

        let window_secs = policy.window.as_secs().max(1) as i64;
        let start_ts = now.timestamp().div_euclid(window_secs) * window_secs;
        let Some(window_start) = DateTime::<Utc>::from_timestamp(start_ts, 0) else {
            return RateDecision::unlimited();
        };
        let retry_after_secs = (start_ts + window_secs - now.timestamp()).max(0) as u64;

        let key = format!("{usage_type}:{user_id}");
        match self.repo.hit(&key, window_start).await {
            Ok(hits) => {
                let allowed = hits <= policy.max_hits;
                debug!(key = %key, hits, max = policy.max_hits, allowed, "Rate limit hit");
                RateDecision {
                    allowed,
                    hits,
                    limit: Some(policy.max_hits),
                    retry_after_secs,
                }
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Rate limit storage failed, allowing");
                RateDecision {
                    allowed: true,
                    hits: 0,
                    limit: Some(policy.max_hits),
                    retry_after_secs: 0,
                }
            }
        }
    }

    /// Delete windows that ended more than a day ago
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<u64, BillingError> {
        let deleted = self
            .repo
            .delete_windows_before(now - chrono::Duration::days(1))
            .await?;
        Ok(deleted)
    }
}

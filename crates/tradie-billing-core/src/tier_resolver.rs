//! Tier resolution with caching

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use tradie_db::ProfileRepository;
use tradie_types::{Tier, UserId};

use crate::BillingError;

/// Resolves a user's tier from their profile, caching successful lookups
#[derive(Clone)]
pub struct TierResolver {
    profiles: Arc<dyn ProfileRepository>,
    tier_cache: Cache<UserId, Tier>,
}

impl TierResolver {
    /// Create a resolver whose cached tiers live for `ttl`
    pub fn new(profiles: Arc<dyn ProfileRepository>, ttl: Duration) -> Self {
        Self {
            profiles,
            tier_cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(10_000)
                .build(),
        }
    }

    /// Get the user's tier.
    ///
    /// A stored tier that is empty or unrecognized resolves to free. A missing
    /// profile or a failed lookup is an error; failures are never cached.
    pub async fn resolve(&self, user_id: &UserId) -> Result<Tier, BillingError> {
        if let Some(tier) = self.tier_cache.get(user_id).await {
            return Ok(tier);
        }

        let profile = self
            .profiles
            .find_by_id(user_id.0)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        let tier = profile.tier();
        debug!(user_id = %user_id, tier = %tier, "Resolved tier from profile");

        self.tier_cache.insert(*user_id, tier).await;

        Ok(tier)
    }

    /// Drop the cached tier for a user
    pub async fn invalidate(&self, user_id: &UserId) {
        self.tier_cache.invalidate(user_id).await;
    }
}

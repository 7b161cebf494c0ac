//! Offline subscription fallback
//!
//! Every successful online check overwrites a snapshot in the local store.
//! When the online check fails the snapshot is used instead, provided it was
//! written by this schema version, for this user, and within the grace window.
//! Anything else resolves to the free tier.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tradie_types::{SubscriptionProvider, SubscriptionState, Tier, UserId};

use crate::{KeyValueStore, OfflineCacheConfig, Result, SubscriptionChecker};

/// Bumped whenever the snapshot layout changes
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Snapshots dated further ahead than this are not trusted
const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Persisted copy of the last online subscription check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSubscriptionSnapshot {
    pub schema_version: u32,
    pub user_id: UserId,
    pub tier: Tier,
    pub provider: SubscriptionProvider,
    pub expires_at: Option<DateTime<Utc>>,
    pub cached_at: DateTime<Utc>,
}

impl CachedSubscriptionSnapshot {
    /// Snapshot of `state` for `user_id` taken at `now`
    pub fn new(user_id: UserId, state: &SubscriptionState, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            user_id,
            tier: state.tier,
            provider: state.provider,
            expires_at: state.expires_at,
            cached_at: now,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        SubscriptionState {
            tier: self.tier,
            provider: self.provider,
            expires_at: self.expires_at,
        }
    }
}

/// Where a resolved subscription came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionSource {
    /// Fresh from the billing API
    Online,
    /// From a valid local snapshot
    Cache,
    /// Nothing usable; free tier assumed
    Default,
}

impl SubscriptionSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Cache => "cache",
            Self::Default => "default",
        }
    }
}

/// Subscription as seen by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSubscription {
    pub tier: Tier,
    pub provider: SubscriptionProvider,
    pub expires_at: Option<DateTime<Utc>>,
    pub source: SubscriptionSource,
}

impl ResolvedSubscription {
    fn from_state(state: SubscriptionState, source: SubscriptionSource) -> Self {
        Self {
            tier: state.tier,
            provider: state.provider,
            expires_at: state.expires_at,
            source,
        }
    }

    fn free(source: SubscriptionSource) -> Self {
        Self::from_state(SubscriptionState::free(), source)
    }
}

#[derive(Debug)]
enum Rejection {
    SchemaVersion(u32),
    OtherUser,
    Stale { age_hours: i64 },
    FromTheFuture,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SchemaVersion(v) => write!(f, "schema version {v} != {SNAPSHOT_SCHEMA_VERSION}"),
            Self::OtherUser => f.write_str("snapshot belongs to another user"),
            Self::Stale { age_hours } => write!(f, "snapshot is {age_hours}h old"),
            Self::FromTheFuture => f.write_str("snapshot is dated in the future"),
        }
    }
}

/// Subscription lookup with a persisted offline fallback
#[derive(Clone)]
pub struct OfflineSubscriptionCache {
    store: Arc<dyn KeyValueStore>,
    config: OfflineCacheConfig,
}

impl OfflineSubscriptionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: OfflineCacheConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &OfflineCacheConfig {
        &self.config
    }

    /// Resolve the user's subscription, online first
    pub async fn get_subscription_with_offline_fallback(
        &self,
        user_id: &UserId,
        checker: &dyn SubscriptionChecker,
    ) -> ResolvedSubscription {
        self.get_subscription_with_offline_fallback_at(user_id, checker, Utc::now())
            .await
    }

    /// Resolve the user's subscription as of `now`
    #[instrument(skip(self, checker, now), fields(user_id = %user_id))]
    pub async fn get_subscription_with_offline_fallback_at(
        &self,
        user_id: &UserId,
        checker: &dyn SubscriptionChecker,
        now: DateTime<Utc>,
    ) -> ResolvedSubscription {
        let resolved = match checker.check_subscription(user_id).await {
            Ok(state) => {
                if let Err(e) = self.save_snapshot(user_id, &state, now).await {
                    warn!(error = %e, "Failed to persist subscription snapshot");
                }
                ResolvedSubscription::from_state(state, SubscriptionSource::Online)
            }
            Err(e) => {
                warn!(error = %e, "Online subscription check failed, using snapshot");
                self.resolve_offline(user_id, now).await
            }
        };

        metrics::counter!(
            "tradie_client_subscription_resolutions_total",
            "source" => resolved.source.as_str()
        )
        .increment(1);

        resolved
    }

    /// Resolve from the snapshot alone
    pub async fn resolve_offline(&self, user_id: &UserId, now: DateTime<Utc>) -> ResolvedSubscription {
        let Some(snapshot) = self.load_snapshot(user_id, now).await else {
            info!("No usable subscription snapshot, assuming free");
            return ResolvedSubscription::free(SubscriptionSource::Default);
        };

        let state = snapshot.state();
        if state.is_expired_at(now) {
            debug!(expires_at = ?state.expires_at, "Cached subscription has expired");
            return ResolvedSubscription::free(SubscriptionSource::Cache);
        }

        ResolvedSubscription::from_state(state, SubscriptionSource::Cache)
    }

    /// Overwrite the snapshot with `state`
    pub async fn save_snapshot(
        &self,
        user_id: &UserId,
        state: &SubscriptionState,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let snapshot = CachedSubscriptionSnapshot::new(*user_id, state, now);
        let json = serde_json::to_string(&snapshot)?;
        self.store.set(&self.config.storage_key, &json).await
    }

    /// Load the snapshot if it is usable for `user_id` at `now`
    pub async fn load_snapshot(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Option<CachedSubscriptionSnapshot> {
        let raw = match self.store.get(&self.config.storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read subscription snapshot");
                return None;
            }
        };

        let snapshot: CachedSubscriptionSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable subscription snapshot");
                self.discard().await;
                return None;
            }
        };

        match self.validate(&snapshot, user_id, now) {
            Ok(()) => Some(snapshot),
            Err(rejection) => {
                info!(reason = %rejection, "Rejected subscription snapshot");
                if !matches!(rejection, Rejection::OtherUser) {
                    self.discard().await;
                }
                None
            }
        }
    }

    /// Delete the snapshot, e.g. on sign-out
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&self.config.storage_key).await
    }

    fn validate(
        &self,
        snapshot: &CachedSubscriptionSnapshot,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), Rejection> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(Rejection::SchemaVersion(snapshot.schema_version));
        }
        if snapshot.user_id != *user_id {
            return Err(Rejection::OtherUser);
        }

        let age = now - snapshot.cached_at;
        if age < -Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(Rejection::FromTheFuture);
        }
        let grace = Duration::from_std(self.config.grace_period).unwrap_or(Duration::MAX);
        if age > grace {
            return Err(Rejection::Stale {
                age_hours: age.num_hours(),
            });
        }

        Ok(())
    }

    async fn discard(&self) {
        if let Err(e) = self.clear().await {
            warn!(error = %e, "Failed to remove subscription snapshot");
        }
    }
}

//! Tradie Client - SDK for app and web clients
//!
//! Subscription lookups against the billing API, with a persisted snapshot
//! used when the device is offline, plus optimistic usage gating derived from
//! the shared tier table. The server remains the enforcement authority.

pub mod api;
pub mod config;
pub mod error;
pub mod gating;
pub mod offline;
pub mod store;

pub use api::{BillingApiClient, SubscriptionChecker, SubscriptionResponse};
pub use config::{ClientConfig, OfflineCacheConfig};
pub use error::{ClientError, Result};
pub use gating::UsageGate;
pub use offline::{
    CachedSubscriptionSnapshot, OfflineSubscriptionCache, ResolvedSubscription, SubscriptionSource,
    SNAPSHOT_SCHEMA_VERSION,
};
pub use store::{FileStore, KeyValueStore, MemoryStore};

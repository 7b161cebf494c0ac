//! Common test utilities for tradie-billing-core integration tests

pub mod mock_repos;

#[allow(unused_imports)]
pub use mock_repos::*;

use std::sync::Arc;
use std::time::Duration;

use tradie_billing_core::{TierResolver, UsageEnforcer};

/// Enforcer wired to mock repositories
#[allow(dead_code)]
pub struct EnforcerHarness {
    pub profiles: MockProfileRepository,
    pub usage: MockUsageRepository,
    pub resolver: TierResolver,
    pub enforcer: UsageEnforcer,
}

#[allow(dead_code)]
impl EnforcerHarness {
    pub fn new() -> Self {
        Self::with_cache_ttl(Duration::from_secs(60))
    }

    pub fn with_cache_ttl(ttl: Duration) -> Self {
        let profiles = MockProfileRepository::new();
        let usage = MockUsageRepository::new();
        let resolver = TierResolver::new(Arc::new(profiles.clone()), ttl);
        let enforcer = UsageEnforcer::new(resolver.clone(), Arc::new(usage.clone()));
        Self {
            profiles,
            usage,
            resolver,
            enforcer,
        }
    }
}

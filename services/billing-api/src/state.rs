//! Application state for the Billing API service.

use std::sync::Arc;

use tradie_billing_core::{
    BillingError, HttpEmailSender, IdempotencyGuard, InvoiceNotifier, PersistentRateLimiter,
    RecurringInvoiceGenerator, StripeSignatureVerifier, TierResolver, UsageEnforcer,
    WebhookEventHandler,
};
use tradie_db::{DbPool, ProfileRepository, Repositories};

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Quota checks and usage counters
    pub enforcer: UsageEnforcer,
    /// Burst limits for outbound messaging
    pub limiter: PersistentRateLimiter,
    /// At-most-once webhook processing
    pub guard: IdempotencyGuard,
    /// Webhook side effects
    pub events: WebhookEventHandler,
    /// Recurring invoice generation
    pub generator: RecurringInvoiceGenerator,
    /// Profile lookups for the subscription endpoint
    pub profiles: Arc<dyn ProfileRepository>,
    /// Platform webhook signatures
    pub platform_verifier: StripeSignatureVerifier,
    /// Connect webhook signatures
    pub connect_verifier: StripeSignatureVerifier,
    /// Database pool (readiness probe)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every component over the Postgres repositories
    pub fn new(repos: Repositories, pool: DbPool, config: Config) -> Result<Self, BillingError> {
        let billing = Arc::new(config.billing.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repos.profiles);

        let resolver = TierResolver::new(profiles.clone(), billing.tier_cache_ttl);
        let enforcer = UsageEnforcer::new(resolver.clone(), Arc::new(repos.usage));
        let limiter = PersistentRateLimiter::new(
            Arc::new(repos.rate_limits),
            billing.rate_policies.clone(),
        );
        let guard = IdempotencyGuard::new(
            Arc::new(repos.webhook_events),
            billing.webhook_retention_days,
        );

        let invoices = Arc::new(repos.invoices);
        let events = WebhookEventHandler::new(
            profiles.clone(),
            invoices.clone(),
            resolver,
            billing.clone(),
        );

        let notifier = match &config.email_function_url {
            Some(url) => Some(Arc::new(HttpEmailSender::new(
                url.clone(),
                config.email_function_key.clone(),
            )?) as Arc<dyn InvoiceNotifier>),
            None => {
                tracing::warn!("EMAIL_FUNCTION_URL not set, recurring invoices will not be emailed");
                None
            }
        };
        let generator = RecurringInvoiceGenerator::new(
            enforcer.clone(),
            invoices,
            Arc::new(repos.clients),
            notifier,
        );

        let platform_verifier = StripeSignatureVerifier::new(billing.stripe_webhook_secret.clone())
            .with_tolerance_secs(billing.signature_tolerance_secs);
        let connect_verifier = StripeSignatureVerifier::new(billing.connect_secret())
            .with_tolerance_secs(billing.signature_tolerance_secs);

        Ok(Self {
            enforcer,
            limiter,
            guard,
            events,
            generator,
            profiles,
            platform_verifier,
            connect_verifier,
            pool,
            config: Arc::new(config),
        })
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("http_port", &self.config.http_port)
            .field("scheduler", &self.config.scheduler)
            .finish_non_exhaustive()
    }
}

//! Tradie Billing Core - Usage enforcement and billing-cycle logic
//!
//! Server-side policy for the TradieMate billing subsystem:
//! - quota checks and usage counters ([`UsageEnforcer`])
//! - at-most-once webhook processing ([`IdempotencyGuard`])
//! - provider webhook verification and subscription sync
//! - scheduled recurring invoice generation ([`RecurringInvoiceGenerator`])
//! - persisted burst rate limits for outbound messaging
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tradie_billing_core::{BillingConfig, Enforcement, TierResolver, UsageEnforcer};
//! use tradie_db::Repositories;
//!
//! let repos = Repositories::new(pool);
//! let config = BillingConfig::new("whsec_...");
//! let resolver = TierResolver::new(Arc::new(repos.profiles.clone()), config.tier_cache_ttl);
//! let enforcer = UsageEnforcer::new(resolver, Arc::new(repos.usage.clone()));
//!
//! match enforcer.enforce_usage_limit(&user_id, UsageType::Invoices).await {
//!     Enforcement::Allowed(_) => { /* create the invoice, then increment */ }
//!     Enforcement::Denied(denial) => { /* show denial.message */ }
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod notifier;
pub mod numbering;
pub mod rate_limit;
pub mod recurring;
pub mod tier_resolver;
pub mod usage;
pub mod webhook;

pub use config::{BillingConfig, RatePolicy};
pub use error::BillingError;
pub use events::WebhookEventHandler;
pub use idempotency::{IdempotencyGuard, IncomingEvent, ProcessedWebhook};
pub use notifier::{HttpEmailSender, InvoiceNotification, InvoiceNotifier, DEFAULT_EMAIL_TIMEOUT};
pub use numbering::next_invoice_number;
pub use rate_limit::{PersistentRateLimiter, RateDecision};
pub use recurring::{
    GenerationSummary, RecurringInvoiceGenerator, SkipReason, TemplateResult, TemplateStatus,
};
pub use tier_resolver::TierResolver;
pub use usage::{Enforcement, UsageEnforcer, UsageLine, UsageSummary};
pub use webhook::{
    constant_time_eq, sign_stripe_payload, verify_revenuecat_auth, RevenueCatEvent, StripeEvent,
    StripeSignatureVerifier,
};

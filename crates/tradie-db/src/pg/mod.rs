//! PostgreSQL repository implementations

mod client;
mod invoice;
mod profile;
mod rate_limit;
mod usage;
mod webhook_event;

pub use client::PgClientRepository;
pub use invoice::PgInvoiceRepository;
pub use profile::PgProfileRepository;
pub use rate_limit::PgRateLimitRepository;
pub use usage::PgUsageRepository;
pub use webhook_event::PgWebhookEventRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub profiles: PgProfileRepository,
    pub clients: PgClientRepository,
    pub usage: PgUsageRepository,
    pub webhook_events: PgWebhookEventRepository,
    pub invoices: PgInvoiceRepository,
    pub rate_limits: PgRateLimitRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            profiles: PgProfileRepository::new(pool.clone()),
            clients: PgClientRepository::new(pool.clone()),
            usage: PgUsageRepository::new(pool.clone()),
            webhook_events: PgWebhookEventRepository::new(pool.clone()),
            invoices: PgInvoiceRepository::new(pool.clone()),
            rate_limits: PgRateLimitRepository::new(pool),
        }
    }
}

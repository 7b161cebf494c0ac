//! Configuration for the Billing API service.

use std::time::Duration;

use tradie_billing_core::config::parse_tier_map;
use tradie_billing_core::{BillingConfig, RatePolicy};
use tradie_types::UsageType;

/// Billing API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Shared secret for `/internal/*` (`x-cron-secret`)
    pub cron_secret: String,
    /// Email-sending function endpoint; notifications are off when unset
    pub email_function_url: Option<String>,
    /// Bearer key for the email-sending function
    pub email_function_key: Option<String>,
    /// In-process scheduler for daily jobs
    pub scheduler: SchedulerConfig,
}

/// In-process job scheduler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Database
        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        // Server
        let http_port = parse_or(&var, "HTTP_PORT", 8081u16)?;
        let request_timeout_secs: u64 = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?;
        let metrics_enabled = parse_or(&var, "METRICS_ENABLED", true)?;

        // Webhook secrets
        let stripe_webhook_secret =
            var("STRIPE_WEBHOOK_SECRET").ok_or(ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;
        let cron_secret = var("CRON_SECRET").ok_or(ConfigError::Missing("CRON_SECRET"))?;

        let mut billing = BillingConfig::new(stripe_webhook_secret)
            .with_webhook_retention_days(parse_or(&var, "WEBHOOK_RETENTION_DAYS", 90)?)
            .with_tier_cache_ttl(Duration::from_secs(parse_or(&var, "TIER_CACHE_TTL_SECS", 60)?))
            .with_rate_policy(
                UsageType::Sms,
                RatePolicy::per_minute(parse_or(&var, "SMS_RATE_LIMIT_PER_MINUTE", 10)?),
            )
            .with_rate_policy(
                UsageType::Emails,
                RatePolicy::per_minute(parse_or(&var, "EMAIL_RATE_LIMIT_PER_MINUTE", 30)?),
            );

        if let Some(secret) = var("STRIPE_CONNECT_WEBHOOK_SECRET") {
            billing = billing.with_connect_secret(secret);
        }
        if let Some(auth) = var("REVENUECAT_WEBHOOK_AUTH") {
            billing = billing.with_revenuecat_auth(auth);
        }

        // Provider id -> tier maps
        if let Some(raw) = var("STRIPE_PRICE_TIERS") {
            for (price_id, tier) in
                parse_tier_map(&raw).map_err(|_| ConfigError::Invalid("STRIPE_PRICE_TIERS"))?
            {
                billing = billing.with_price(price_id, tier);
            }
        }
        if let Some(raw) = var("REVENUECAT_ENTITLEMENT_TIERS") {
            for (id, tier) in parse_tier_map(&raw)
                .map_err(|_| ConfigError::Invalid("REVENUECAT_ENTITLEMENT_TIERS"))?
            {
                billing = billing.with_entitlement(id, tier);
            }
        }

        // Scheduler
        let scheduler = SchedulerConfig {
            enabled: parse_or(&var, "SCHEDULER_ENABLED", false)?,
            interval: Duration::from_secs(parse_or(&var, "SCHEDULER_INTERVAL_SECS", 86_400u64)?),
        };
        if scheduler.interval.is_zero() {
            return Err(ConfigError::Invalid("SCHEDULER_INTERVAL_SECS"));
        }

        Ok(Self {
            http_port,
            database_url,
            billing,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
            cron_secret,
            email_function_url: var("EMAIL_FUNCTION_URL"),
            email_function_key: var("EMAIL_FUNCTION_KEY"),
            scheduler,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

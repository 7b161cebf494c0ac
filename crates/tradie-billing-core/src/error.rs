//! Billing errors

use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Profile not found
    #[error("profile not found")]
    ProfileNotFound,

    /// Invoice not found
    #[error("invoice not found")]
    InvoiceNotFound,

    /// Stripe price has no configured tier
    #[error("no tier configured for price {0}")]
    UnknownPrice(String),

    /// Webhook signature or authorization check failed
    #[error("webhook verification failed: {0}")]
    WebhookVerification(String),

    /// Webhook payload could not be parsed
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Outbound notification failed
    #[error("notification failed: {0}")]
    Notification(String),

    /// Invoice date arithmetic left the supported calendar range
    #[error("date out of range")]
    DateOutOfRange,

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] tradie_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProfileNotFound | Self::InvoiceNotFound)
    }

    /// Check if the caller sent something we must reject (4xx rather than 5xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::WebhookVerification(_) | Self::InvalidPayload(_))
    }
}

//! Common error types

use thiserror::Error;

/// Errors raised when parsing domain values from their string forms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown subscription tier
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    /// Unknown usage type
    #[error("invalid usage type: {0}")]
    InvalidUsageType(String),

    /// Period string is not `YYYY-MM`
    #[error("invalid usage period: {0}")]
    InvalidPeriod(String),

    /// Unknown recurring interval
    #[error("invalid recurring interval: {0}")]
    InvalidInterval(String),

    /// Unknown webhook source
    #[error("invalid webhook source: {0}")]
    InvalidWebhookSource(String),

    /// Unknown invoice status
    #[error("invalid invoice status: {0}")]
    InvalidInvoiceStatus(String),
}

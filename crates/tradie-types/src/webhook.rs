//! Webhook event types

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Where a webhook event originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookSource {
    /// Stripe Connect (payments made to a tradie's connected account)
    Connect,
    /// Stripe platform account (TradieMate's own subscriptions)
    Platform,
    /// RevenueCat (in-app subscriptions)
    Revenuecat,
    /// Xero accounting sync
    Xero,
    /// Anything else
    Other,
}

impl WebhookSource {
    /// Source name as stored in `webhook_events.source`
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Platform => "platform",
            Self::Revenuecat => "revenuecat",
            Self::Xero => "xero",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for WebhookSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WebhookSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(Self::Connect),
            "platform" => Ok(Self::Platform),
            "revenuecat" => Ok(Self::Revenuecat),
            "xero" => Ok(Self::Xero),
            "other" => Ok(Self::Other),
            _ => Err(ParseError::InvalidWebhookSource(s.to_string())),
        }
    }
}

/// Recorded result of processing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingResult {
    /// Handler completed
    Success,
    /// Handler failed; the event id stays recorded as failed
    Error,
}

impl ProcessingResult {
    /// Result name as stored in `webhook_events.result`
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Parse a stored result; anything other than `success` reads as an error
    pub fn from_stored(s: &str) -> Self {
        if s == "success" {
            Self::Success
        } else {
            Self::Error
        }
    }
}

impl std::fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

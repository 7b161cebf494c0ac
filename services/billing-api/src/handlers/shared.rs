//! Shared handler utilities
//!
//! Common validation, metrics, and helper functions used across handlers.

use std::time::Instant;

use axum::http::HeaderMap;

use tradie_billing_core::constant_time_eq;
use tradie_types::{UsagePeriod, UsageType, UserId};

use crate::error::ApiError;

// ============================================================================
// Input Validation
// ============================================================================

/// Header carrying the scheduler's shared secret
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Maximum length for user-provided identifiers
const MAX_ID_LEN: usize = 64;

/// Parse a user ID from a request.
pub fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    validate_length(raw, "user_id")?;
    UserId::parse(raw.trim()).map_err(|_| ApiError::BadRequest("Invalid user_id".into()))
}

/// Parse a usage type (`quotes`, `invoices`, `jobs`, `emails`, `sms`, `clients`).
pub fn parse_usage_type(raw: &str) -> Result<UsageType, ApiError> {
    validate_length(raw, "usage_type")?;
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid usage_type: {raw}")))
}

/// Parse an optional `YYYY-MM` period, defaulting to the current month.
pub fn parse_period(raw: Option<&str>) -> Result<UsagePeriod, ApiError> {
    match raw {
        Some(raw) => {
            validate_length(raw, "period")?;
            raw.parse()
                .map_err(|_| ApiError::BadRequest("period must be YYYY-MM".into()))
        }
        None => Ok(UsagePeriod::current()),
    }
}

fn validate_length(value: &str, field_name: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field_name} is required")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(ApiError::BadRequest(format!(
            "{field_name} too long (max {MAX_ID_LEN} chars)"
        )));
    }
    Ok(())
}

/// Require the `x-cron-secret` header to match.
pub fn require_cron_secret(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        tracing::warn!("Rejected internal request with wrong cron secret");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record HTTP operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "billing_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_parse_user_id() {
        let id = UserId::new();
        assert_eq!(parse_user_id(&id.to_string()).unwrap(), id);
        assert!(parse_user_id("").is_err());
        assert!(parse_user_id("not-a-uuid").is_err());
        assert!(parse_user_id(&"a".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_parse_usage_type() {
        assert_eq!(parse_usage_type("sms").unwrap(), UsageType::Sms);
        assert_eq!(parse_usage_type("Invoice").unwrap(), UsageType::Invoices);
        assert!(parse_usage_type("widgets").is_err());
        assert!(parse_usage_type("").is_err());
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period(Some("2025-03")).unwrap().to_string(), "2025-03");
        assert_eq!(parse_period(None).unwrap(), UsagePeriod::current());
        assert!(parse_period(Some("2025-13")).is_err());
        assert!(parse_period(Some("March")).is_err());
    }

    #[test]
    fn test_cron_secret() {
        let mut headers = HeaderMap::new();
        assert!(require_cron_secret(&headers, "s3cret").is_err());

        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(require_cron_secret(&headers, "s3cret").is_err());

        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(require_cron_secret(&headers, "s3cret").is_ok());
    }
}

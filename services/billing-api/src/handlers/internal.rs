//! Scheduler-triggered maintenance handlers
//!
//! Both endpoints require the `x-cron-secret` header.

use std::time::Instant;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use tradie_billing_core::GenerationSummary;

use crate::error::ApiResult;
use crate::handlers::shared::{record_op_duration, require_cron_secret};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub webhook_events_deleted: u64,
    pub rate_limit_windows_deleted: u64,
}

/// POST /internal/recurring-invoices/run
#[instrument(skip_all)]
pub async fn run_recurring_invoices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<GenerationSummary>> {
    require_cron_secret(&headers, &state.config.cron_secret)?;
    Ok(Json(run_recurring(&state).await?))
}

/// POST /internal/webhook-events/cleanup
#[instrument(skip_all)]
pub async fn cleanup_webhook_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CleanupResponse>> {
    require_cron_secret(&headers, &state.config.cron_secret)?;
    Ok(Json(run_cleanup(&state).await?))
}

/// Generate every due recurring invoice
pub async fn run_recurring(state: &AppState) -> ApiResult<GenerationSummary> {
    let start = Instant::now();
    let result = state.generator.run(Utc::now()).await;
    record_op_duration("recurring_invoices", start, result.is_ok());

    let summary = result?;
    info!(
        processed = summary.processed,
        created = summary.created,
        skipped = summary.skipped,
        errors = summary.errors,
        "Recurring invoice run finished"
    );
    Ok(summary)
}

/// Drop expired webhook records and rate limit windows
pub async fn run_cleanup(state: &AppState) -> ApiResult<CleanupResponse> {
    let start = Instant::now();
    let now = Utc::now();

    let result = async {
        let webhook_events_deleted = state.guard.cleanup(now).await?;
        let rate_limit_windows_deleted = state.limiter.cleanup(now).await?;
        Ok::<_, tradie_billing_core::BillingError>(CleanupResponse {
            success: true,
            webhook_events_deleted,
            rate_limit_windows_deleted,
        })
    }
    .await;
    record_op_duration("cleanup", start, result.is_ok());

    let response = result?;
    info!(
        webhook_events = response.webhook_events_deleted,
        rate_limit_windows = response.rate_limit_windows_deleted,
        "Cleanup finished"
    );
    Ok(response)
}

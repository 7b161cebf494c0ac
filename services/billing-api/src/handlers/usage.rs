//! Usage enforcement handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use tradie_billing_core::{Enforcement, UsageSummary};
use tradie_types::{UsageCheck, UsagePeriod, UsageType};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::{parse_period, parse_usage_type, parse_user_id, record_op_duration};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UsageRequest {
    pub user_id: String,
    pub usage_type: String,
}

#[derive(Debug, Serialize)]
pub struct IncrementResponse {
    pub success: bool,
    pub usage_type: UsageType,
    pub period: UsagePeriod,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub period: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/usage/check
///
/// Hot path. Reports the decision without acting on it.
#[instrument(skip(state, req), fields(user_id = %req.user_id, usage_type = %req.usage_type))]
pub async fn check_usage(
    State(state): State<AppState>,
    Json(req): Json<UsageRequest>,
) -> ApiResult<Json<UsageCheck>> {
    let start = Instant::now();
    let user_id = parse_user_id(&req.user_id)?;
    let usage_type = parse_usage_type(&req.usage_type)?;

    let check = state.enforcer.check_usage_limit(&user_id, usage_type).await;

    record_op_duration("check_usage", start, true);
    Ok(Json(check))
}

/// POST /api/v1/usage/enforce
///
/// 200 with the check when allowed, 403 with the denial when over quota,
/// 429 when a messaging burst limit is hit.
#[instrument(skip(state, req), fields(user_id = %req.user_id, usage_type = %req.usage_type))]
pub async fn enforce_usage(
    State(state): State<AppState>,
    Json(req): Json<UsageRequest>,
) -> ApiResult<Response> {
    let start = Instant::now();
    let user_id = parse_user_id(&req.user_id)?;
    let usage_type = parse_usage_type(&req.usage_type)?;

    let check = match state.enforcer.enforce_usage_limit(&user_id, usage_type).await {
        Enforcement::Allowed(check) => check,
        Enforcement::Denied(denial) => {
            record_op_duration("enforce_usage", start, true);
            return Ok((StatusCode::FORBIDDEN, Json(denial)).into_response());
        }
    };

    let rate = state.limiter.hit(&user_id, usage_type, Utc::now()).await;
    if !rate.allowed {
        info!(hits = rate.hits, limit = ?rate.limit, "Messaging burst limit hit");
        record_op_duration("enforce_usage", start, true);
        return Err(ApiError::RateLimited {
            retry_after_secs: rate.retry_after_secs,
        });
    }

    record_op_duration("enforce_usage", start, true);
    Ok(Json(check).into_response())
}

/// POST /api/v1/usage/increment
///
/// Call only after the gated action has committed.
#[instrument(skip(state, req), fields(user_id = %req.user_id, usage_type = %req.usage_type))]
pub async fn increment_usage(
    State(state): State<AppState>,
    Json(req): Json<UsageRequest>,
) -> ApiResult<Json<IncrementResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&req.user_id)?;
    let usage_type = parse_usage_type(&req.usage_type)?;

    let now = Utc::now();
    let result = state
        .enforcer
        .increment_usage_at(&user_id, usage_type, now)
        .await;
    record_op_duration("increment_usage", start, result.is_ok());
    result?;

    Ok(Json(IncrementResponse {
        success: true,
        usage_type,
        period: UsagePeriod::containing(now),
    }))
}

/// GET /api/v1/usage/{user_id}?period=YYYY-MM
#[instrument(skip(state, query))]
pub async fn get_usage(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<Json<UsageSummary>> {
    let start = Instant::now();
    let user_id = parse_user_id(&user_id)?;
    let period = parse_period(query.period.as_deref())?;

    let result = state.enforcer.usage_summary(&user_id, period).await;
    record_op_duration("get_usage", start, result.is_ok());

    Ok(Json(result?))
}

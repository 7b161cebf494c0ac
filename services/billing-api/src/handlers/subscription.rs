//! Subscription and tier table handlers

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;

use tradie_client::SubscriptionResponse;
use tradie_db::ProfileRepository;
use tradie_types::{tier_limit_table, TierLimits};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::{parse_user_id, record_op_duration};
use crate::state::AppState;

/// GET /api/v1/subscription/{user_id}
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&user_id)?;

    let profile = state
        .profiles
        .find_by_id(user_id.0)
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    record_op_duration("get_subscription", start, true);
    Ok(Json(SubscriptionResponse::new(
        user_id,
        &profile.subscription(),
    )))
}

/// GET /api/v1/tier-limits
///
/// `-1` means unlimited.
pub async fn get_tier_limits() -> Json<Vec<TierLimits>> {
    Json(tier_limit_table())
}

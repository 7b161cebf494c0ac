//! PostgreSQL fixed-window rate limit counters

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::repo::RateLimitRepository;

/// PostgreSQL rate limit repository
#[derive(Clone)]
pub struct PgRateLimitRepository {
    pool: PgPool,
}

impl PgRateLimitRepository {
    /// Create a new rate limit repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitRepository for PgRateLimitRepository {
    async fn hit(&self, key: &str, window_start: DateTime<Utc>) -> DbResult<u32> {
        let (hits,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO rate_limits (limiter_key, window_start, hits)
            VALUES ($1, $2, 1)
            ON CONFLICT (limiter_key, window_start)
            DO UPDATE SET hits = rate_limits.hits + 1
            RETURNING hits
            "#,
        )
        .bind(key)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(hits).unwrap_or(0))
    }

    async fn delete_windows_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE window_start < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

//! PostgreSQL usage ledger implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tradie_types::{UsagePeriod, UsageType};

use crate::error::DbResult;
use crate::models::UsageRow;
use crate::repo::UsageRepository;

/// PostgreSQL usage repository
#[derive(Clone)]
pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    /// Create a new usage repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn get_period(&self, user_id: Uuid, period: UsagePeriod) -> DbResult<Option<UsageRow>> {
        let usage = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT id, user_id, month_year, quotes_created, invoices_created, jobs_created,
                   emails_sent, sms_sent, clients_created, created_at, updated_at
            FROM usage_tracking
            WHERE user_id = $1 AND month_year = $2
            "#,
        )
        .bind(user_id)
        .bind(period.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    async fn increment(
        &self,
        user_id: Uuid,
        period: UsagePeriod,
        usage_type: UsageType,
    ) -> DbResult<()> {
        // Column names come from a closed enum, never from input.
        let column = usage_type.column();
        let sql = format!(
            r#"
            INSERT INTO usage_tracking (user_id, month_year, {column})
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, month_year)
            DO UPDATE SET {column} = usage_tracking.{column} + 1, updated_at = NOW()
            "#
        );

        sqlx::query(&sql)
            .bind(user_id)
            .bind(period.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

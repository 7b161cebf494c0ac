//! PostgreSQL webhook event log implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::WebhookEventRow;
use crate::repo::{NewWebhookEvent, WebhookEventRepository};

/// PostgreSQL webhook event repository
#[derive(Clone)]
pub struct PgWebhookEventRepository {
    pool: PgPool,
}

impl PgWebhookEventRepository {
    /// Create a new webhook event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PgWebhookEventRepository {
    async fn find_by_event_id(&self, event_id: &str) -> DbResult<Option<WebhookEventRow>> {
        let event = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            SELECT id, event_id, event_type, source, payload, result, error_message, processed_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn insert(&self, event: NewWebhookEvent) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type, source, payload, result, error_message)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT webhook_events_event_id_key DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(event.source.as_str())
        .bind(&event.payload)
        .bind(event.result.as_str())
        .bind(&event.error_message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_processed_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE processed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

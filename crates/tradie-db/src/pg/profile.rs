//! PostgreSQL profile repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tradie_types::SubscriptionState;

use crate::error::DbResult;
use crate::models::ProfileRow;
use crate::repo::ProfileRepository;

/// PostgreSQL profile repository
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a new profile repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>> {
        let profile = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, email, business_name, subscription_tier, subscription_provider,
                   subscription_expires_at, stripe_customer_id, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_stripe_customer_id(&self, customer_id: &str) -> DbResult<Option<ProfileRow>> {
        let profile = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, email, business_name, subscription_tier, subscription_provider,
                   subscription_expires_at, stripe_customer_id, updated_at
            FROM profiles
            WHERE stripe_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn update_subscription(&self, id: Uuid, state: &SubscriptionState) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_tier = $1,
                subscription_provider = $2,
                subscription_expires_at = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(state.tier.as_str())
        .bind(state.provider.as_str())
        .bind(state.expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

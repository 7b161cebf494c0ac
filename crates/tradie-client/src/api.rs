//! Billing API client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use tradie_types::{SubscriptionProvider, SubscriptionState, Tier, UserId};

use crate::{ClientConfig, Result};

/// Online source of a user's subscription state
#[async_trait]
pub trait SubscriptionChecker: Send + Sync {
    /// Fetch the authoritative subscription state
    async fn check_subscription(&self, user_id: &UserId) -> Result<SubscriptionState>;
}

/// Body of `GET /api/v1/subscription/{user_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub user_id: UserId,
    pub tier: Tier,
    pub provider: SubscriptionProvider,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionResponse {
    pub fn new(user_id: UserId, state: &SubscriptionState) -> Self {
        Self {
            user_id,
            tier: state.tier,
            provider: state.provider,
            expires_at: state.expires_at,
        }
    }

    pub fn into_state(self) -> SubscriptionState {
        SubscriptionState {
            tier: self.tier,
            provider: self.provider,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the billing API
#[derive(Debug, Clone)]
pub struct BillingApiClient {
    http: Client,
    config: ClientConfig,
}

impl BillingApiClient {
    /// Create a client from configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| crate::ClientError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the subscription for `user_id`
    #[instrument(skip(self), level = "debug")]
    pub async fn get_subscription(&self, user_id: &UserId) -> Result<SubscriptionResponse> {
        let url = format!("{}/api/v1/subscription/{user_id}", self.config.base_url());

        let mut request = self.http.get(&url);
        if let Some(key) = self.config.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(status = %status, message = %message, "Subscription request failed");
            return Err(crate::ClientError::from_status(status.as_u16(), message));
        }

        let subscription: SubscriptionResponse = response.json().await?;
        if subscription.user_id != *user_id {
            return Err(crate::ClientError::Serialization(format!(
                "response for {} does not match {user_id}",
                subscription.user_id
            )));
        }

        debug!(tier = %subscription.tier, "Fetched subscription");
        Ok(subscription)
    }
}

#[async_trait]
impl SubscriptionChecker for BillingApiClient {
    async fn check_subscription(&self, user_id: &UserId) -> Result<SubscriptionState> {
        Ok(self.get_subscription(user_id).await?.into_state())
    }
}

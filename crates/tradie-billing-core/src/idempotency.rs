//! Webhook idempotency
//!
//! Providers deliver events at least once. The guard runs a handler at most
//! once per provider event ID and replays the recorded result for every later
//! delivery, including recorded failures.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use tradie_db::{NewWebhookEvent, WebhookEventRepository, WebhookEventRow};
use tradie_types::{ProcessingResult, WebhookSource};

use crate::BillingError;

/// A verified webhook event ready for processing
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    /// Provider event ID
    pub event_id: String,
    /// Provider event type
    pub event_type: String,
    /// Which endpoint/provider it came from
    pub source: WebhookSource,
    /// Raw payload, stored for auditing
    pub payload: serde_json::Value,
}

/// Outcome reported back to the webhook endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedWebhook {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_duplicate: bool,
}

impl ProcessedWebhook {
    fn replay(row: &WebhookEventRow) -> Self {
        Self {
            success: row.result() == ProcessingResult::Success,
            data: None,
            error: row.error_message.clone(),
            is_duplicate: true,
        }
    }
}

/// At-most-once webhook processing backed by the `webhook_events` log
#[derive(Clone)]
pub struct IdempotencyGuard {
    events: Arc<dyn WebhookEventRepository>,
    retention: Duration,
}

impl IdempotencyGuard {
    /// Create a guard keeping processed events for `retention_days`
    pub fn new(events: Arc<dyn WebhookEventRepository>, retention_days: u32) -> Self {
        Self {
            events,
            retention: Duration::days(i64::from(retention_days)),
        }
    }

    /// Run `handler` unless this event ID has already been processed.
    ///
    /// Returns an error only when the duplicate lookup itself fails, so the
    /// provider retries the delivery.
    #[instrument(skip(self, event, handler), fields(event_id = %event.event_id, event_type = %event.event_type, source = %event.source))]
    pub async fn process_with_idempotency<F, Fut>(
        &self,
        event: IncomingEvent,
        handler: F,
    ) -> Result<ProcessedWebhook, BillingError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<serde_json::Value>, BillingError>>,
    {
        if let Some(existing) = self.events.find_by_event_id(&event.event_id).await? {
            info!(stored_result = %existing.result, "Duplicate webhook event, skipping");
            record_metric(event.source, "duplicate");
            return Ok(ProcessedWebhook::replay(&existing));
        }

        let outcome = handler().await;
        let (result, data, error_message) = match outcome {
            Ok(data) => (ProcessingResult::Success, data, None),
            Err(e) => {
                error!(error = %e, "Webhook handler failed");
                (ProcessingResult::Error, None, Some(e.to_string()))
            }
        };
        record_metric(event.source, result.as_str());

        let processed = ProcessedWebhook {
            success: result == ProcessingResult::Success,
            data,
            error: error_message.clone(),
            is_duplicate: false,
        };

        let record = NewWebhookEvent {
            event_id: event.event_id.clone(),
            event_type: event.event_type,
            source: event.source,
            payload: event.payload,
            result,
            error_message,
        };

        match self.events.insert(record).await {
            Ok(true) => {
                debug!(result = %result, "Webhook event recorded");
                Ok(processed)
            }
            Ok(false) => {
                warn!("Concurrent delivery recorded this event first");
                match self.events.find_by_event_id(&event.event_id).await {
                    Ok(Some(winner)) => Ok(ProcessedWebhook::replay(&winner)),
                    Ok(None) => Ok(processed),
                    Err(e) => {
                        warn!(error = %e, "Could not read the concurrently recorded event");
                        Ok(processed)
                    }
                }
            }
            Err(e) => {
                // The handler's effects have already committed.
                error!(error = %e, "Failed to record processed webhook event");
                Ok(processed)
            }
        }
    }

    /// Delete events processed before the retention window
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<u64, BillingError> {
        let cutoff = now - self.retention;
        let deleted = self.events.delete_processed_before(cutoff).await?;
        info!(deleted, cutoff = %cutoff, "Old webhook events cleaned up");
        Ok(deleted)
    }
}

fn record_metric(source: WebhookSource, result: &'static str) {
    metrics::counter!(
        "billing_webhooks_processed_total",
        "source" => source.as_str(),
        "result" => result
    )
    .increment(1);
}

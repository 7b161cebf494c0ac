//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use tradie_types::{ProcessingResult, SubscriptionState, UsagePeriod, UsageType, WebhookSource};

use crate::error::DbResult;
use crate::models::*;

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find a profile by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>>;

    /// Find a profile by Stripe customer ID
    async fn find_by_stripe_customer_id(&self, customer_id: &str) -> DbResult<Option<ProfileRow>>;

    /// Update the subscription columns of a profile
    async fn update_subscription(&self, id: Uuid, state: &SubscriptionState) -> DbResult<()>;
}

/// Client repository trait
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Find a client by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ClientRow>>;
}

/// Usage ledger repository trait
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Get the counter row for a user and period
    async fn get_period(&self, user_id: Uuid, period: UsagePeriod) -> DbResult<Option<UsageRow>>;

    /// Increment one counter by 1, creating the row on first use
    async fn increment(&self, user_id: Uuid, period: UsagePeriod, usage_type: UsageType)
        -> DbResult<()>;
}

/// Webhook event log repository trait
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a processed event by provider event ID
    async fn find_by_event_id(&self, event_id: &str) -> DbResult<Option<WebhookEventRow>>;

    /// Record a processed event.
    ///
    /// Returns `false` when a row for the event ID already exists; the
    /// existing row is left untouched.
    async fn insert(&self, event: NewWebhookEvent) -> DbResult<bool>;

    /// Delete events processed before the cutoff, returning the count removed
    async fn delete_processed_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;
}

/// New webhook event input
#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub source: WebhookSource,
    pub payload: serde_json::Value,
    pub result: ProcessingResult,
    pub error_message: Option<String>,
}

/// Invoice repository trait
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Find an invoice by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InvoiceRow>>;

    /// Recurring templates due on or before `today` that are neither
    /// cancelled nor soft-deleted
    async fn find_due_templates(&self, today: NaiveDate) -> DbResult<Vec<InvoiceRow>>;

    /// Invoice number of the user's most recently created invoice
    async fn latest_invoice_number(&self, user_id: Uuid) -> DbResult<Option<String>>;

    /// Line items of an invoice in display order
    async fn line_items(&self, invoice_id: Uuid) -> DbResult<Vec<LineItemRow>>;

    /// Claim a recurring template for one cycle and insert the generated
    /// invoice with its line items, all in one transaction.
    ///
    /// The claim moves the template's `next_due_date` from
    /// `claim.current_due` to `claim.next_due` and only succeeds while the
    /// template still has `claim.current_due`. Returns `None` when the claim
    /// is lost, in which case nothing is written.
    async fn generate_from_template(
        &self,
        claim: TemplateClaim,
        invoice: CreateInvoice,
        line_items: Vec<CreateLineItem>,
    ) -> DbResult<Option<InvoiceRow>>;

    /// Mark an invoice as paid
    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> DbResult<()>;
}

/// One billing cycle of a recurring template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateClaim {
    pub template_id: Uuid,
    /// `next_due_date` as read when the template was listed
    pub current_due: Option<NaiveDate>,
    /// `next_due_date` after this cycle
    pub next_due: NaiveDate,
}

/// Create invoice input
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub invoice_number: String,
    pub status: String,
    pub subtotal_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub parent_invoice_id: Option<Uuid>,
}

/// Create line item input
#[derive(Debug, Clone)]
pub struct CreateLineItem {
    pub id: Uuid,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub sort_order: i32,
}

impl From<&LineItemRow> for CreateLineItem {
    /// Copy a line item by value under a fresh ID
    fn from(item: &LineItemRow) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            total_cents: item.total_cents,
            sort_order: item.sort_order,
        }
    }
}

/// Shared fixed-window rate limit counters
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Record one hit for `key` in the window starting at `window_start` and
    /// return the window's hit count including this one
    async fn hit(&self, key: &str, window_start: DateTime<Utc>) -> DbResult<u32>;

    /// Delete windows that started before the cutoff
    async fn delete_windows_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;
}

//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use tradie_types::{
    ProcessingResult, RecurringInterval, SubscriptionProvider, SubscriptionState, Tier,
    UsageCounts, UserId,
};

/// Profile row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: Option<String>,
    pub business_name: Option<String>,
    pub subscription_tier: Option<String>,
    pub subscription_provider: Option<String>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Client row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// Invoice row from the database (ordinary invoices and recurring templates)
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
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
    pub is_recurring: bool,
    pub recurring_interval: Option<String>,
    pub next_due_date: Option<NaiveDate>,
    pub parent_invoice_id: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Invoice line item row from the database
#[derive(Debug, Clone, FromRow)]
pub struct LineItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub sort_order: i32,
}

/// Monthly usage counter row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UsageRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub month_year: String,
    pub quotes_created: i32,
    pub invoices_created: i32,
    pub jobs_created: i32,
    pub emails_sent: i32,
    pub sms_sent: i32,
    pub clients_created: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Processed webhook event row from the database
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEventRow {
    pub id: Uuid,
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    pub payload: serde_json::Value,
    pub result: String,
    pub error_message: Option<String>,
    pub processed_at: DateTime<Utc>,
}

// Conversion implementations from Row types to tradie-types domain types
impl ProfileRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.id)
    }

    /// Stored tier, with unknown or missing values read as free
    pub fn tier(&self) -> Tier {
        self.subscription_tier
            .as_deref()
            .map(Tier::parse_or_free)
            .unwrap_or_default()
    }

    /// Stored subscription state
    pub fn subscription(&self) -> SubscriptionState {
        SubscriptionState {
            tier: self.tier(),
            provider: SubscriptionProvider::parse_or_none(self.subscription_provider.as_deref()),
            expires_at: self.subscription_expires_at,
        }
    }
}

impl InvoiceRow {
    /// Convert to domain UserId
    pub fn owner(&self) -> UserId {
        UserId(self.user_id)
    }

    /// Recurring interval, defaulting to monthly
    pub fn interval(&self) -> RecurringInterval {
        RecurringInterval::parse_or_default(self.recurring_interval.as_deref())
    }
}

impl UsageRow {
    /// Convert to domain counters; negative values read as zero
    pub fn counts(&self) -> UsageCounts {
        let clamp = |v: i32| u32::try_from(v).unwrap_or(0);
        UsageCounts {
            quotes_created: clamp(self.quotes_created),
            invoices_created: clamp(self.invoices_created),
            jobs_created: clamp(self.jobs_created),
            emails_sent: clamp(self.emails_sent),
            sms_sent: clamp(self.sms_sent),
            clients_created: clamp(self.clients_created),
        }
    }
}

impl WebhookEventRow {
    /// Stored processing result
    pub fn result(&self) -> ProcessingResult {
        ProcessingResult::from_stored(&self.result)
    }
}

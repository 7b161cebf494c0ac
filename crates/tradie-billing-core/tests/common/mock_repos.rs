//! Mock repositories for testing

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use tradie_billing_core::{BillingError, InvoiceNotification, InvoiceNotifier};
use tradie_db::{
    ClientRepository, ClientRow, CreateInvoice, CreateLineItem, DbError, DbResult,
    InvoiceRepository, InvoiceRow, LineItemRow, NewWebhookEvent, ProfileRepository, ProfileRow,
    RateLimitRepository, TemplateClaim, UsageRepository, UsageRow, WebhookEventRepository,
    WebhookEventRow,
};
use tradie_types::{SubscriptionState, UsagePeriod, UsageType, UserId};

fn db_down() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

// ============================================================================
// Profiles
// ============================================================================

/// In-memory profile repository for testing
#[derive(Default, Clone)]
pub struct MockProfileRepository {
    profiles: Arc<DashMap<Uuid, ProfileRow>>,
    pub fail: Arc<AtomicBool>,
    pub lookups: Arc<AtomicUsize>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile with the given stored tier string
    pub fn insert_user(&self, tier: Option<&str>) -> UserId {
        let row = Self::create_test_profile(tier);
        let id = row.id;
        self.profiles.insert(id, row);
        UserId(id)
    }

    /// Insert a profile row directly
    pub fn insert_profile(&self, row: ProfileRow) {
        self.profiles.insert(row.id, row);
    }

    pub fn create_test_profile(tier: Option<&str>) -> ProfileRow {
        ProfileRow {
            id: Uuid::new_v4(),
            email: Some(format!("test-{}@example.com", Uuid::new_v4())),
            business_name: Some("Test Plumbing".to_string()),
            subscription_tier: tier.map(str::to_string),
            subscription_provider: None,
            subscription_expires_at: None,
            stripe_customer_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &UserId) -> Option<ProfileRow> {
        self.profiles.get(&id.0).map(|r| r.value().clone())
    }

    pub fn set_tier(&self, id: &UserId, tier: &str) {
        if let Some(mut profile) = self.profiles.get_mut(&id.0) {
            profile.subscription_tier = Some(tier.to_string());
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        Ok(self.profiles.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_stripe_customer_id(&self, customer_id: &str) -> DbResult<Option<ProfileRow>> {
        Ok(self
            .profiles
            .iter()
            .find(|p| p.stripe_customer_id.as_deref() == Some(customer_id))
            .map(|r| r.value().clone()))
    }

    async fn update_subscription(&self, id: Uuid, state: &SubscriptionState) -> DbResult<()> {
        if let Some(mut profile) = self.profiles.get_mut(&id) {
            profile.subscription_tier = Some(state.tier.as_str().to_string());
            profile.subscription_provider = Some(state.provider.as_str().to_string());
            profile.subscription_expires_at = state.expires_at;
            profile.updated_at = Utc::now();
        }
        Ok(())
    }
}

// ============================================================================
// Usage ledger
// ============================================================================

/// In-memory usage ledger for testing
#[derive(Default, Clone)]
pub struct MockUsageRepository {
    rows: Arc<DashMap<(Uuid, String), UsageRow>>,
    pub fail_reads: Arc<AtomicBool>,
    pub fail_increments: Arc<AtomicBool>,
    pub reads: Arc<AtomicUsize>,
}

impl MockUsageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a counter directly
    pub fn set_count(&self, user: &UserId, period: UsagePeriod, usage_type: UsageType, value: i32) {
        let mut row = self
            .rows
            .entry((user.0, period.to_string()))
            .or_insert_with(|| empty_row(user.0, period));
        *column_mut(&mut row, usage_type) = value;
    }

    pub fn row(&self, user: &UserId, period: UsagePeriod) -> Option<UsageRow> {
        self.rows
            .get(&(user.0, period.to_string()))
            .map(|r| r.value().clone())
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

fn empty_row(user_id: Uuid, period: UsagePeriod) -> UsageRow {
    UsageRow {
        id: Uuid::new_v4(),
        user_id,
        month_year: period.to_string(),
        quotes_created: 0,
        invoices_created: 0,
        jobs_created: 0,
        emails_sent: 0,
        sms_sent: 0,
        clients_created: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn column_mut(row: &mut UsageRow, usage_type: UsageType) -> &mut i32 {
    match usage_type {
        UsageType::Quotes => &mut row.quotes_created,
        UsageType::Invoices => &mut row.invoices_created,
        UsageType::Jobs => &mut row.jobs_created,
        UsageType::Emails => &mut row.emails_sent,
        UsageType::Sms => &mut row.sms_sent,
        UsageType::Clients => &mut row.clients_created,
    }
}

#[async_trait]
impl UsageRepository for MockUsageRepository {
    async fn get_period(&self, user_id: Uuid, period: UsagePeriod) -> DbResult<Option<UsageRow>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        Ok(self
            .rows
            .get(&(user_id, period.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn increment(
        &self,
        user_id: Uuid,
        period: UsagePeriod,
        usage_type: UsageType,
    ) -> DbResult<()> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        let mut row = self
            .rows
            .entry((user_id, period.to_string()))
            .or_insert_with(|| empty_row(user_id, period));
        *column_mut(&mut row, usage_type) += 1;
        row.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================================================
// Webhook events
// ============================================================================

/// In-memory webhook event log for testing
#[derive(Default, Clone)]
pub struct MockWebhookEventRepository {
    events: Arc<DashMap<String, WebhookEventRow>>,
    pub fail_lookups: Arc<AtomicBool>,
    /// Number of upcoming lookups that report "not found" regardless of
    /// contents, simulating a concurrent delivery racing this one
    pub stale_lookups: Arc<AtomicUsize>,
}

impl MockWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row as if another delivery already processed the event
    pub fn insert_processed(&self, event_id: &str, result: &str, processed_at: DateTime<Utc>) {
        self.events.insert(
            event_id.to_string(),
            WebhookEventRow {
                id: Uuid::new_v4(),
                event_id: event_id.to_string(),
                event_type: "test.event".to_string(),
                source: "platform".to_string(),
                payload: serde_json::json!({}),
                result: result.to_string(),
                error_message: (result == "error").then(|| "earlier failure".to_string()),
                processed_at,
            },
        );
    }

    pub fn get(&self, event_id: &str) -> Option<WebhookEventRow> {
        self.events.get(event_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl WebhookEventRepository for MockWebhookEventRepository {
    async fn find_by_event_id(&self, event_id: &str) -> DbResult<Option<WebhookEventRow>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        if self
            .stale_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(None);
        }
        Ok(self.get(event_id))
    }

    async fn insert(&self, event: NewWebhookEvent) -> DbResult<bool> {
        if self.events.contains_key(&event.event_id) {
            return Ok(false);
        }
        self.events.insert(
            event.event_id.clone(),
            WebhookEventRow {
                id: Uuid::new_v4(),
                event_id: event.event_id,
                event_type: event.event_type,
                source: event.source.as_str().to_string(),
                payload: event.payload,
                result: event.result.as_str().to_string(),
                error_message: event.error_message,
                processed_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn delete_processed_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let before = self.events.len();
        self.events.retain(|_, row| row.processed_at >= cutoff);
        Ok((before - self.events.len()) as u64)
    }
}

// ============================================================================
// Invoices
// ============================================================================

/// In-memory invoice repository for testing
#[derive(Default, Clone)]
pub struct MockInvoiceRepository {
    invoices: Arc<DashMap<Uuid, InvoiceRow>>,
    line_items: Arc<DashMap<Uuid, Vec<LineItemRow>>>,
    /// Templates whose generation transaction fails
    pub failing_templates: Arc<DashSet<Uuid>>,
    /// Templates another run advances between listing and claiming
    pub claimed_elsewhere: Arc<DashSet<Uuid>>,
    pub fail_listing: Arc<AtomicBool>,
}

impl MockInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a recurring template due on `next_due_date`, with two line items
    pub fn insert_template(
        &self,
        user: &UserId,
        interval: &str,
        next_due_date: NaiveDate,
        client_id: Option<Uuid>,
    ) -> InvoiceRow {
        let id = Uuid::new_v4();
        let row = InvoiceRow {
            id,
            user_id: user.0,
            client_id,
            invoice_number: "INV-0001".to_string(),
            status: "sent".to_string(),
            subtotal_cents: 20_000,
            gst_cents: 2_000,
            total_cents: 22_000,
            description: Some("Monthly maintenance".to_string()),
            notes: Some("Thanks for your business".to_string()),
            terms: Some("14 days".to_string()),
            issue_date: next_due_date,
            due_date: next_due_date,
            is_recurring: true,
            recurring_interval: Some(interval.to_string()),
            next_due_date: Some(next_due_date),
            parent_invoice_id: None,
            paid_at: None,
            deleted_at: None,
            created_at: Utc::now() - Duration::days(30),
        };
        self.invoices.insert(id, row.clone());
        self.line_items.insert(
            id,
            vec![
                line_item(id, "Labour", 2.0, 8_000, 0),
                line_item(id, "Parts", 1.0, 4_000, 1),
            ],
        );
        row
    }

    /// Insert an ordinary invoice with the given number
    pub fn insert_invoice(&self, user: &UserId, invoice_number: &str, created_at: DateTime<Utc>) -> InvoiceRow {
        let today = created_at.date_naive();
        let row = InvoiceRow {
            id: Uuid::new_v4(),
            user_id: user.0,
            client_id: None,
            invoice_number: invoice_number.to_string(),
            status: "sent".to_string(),
            subtotal_cents: 1_000,
            gst_cents: 100,
            total_cents: 1_100,
            description: None,
            notes: None,
            terms: None,
            issue_date: today,
            due_date: today,
            is_recurring: false,
            recurring_interval: None,
            next_due_date: None,
            parent_invoice_id: None,
            paid_at: None,
            deleted_at: None,
            created_at,
        };
        self.invoices.insert(row.id, row.clone());
        row
    }

    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut InvoiceRow)) {
        if let Some(mut row) = self.invoices.get_mut(&id) {
            f(&mut row);
        }
    }

    pub fn get(&self, id: Uuid) -> Option<InvoiceRow> {
        self.invoices.get(&id).map(|r| r.value().clone())
    }

    /// Invoices generated from a template
    pub fn children_of(&self, template_id: Uuid) -> Vec<InvoiceRow> {
        self.invoices
            .iter()
            .filter(|r| r.parent_invoice_id == Some(template_id))
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn items_of(&self, invoice_id: Uuid) -> Vec<LineItemRow> {
        self.line_items
            .get(&invoice_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}

fn line_item(invoice_id: Uuid, description: &str, quantity: f64, unit: i64, sort_order: i32) -> LineItemRow {
    LineItemRow {
        id: Uuid::new_v4(),
        invoice_id,
        description: description.to_string(),
        quantity,
        unit_price_cents: unit,
        total_cents: (quantity * unit as f64) as i64,
        sort_order,
    }
}

#[async_trait]
impl InvoiceRepository for MockInvoiceRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InvoiceRow>> {
        Ok(self.get(id))
    }

    async fn find_due_templates(&self, today: NaiveDate) -> DbResult<Vec<InvoiceRow>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        Ok(self
            .invoices
            .iter()
            .filter(|r| {
                r.is_recurring
                    && r.next_due_date.is_some_and(|d| d <= today)
                    && r.status != "cancelled"
                    && r.deleted_at.is_none()
            })
            .map(|r| r.value().clone())
            .collect())
    }

    async fn latest_invoice_number(&self, user_id: Uuid) -> DbResult<Option<String>> {
        Ok(self
            .invoices
            .iter()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.created_at)
            .map(|r| r.invoice_number.clone()))
    }

    async fn line_items(&self, invoice_id: Uuid) -> DbResult<Vec<LineItemRow>> {
        let mut items = self.items_of(invoice_id);
        items.sort_by_key(|i| i.sort_order);
        Ok(items)
    }

    async fn generate_from_template(
        &self,
        claim: TemplateClaim,
        invoice: CreateInvoice,
        line_items: Vec<CreateLineItem>,
    ) -> DbResult<Option<InvoiceRow>> {
        if self.failing_templates.contains(&claim.template_id) {
            return Err(db_down());
        }
        if self.claimed_elsewhere.contains(&claim.template_id) {
            self.update(claim.template_id, |row| row.next_due_date = Some(claim.next_due));
        }

        {
            let Some(mut template) = self.invoices.get_mut(&claim.template_id) else {
                return Ok(None);
            };
            if !template.is_recurring || template.next_due_date != claim.current_due {
                return Ok(None);
            }
            template.next_due_date = Some(claim.next_due);
        }

        let row = InvoiceRow {
            id: invoice.id,
            user_id: invoice.user_id,
            client_id: invoice.client_id,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            subtotal_cents: invoice.subtotal_cents,
            gst_cents: invoice.gst_cents,
            total_cents: invoice.total_cents,
            description: invoice.description,
            notes: invoice.notes,
            terms: invoice.terms,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            is_recurring: false,
            recurring_interval: None,
            next_due_date: None,
            parent_invoice_id: invoice.parent_invoice_id,
            paid_at: None,
            deleted_at: None,
            created_at: Utc::now(),
        };
        let items = line_items
            .into_iter()
            .map(|item| LineItemRow {
                id: item.id,
                invoice_id: row.id,
                description: item.description,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                total_cents: item.total_cents,
                sort_order: item.sort_order,
            })
            .collect();

        self.invoices.insert(row.id, row.clone());
        self.line_items.insert(row.id, items);
        Ok(Some(row))
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> DbResult<()> {
        self.update(id, |row| {
            row.status = "paid".to_string();
            row.paid_at = Some(paid_at);
        });
        Ok(())
    }
}

// ============================================================================
// Clients
// ============================================================================

/// In-memory client repository for testing
#[derive(Default, Clone)]
pub struct MockClientRepository {
    clients: Arc<DashMap<Uuid, ClientRow>>,
}

impl MockClientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&self, user: &UserId, name: &str, email: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(
            id,
            ClientRow {
                id,
                user_id: user.0,
                name: name.to_string(),
                email: email.map(str::to_string),
            },
        );
        id
    }
}

#[async_trait]
impl ClientRepository for MockClientRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ClientRow>> {
        Ok(self.clients.get(&id).map(|r| r.value().clone()))
    }
}

// ============================================================================
// Rate limits
// ============================================================================

/// In-memory rate limit windows for testing
#[derive(Default, Clone)]
pub struct MockRateLimitRepository {
    windows: Arc<DashMap<(String, DateTime<Utc>), u32>>,
    pub fail: Arc<AtomicBool>,
}

impl MockRateLimitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl RateLimitRepository for MockRateLimitRepository {
    async fn hit(&self, key: &str, window_start: DateTime<Utc>) -> DbResult<u32> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        let mut hits = self
            .windows
            .entry((key.to_string(), window_start))
            .or_insert(0);
        *hits += 1;
        Ok(*hits)
    }

    async fn delete_windows_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let before = self.windows.len();
        self.windows.retain(|(_, start), _| *start >= cutoff);
        Ok((before - self.windows.len()) as u64)
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Notifier that records what it was asked to send
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<InvoiceNotification>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<InvoiceNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceNotifier for RecordingNotifier {
    async fn send_invoice(&self, notification: &InvoiceNotification) -> Result<(), BillingError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(BillingError::Notification("mail server down".to_string()));
        }
        Ok(())
    }
}

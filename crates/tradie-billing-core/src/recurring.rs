//! Recurring invoice generation
//!
//! A scheduled batch that spawns invoices from due recurring templates. Each
//! template is processed on its own; one template's failure is recorded in its
//! result and never stops the batch. A template's `next_due_date` only moves
//! when an invoice was created from it, and both happen in one transaction
//! that also claims the cycle, so overlapping or interrupted runs never
//! generate the same cycle twice.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use tradie_db::{
    ClientRepository, CreateInvoice, CreateLineItem, InvoiceRepository, InvoiceRow,
    TemplateClaim,
};
use tradie_types::{CheckOutcome, InvoiceStatus, UsageType};

use crate::notifier::{InvoiceNotification, InvoiceNotifier};
use crate::numbering::next_invoice_number;
use crate::{BillingError, UsageEnforcer};

/// Outcome of one template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Created,
    Skipped,
    Error,
}

/// Why a template was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The owner has no invoice allowance left this period
    LimitReached,
    /// Another run claimed this cycle first
    AlreadyGenerated,
}

/// Result for one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateResult {
    pub template_id: Uuid,
    pub user_id: Uuid,
    pub status: TemplateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TemplateResult {
    fn new(template: &InvoiceRow, status: TemplateStatus) -> Self {
        Self {
            template_id: template.id,
            user_id: template.user_id,
            status,
            invoice_id: None,
            invoice_number: None,
            next_due_date: None,
            reason: None,
            error: None,
        }
    }

    fn skipped(template: &InvoiceRow, reason: SkipReason) -> Self {
        Self {
            reason: Some(reason),
            ..Self::new(template, TemplateStatus::Skipped)
        }
    }

    fn failed(template: &InvoiceRow, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(template, TemplateStatus::Error)
        }
    }
}

/// Summary of one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub success: bool,
    pub processed: usize,
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
    pub results: Vec<TemplateResult>,
}

impl GenerationSummary {
    fn from_results(results: Vec<TemplateResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            success: true,
            processed: results.len(),
            created: count(TemplateStatus::Created),
            skipped: count(TemplateStatus::Skipped),
            errors: count(TemplateStatus::Error),
            results,
        }
    }
}

/// Generates invoices from due recurring templates
#[derive(Clone)]
pub struct RecurringInvoiceGenerator {
    enforcer: UsageEnforcer,
    invoices: Arc<dyn InvoiceRepository>,
    clients: Arc<dyn ClientRepository>,
    notifier: Option<Arc<dyn InvoiceNotifier>>,
}

impl RecurringInvoiceGenerator {
    /// Create a generator; without a notifier no emails are sent
    pub fn new(
        enforcer: UsageEnforcer,
        invoices: Arc<dyn InvoiceRepository>,
        clients: Arc<dyn ClientRepository>,
        notifier: Option<Arc<dyn InvoiceNotifier>>,
    ) -> Self {
        Self {
            enforcer,
            invoices,
            clients,
            notifier,
        }
    }

    /// Process every template due on or before `now`'s date.
    ///
    /// Fails only when the due templates cannot be listed.
    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<GenerationSummary, BillingError> {
        let start = Instant::now();
        let today = now.date_naive();

        let templates = self.invoices.find_due_templates(today).await?;
        info!(count = templates.len(), today = %today, "Processing due recurring templates");

        let mut results = Vec::with_capacity(templates.len());
        for template in &templates {
            let result = self.process_template(template, now).await;
            metrics::counter!(
                "billing_recurring_invoices_total",
                "status" => status_label(result.status)
            )
            .increment(1);
            results.push(result);
        }

        let summary = GenerationSummary::from_results(results);
        metrics::histogram!("billing_operation_duration_seconds", "operation" => "recurring_run")
            .record(start.elapsed().as_secs_f64());
        info!(
            processed = summary.processed,
            created = summary.created,
            skipped = summary.skipped,
            errors = summary.errors,
            "Recurring invoice run complete"
        );

        Ok(summary)
    }

    #[instrument(skip(self, template, now), fields(template_id = %template.id, user_id = %template.user_id))]
    async fn process_template(&self, template: &InvoiceRow, now: DateTime<Utc>) -> TemplateResult {
        let owner = template.owner();
        let check = self
            .enforcer
            .check_usage_limit_at(&owner, UsageType::Invoices, now)
            .await;

        match check.outcome {
            CheckOutcome::TierUnavailable => {
                let message = check.error.unwrap_or_else(|| "tier unavailable".to_string());
                warn!(error = %message, "Skipping template, tier unavailable");
                return TemplateResult::failed(template, message);
            }
            _ if !check.allowed => {
                info!(used = check.used, limit = %check.limit, "Invoice limit reached, template skipped");
                return TemplateResult::skipped(template, SkipReason::LimitReached);
            }
            _ => {}
        }

        match self.generate(template, now).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Recurring invoice generation failed");
                TemplateResult::failed(template, e)
            }
        }
    }

    async fn generate(&self, template: &InvoiceRow, now: DateTime<Utc>) -> Result<TemplateResult, BillingError> {
        let today = now.date_naive();
        let current_due = template.next_due_date.unwrap_or(today);
        let next_due = template
            .interval()
            .advance(current_due)
            .ok_or(BillingError::DateOutOfRange)?;

        let latest = self.invoices.latest_invoice_number(template.user_id).await?;
        let invoice_number = next_invoice_number(latest.as_deref(), today);

        let line_items: Vec<CreateLineItem> = self
            .invoices
            .line_items(template.id)
            .await?
            .iter()
            .map(CreateLineItem::from)
            .collect();

        let claim = TemplateClaim {
            template_id: template.id,
            current_due: template.next_due_date,
            next_due,
        };
        let Some(invoice) = self
            .invoices
            .generate_from_template(
                claim,
                new_invoice_from(template, invoice_number, today),
                line_items,
            )
            .await?
        else {
            info!("Template already generated for this cycle, skipped");
            return Ok(TemplateResult::skipped(template, SkipReason::AlreadyGenerated));
        };
        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            next_due_date = %next_due,
            "Recurring invoice created"
        );

        // The invoice is committed from here on; later failures are logged only.
        let owner = template.owner();
        if let Err(e) = self.enforcer.increment_usage_at(&owner, UsageType::Invoices, now).await {
            warn!(error = %e, invoice_id = %invoice.id, "Failed to record invoice usage");
        }

        self.notify(&invoice).await;

        Ok(TemplateResult {
            invoice_id: Some(invoice.id),
            invoice_number: Some(invoice.invoice_number),
            next_due_date: Some(next_due),
            ..TemplateResult::new(template, TemplateStatus::Created)
        })
    }

    /// Email the client if there is a notifier and the client has an address
    async fn notify(&self, invoice: &InvoiceRow) {
        let (Some(notifier), Some(client_id)) = (&self.notifier, invoice.client_id) else {
            return;
        };

        let client = match self.clients.find_by_id(client_id).await {
            Ok(Some(client)) => client,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, client_id = %client_id, "Failed to load client for notification");
                return;
            }
        };

        let Some(email) = client.email.filter(|e| !e.trim().is_empty()) else {
            return;
        };

        let notification = InvoiceNotification::invoice(email, client.name, invoice.id);
        if let Err(e) = notifier.send_invoice(&notification).await {
            warn!(error = %e, invoice_id = %invoice.id, "Failed to email recurring invoice");
        }
    }
}

fn new_invoice_from(template: &InvoiceRow, invoice_number: String, today: NaiveDate) -> CreateInvoice {
    CreateInvoice {
        id: Uuid::new_v4(),
        user_id: template.user_id,
        client_id: template.client_id,
        invoice_number,
        status: InvoiceStatus::Sent.as_str().to_string(),
        subtotal_cents: template.subtotal_cents,
        gst_cents: template.gst_cents,
        total_cents: template.total_cents,
        description: template.description.clone(),
        notes: template.notes.clone(),
        terms: template.terms.clone(),
        issue_date: today,
        due_date: today,
        parent_invoice_id: Some(template.id),
    }
}

fn status_label(status: TemplateStatus) -> &'static str {
    match status {
        TemplateStatus::Created => "created",
        TemplateStatus::Skipped => "skipped",
        TemplateStatus::Error => "error",
    }
}

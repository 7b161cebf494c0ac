//! PostgreSQL invoice repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{InvoiceRow, LineItemRow};
use crate::repo::{CreateInvoice, CreateLineItem, InvoiceRepository, TemplateClaim};

const INVOICE_COLUMNS: &str = r#"
    id, user_id, client_id, invoice_number, status, subtotal_cents, gst_cents,
    total_cents, description, notes, terms, issue_date, due_date, is_recurring,
    recurring_interval, next_due_date, parent_invoice_id, paid_at, deleted_at,
    created_at
"#;

/// PostgreSQL invoice repository
#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    /// Create a new invoice repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InvoiceRow>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        let invoice = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    async fn find_due_templates(&self, today: NaiveDate) -> DbResult<Vec<InvoiceRow>> {
        let sql = format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE is_recurring = TRUE
              AND next_due_date <= $1
              AND status <> 'cancelled'
              AND deleted_at IS NULL
            ORDER BY next_due_date
            "#
        );
        let templates = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;

        Ok(templates)
    }

    async fn latest_invoice_number(&self, user_id: Uuid) -> DbResult<Option<String>> {
        let number: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT invoice_number
            FROM invoices
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(number.map(|(n,)| n))
    }

    async fn line_items(&self, invoice_id: Uuid) -> DbResult<Vec<LineItemRow>> {
        let items = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT id, invoice_id, description, quantity, unit_price_cents, total_cents, sort_order
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn generate_from_template(
        &self,
        claim: TemplateClaim,
        invoice: CreateInvoice,
        line_items: Vec<CreateLineItem>,
    ) -> DbResult<Option<InvoiceRow>> {
        let mut tx = self.pool.begin().await?;

        // Concurrent claims serialize on the row lock; the loser re-reads the
        // advanced date and matches nothing.
        let claimed = sqlx::query(
            r#"
            UPDATE invoices
            SET next_due_date = $1
            WHERE id = $2
              AND is_recurring = TRUE
              AND next_due_date IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(claim.next_due)
        .bind(claim.template_id)
        .bind(claim.current_due)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let sql = format!(
            r#"
            INSERT INTO invoices (id, user_id, client_id, invoice_number, status,
                                  subtotal_cents, gst_cents, total_cents, description,
                                  notes, terms, issue_date, due_date, is_recurring,
                                  parent_invoice_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, FALSE, $14)
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice.id)
            .bind(invoice.user_id)
            .bind(invoice.client_id)
            .bind(&invoice.invoice_number)
            .bind(&invoice.status)
            .bind(invoice.subtotal_cents)
            .bind(invoice.gst_cents)
            .bind(invoice.total_cents)
            .bind(&invoice.description)
            .bind(&invoice.notes)
            .bind(&invoice.terms)
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(invoice.parent_invoice_id)
            .fetch_one(&mut *tx)
            .await?;

        for item in &line_items {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (id, invoice_id, description, quantity,
                                                unit_price_cents, total_cents, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(row.id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.total_cents)
            .bind(item.sort_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(row))
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE invoices SET status = 'paid', paid_at = $1 WHERE id = $2")
            .bind(paid_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

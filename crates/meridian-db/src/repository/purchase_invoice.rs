//! # Purchase Invoice Repository
//!
//! Database operations for supplier bills (the payable side). Mirrors the
//! invoice repository on its own tables: same posting transaction, same
//! cancellation policy, payable accounts instead of receivable ones.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::{
    fetch_entry_on, insert_line_on, next_invoice_number, OutstandingInvoiceRow,
};
use crate::repository::journal::insert_entry_on;
use meridian_core::{
    BalancedEntry, InvoiceLine, InvoiceStatus, JournalStatus, PurchaseInvoice, StateError,
};

/// Repository for purchase invoice database operations.
#[derive(Debug, Clone)]
pub struct PurchaseInvoiceRepository {
    pool: SqlitePool,
}

impl PurchaseInvoiceRepository {
    /// Creates a new PurchaseInvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseInvoiceRepository { pool }
    }

    /// Inserts a draft bill with its lines, assigning the business number
    /// (BILL-YYYYMMDD-NNNN). One transaction.
    pub async fn create(
        &self,
        mut invoice: PurchaseInvoice,
        lines: Vec<InvoiceLine>,
    ) -> DbResult<PurchaseInvoice> {
        let mut tx = self.pool.begin().await?;

        invoice.number =
            next_invoice_number(&mut *tx, "purchase_invoices", "BILL", invoice.invoice_date)
                .await?;

        debug!(
            id = %invoice.id,
            number = %invoice.number,
            supplier_id = %invoice.supplier_id,
            total_cents = invoice.total_cents,
            "Creating purchase invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_invoices (
                id, number, supplier_id, invoice_date, due_date, status,
                subtotal_cents, tax_cents, total_cents,
                journal_entry_id, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.number)
        .bind(&invoice.supplier_id)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.status)
        .bind(invoice.subtotal_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.total_cents)
        .bind(&invoice.journal_entry_id)
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            insert_line_on(&mut *tx, "purchase_invoice_lines", line).await?;
        }

        tx.commit().await?;
        Ok(invoice)
    }

    /// Gets a purchase invoice by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<PurchaseInvoice>> {
        let invoice = sqlx::query_as::<_, PurchaseInvoice>(
            r#"
            SELECT id, number, supplier_id, invoice_date, due_date, status,
                   subtotal_cents, tax_cents, total_cents,
                   journal_entry_id, notes, created_at, updated_at
            FROM purchase_invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets the lines of a purchase invoice, in line order.
    pub async fn get_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, line_no, product_id, description,
                   quantity, unit_price_cents, tax_rate_bps,
                   line_total_cents, tax_cents
            FROM purchase_invoice_lines
            WHERE invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Posts a draft bill: writes its journal entry and flips the status
    /// in one transaction.
    pub async fn post(&self, id: &str, entry: BalancedEntry) -> DbResult<PurchaseInvoice> {
        debug!(id = %id, "Posting purchase invoice");
        let mut tx = self.pool.begin().await?;

        let invoice = fetch_purchase_invoice_on(&mut *tx, id).await?;
        if !invoice.status.can_post() {
            return Err(DbError::Domain(
                StateError::NotDraft {
                    entity: "purchase invoice",
                    id: id.to_string(),
                    status: invoice.status.to_string(),
                }
                .into(),
            ));
        }

        let (stored_entry, _) = insert_entry_on(&mut *tx, entry, JournalStatus::Posted).await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE purchase_invoices SET
                status = 'posted',
                journal_entry_id = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(id)
        .bind(&stored_entry.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase invoice (draft)", id));
        }

        tx.commit().await?;

        Ok(PurchaseInvoice {
            status: InvoiceStatus::Posted,
            journal_entry_id: Some(stored_entry.id),
            updated_at: now,
            ..invoice
        })
    }

    /// Cancels a bill under the reversing-entry policy. Same rules as the
    /// sale side: draft just flips, posted-without-payments reverses,
    /// everything else refuses.
    pub async fn cancel(&self, id: &str, reversal_date: NaiveDate) -> DbResult<PurchaseInvoice> {
        debug!(id = %id, "Cancelling purchase invoice");
        let mut tx = self.pool.begin().await?;

        let invoice = fetch_purchase_invoice_on(&mut *tx, id).await?;

        match invoice.status {
            InvoiceStatus::Draft => {}
            InvoiceStatus::Posted => {
                let payments: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM payments \
                     WHERE invoice_id = ?1 AND invoice_kind = 'purchase'",
                )
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                if payments > 0 {
                    return Err(not_cancellable(&invoice, "payments recorded"));
                }

                let entry_id = invoice
                    .journal_entry_id
                    .as_deref()
                    .ok_or_else(|| DbError::not_found("Journal entry for purchase invoice", id))?;
                let (original, items) = fetch_entry_on(&mut *tx, entry_id).await?;

                let reversal = BalancedEntry::reversal_of(
                    &original,
                    &items,
                    reversal_date,
                    format!("REV-{}", invoice.number),
                )
                .map_err(DbError::Domain)?;
                insert_entry_on(&mut *tx, reversal, JournalStatus::Posted).await?;
            }
            InvoiceStatus::PartiallyPaid | InvoiceStatus::Paid => {
                return Err(not_cancellable(&invoice, "payments recorded"));
            }
            InvoiceStatus::Cancelled => {
                return Err(not_cancellable(&invoice, "already cancelled"));
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE purchase_invoices SET
                status = 'cancelled',
                updated_at = ?2
            WHERE id = ?1 AND status IN ('draft', 'posted')
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase invoice", id));
        }

        tx.commit().await?;

        Ok(PurchaseInvoice {
            status: InvoiceStatus::Cancelled,
            updated_at: now,
            ..invoice
        })
    }

    /// Outstanding bills (posted or partially paid) with cumulative
    /// payments, for the AP aging report.
    pub async fn outstanding(&self) -> DbResult<Vec<OutstandingInvoiceRow>> {
        let rows = sqlx::query_as::<_, OutstandingInvoiceRow>(
            r#"
            SELECT i.id,
                   i.number,
                   i.supplier_id AS partner_id,
                   i.due_date,
                   i.total_cents,
                   COALESCE((
                       SELECT SUM(p.amount_cents)
                       FROM payments p
                       WHERE p.invoice_id = i.id AND p.invoice_kind = 'purchase'
                   ), 0) AS paid_cents
            FROM purchase_invoices i
            WHERE i.status IN ('posted', 'partially_paid')
            ORDER BY i.supplier_id, i.due_date, i.number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

pub(crate) async fn fetch_purchase_invoice_on(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<PurchaseInvoice> {
    sqlx::query_as::<_, PurchaseInvoice>(
        r#"
        SELECT id, number, supplier_id, invoice_date, due_date, status,
               subtotal_cents, tax_cents, total_cents,
               journal_entry_id, notes, created_at, updated_at
        FROM purchase_invoices
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Purchase invoice", id))
}

fn not_cancellable(invoice: &PurchaseInvoice, reason: &'static str) -> DbError {
    DbError::Domain(
        StateError::NotCancellable {
            entity: "purchase invoice",
            id: invoice.id.clone(),
            status: invoice.status.to_string(),
            reason,
        }
        .into(),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Invoice Repository
//!
//! Database operations for customer invoices (the receivable side).
//!
//! ## Posting Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  post(id, balanced_entry)                               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├── fetch invoice, guard status == draft   (StateError otherwise)    │
//! │   ├── insert journal entry + lines           (posted)                  │
//! │   ├── UPDATE invoices SET status = 'posted', journal_entry_id = ...    │
//! │   │          WHERE id = ? AND status = 'draft'                         │
//! │   │          └── rows_affected == 0 → bail                             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The status flip and the journal entry land atomically: a posted       │
//! │  invoice without its entry is unrepresentable, and posting twice       │
//! │  cannot duplicate the entry.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation never deletes: a draft is marked cancelled, a cleanly
//! posted document gets a reversing entry, and anything with payments
//! refuses outright.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::journal::insert_entry_on;
use meridian_core::{
    BalancedEntry, Invoice, InvoiceLine, InvoiceStatus, JournalEntry, JournalItem, JournalStatus,
    StateError,
};

/// One currently-outstanding document with its cumulative payments, the
/// raw material of the aging report. Shared by both invoice repositories;
/// `partner_id` is the customer on the sale side, the supplier on the
/// purchase side.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutstandingInvoiceRow {
    pub id: String,
    pub number: String,
    pub partner_id: String,
    pub due_date: NaiveDate,
    pub total_cents: i64,
    pub paid_cents: i64,
}

/// Repository for customer invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts a draft invoice with its lines, assigning the business
    /// number (INV-YYYYMMDD-NNNN). One transaction: document and lines
    /// land together or not at all.
    pub async fn create(&self, mut invoice: Invoice, lines: Vec<InvoiceLine>) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        invoice.number = next_invoice_number(&mut *tx, "invoices", "INV", invoice.invoice_date).await?;

        debug!(
            id = %invoice.id,
            number = %invoice.number,
            customer_id = %invoice.customer_id,
            total_cents = invoice.total_cents,
            "Creating invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, number, customer_id, invoice_date, due_date, status,
                subtotal_cents, tax_cents, total_cents,
                journal_entry_id, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.number)
        .bind(&invoice.customer_id)
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
            insert_line_on(&mut *tx, "invoice_lines", line).await?;
        }

        tx.commit().await?;
        Ok(invoice)
    }

    /// Gets an invoice by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, customer_id, invoice_date, due_date, status,
                   subtotal_cents, tax_cents, total_cents,
                   journal_entry_id, notes, created_at, updated_at
            FROM invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets the lines of an invoice, in line order.
    pub async fn get_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, line_no, product_id, description,
                   quantity, unit_price_cents, tax_rate_bps,
                   line_total_cents, tax_cents
            FROM invoice_lines
            WHERE invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Posts a draft invoice: writes its journal entry and flips the
    /// status in one transaction.
    ///
    /// The entry is built by the caller (it knows the posting accounts);
    /// this function guarantees atomicity and the draft-only guard.
    pub async fn post(&self, id: &str, entry: BalancedEntry) -> DbResult<Invoice> {
        debug!(id = %id, "Posting invoice");
        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice_on(&mut *tx, id).await?;
        if !invoice.status.can_post() {
            return Err(DbError::Domain(
                StateError::NotDraft {
                    entity: "invoice",
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
            UPDATE invoices SET
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
            return Err(DbError::not_found("Invoice (draft)", id));
        }

        tx.commit().await?;

        Ok(Invoice {
            status: InvoiceStatus::Posted,
            journal_entry_id: Some(stored_entry.id),
            updated_at: now,
            ..invoice
        })
    }

    /// Cancels an invoice under the reversing-entry policy:
    /// - draft: marked cancelled, no journal effect
    /// - posted, no payments: reversing entry written, then marked cancelled
    /// - anything with payments, or already cancelled: refused
    pub async fn cancel(&self, id: &str, reversal_date: NaiveDate) -> DbResult<Invoice> {
        debug!(id = %id, "Cancelling invoice");
        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice_on(&mut *tx, id).await?;

        match invoice.status {
            InvoiceStatus::Draft => {}
            InvoiceStatus::Posted => {
                let payments: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM payments WHERE invoice_id = ?1 AND invoice_kind = 'sale'",
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
                    .ok_or_else(|| DbError::not_found("Journal entry for invoice", id))?;
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
            UPDATE invoices SET
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
            return Err(DbError::not_found("Invoice", id));
        }

        tx.commit().await?;

        Ok(Invoice {
            status: InvoiceStatus::Cancelled,
            updated_at: now,
            ..invoice
        })
    }

    /// Outstanding invoices (posted or partially paid) with cumulative
    /// payments, grouped per customer by the caller.
    pub async fn outstanding(&self) -> DbResult<Vec<OutstandingInvoiceRow>> {
        let rows = sqlx::query_as::<_, OutstandingInvoiceRow>(
            r#"
            SELECT i.id,
                   i.number,
                   i.customer_id AS partner_id,
                   i.due_date,
                   i.total_cents,
                   COALESCE((
                       SELECT SUM(p.amount_cents)
                       FROM payments p
                       WHERE p.invoice_id = i.id AND p.invoice_kind = 'sale'
                   ), 0) AS paid_cents
            FROM invoices i
            WHERE i.status IN ('posted', 'partially_paid')
            ORDER BY i.customer_id, i.due_date, i.number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Transaction Helpers (shared with the payment repository)
// =============================================================================

pub(crate) async fn fetch_invoice_on(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Invoice> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, number, customer_id, invoice_date, due_date, status,
               subtotal_cents, tax_cents, total_cents,
               journal_entry_id, notes, created_at, updated_at
        FROM invoices
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Invoice", id))
}

/// Fetches an entry header and its lines on an open transaction.
pub(crate) async fn fetch_entry_on(
    conn: &mut SqliteConnection,
    entry_id: &str,
) -> DbResult<(JournalEntry, Vec<JournalItem>)> {
    let entry = sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT id, entry_number, entry_date, reference, description,
               status, source_type, source_id, created_at, updated_at
        FROM journal_entries
        WHERE id = ?1
        "#,
    )
    .bind(entry_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Journal entry", entry_id))?;

    let items = sqlx::query_as::<_, JournalItem>(
        r#"
        SELECT id, entry_id, line_no, account_id, debit_cents, credit_cents
        FROM journal_items
        WHERE entry_id = ?1
        ORDER BY line_no
        "#,
    )
    .bind(entry_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok((entry, items))
}

/// Inserts one document line. `table` is `invoice_lines` or
/// `purchase_invoice_lines`; both share the same shape.
pub(crate) async fn insert_line_on(
    conn: &mut SqliteConnection,
    table: &str,
    line: &InvoiceLine,
) -> DbResult<()> {
    let sql = format!(
        r#"
        INSERT INTO {table} (
            id, invoice_id, line_no, product_id, description,
            quantity, unit_price_cents, tax_rate_bps,
            line_total_cents, tax_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#
    );

    sqlx::query(&sql)
        .bind(&line.id)
        .bind(&line.invoice_id)
        .bind(line.line_no)
        .bind(&line.product_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.tax_rate_bps)
        .bind(line.line_total_cents)
        .bind(line.tax_cents)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Next document number for a date: PREFIX-YYYYMMDD-NNNN, counting rows
/// already carrying that invoice date. Runs on the caller's transaction.
pub(crate) async fn next_invoice_number(
    conn: &mut SqliteConnection,
    table: &str,
    prefix: &str,
    date: NaiveDate,
) -> DbResult<String> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE invoice_date = ?1");
    let prior: i64 = sqlx::query_scalar(&sql).bind(date).fetch_one(conn).await?;

    Ok(format!("{prefix}-{}-{:04}", date.format("%Y%m%d"), prior + 1))
}

fn not_cancellable(invoice: &Invoice, reason: &'static str) -> DbError {
    DbError::Domain(
        StateError::NotCancellable {
            entity: "invoice",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use meridian_core::{
        Account, AccountType, CoreError, JournalEntryBuilder, JournalSource, Money,
    };
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seed_account(db: &Database, code: &str, account_type: AccountType) -> String {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: format!("Account {code}"),
            account_type,
            parent_id: None,
            is_group: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.accounts().insert(&account).await.unwrap();
        account.id
    }

    fn draft_invoice(customer: &str, total_cents: i64) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4().to_string(),
            number: String::new(),
            customer_id: customer.to_string(),
            invoice_date: date(2024, 1, 10),
            due_date: date(2024, 2, 9),
            status: InvoiceStatus::Draft,
            subtotal_cents: total_cents,
            tax_cents: 0,
            total_cents,
            journal_entry_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn one_line(invoice: &Invoice) -> Vec<InvoiceLine> {
        vec![InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            line_no: 1,
            product_id: None,
            description: "Widget".to_string(),
            quantity: 1,
            unit_price_cents: invoice.subtotal_cents,
            tax_rate_bps: 0,
            line_total_cents: invoice.subtotal_cents,
            tax_cents: 0,
        }]
    }

    fn posting_entry(invoice: &Invoice, receivable: &str, sales: &str) -> BalancedEntry {
        JournalEntryBuilder::new(invoice.invoice_date)
            .reference(invoice.number.clone())
            .source(JournalSource::Invoice, invoice.id.clone())
            .debit(receivable, Money::from_cents(invoice.total_cents))
            .credit(sales, Money::from_cents(invoice.total_cents))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_per_date() {
        let db = test_db().await;
        let repo = db.invoices();

        let first = draft_invoice("cust-1", 10000);
        let lines = one_line(&first);
        let first = repo.create(first, lines).await.unwrap();
        assert_eq!(first.number, "INV-20240110-0001");

        let second = draft_invoice("cust-1", 2000);
        let lines = one_line(&second);
        let second = repo.create(second, lines).await.unwrap();
        assert_eq!(second.number, "INV-20240110-0002");
    }

    #[tokio::test]
    async fn test_create_and_fetch_roundtrip() {
        let db = test_db().await;
        let repo = db.invoices();

        let draft = draft_invoice("cust-1", 11700);
        let lines = one_line(&draft);
        let invoice = repo.create(draft, lines).await.unwrap();
        assert_eq!(invoice.number, "INV-20240110-0001");
        assert_eq!(invoice.status, InvoiceStatus::Draft);

        let stored = repo.get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id, "cust-1");
        assert_eq!(stored.total_cents, 11700);
        assert_eq!(stored.journal_entry_id, None);

        let lines = repo.get_lines(&invoice.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].description, "Widget");
        assert_eq!(lines[0].line_no, 1);
    }

    #[tokio::test]
    async fn test_post_writes_entry_and_flips_status() {
        let db = test_db().await;
        let repo = db.invoices();
        let receivable = seed_account(&db, "1300", AccountType::Asset).await;
        let sales = seed_account(&db, "4100", AccountType::Income).await;

        let draft = draft_invoice("cust-1", 10000);
        let lines = one_line(&draft);
        let invoice = repo.create(draft, lines).await.unwrap();

        let posted = repo
            .post(&invoice.id, posting_entry(&invoice, &receivable, &sales))
            .await
            .unwrap();
        assert_eq!(posted.status, InvoiceStatus::Posted);
        let entry_id = posted.journal_entry_id.clone().unwrap();

        let entry = db.journal().get(&entry_id).await.unwrap().unwrap();
        assert_eq!(entry.status, JournalStatus::Posted);
        assert_eq!(entry.source_type, Some(JournalSource::Invoice));
        assert_eq!(entry.source_id.as_deref(), Some(invoice.id.as_str()));

        let items = db.journal().get_items(&entry_id).await.unwrap();
        let debits: i64 = items.iter().map(|i| i.debit_cents).sum();
        assert_eq!(debits, 10000);
    }

    #[tokio::test]
    async fn test_double_post_fails_without_duplicating_entry() {
        let db = test_db().await;
        let repo = db.invoices();
        let receivable = seed_account(&db, "1300", AccountType::Asset).await;
        let sales = seed_account(&db, "4100", AccountType::Income).await;

        let draft = draft_invoice("cust-1", 10000);
        let lines = one_line(&draft);
        let invoice = repo.create(draft, lines).await.unwrap();

        repo.post(&invoice.id, posting_entry(&invoice, &receivable, &sales))
            .await
            .unwrap();

        let err = repo
            .post(&invoice.id, posting_entry(&invoice, &receivable, &sales))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::State(StateError::NotDraft { .. }))
        ));

        // exactly one entry exists
        assert_eq!(db.journal().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancel_draft_has_no_journal_effect() {
        let db = test_db().await;
        let repo = db.invoices();

        let draft = draft_invoice("cust-1", 5000);
        let lines = one_line(&draft);
        let invoice = repo.create(draft, lines).await.unwrap();

        let cancelled = repo.cancel(&invoice.id, date(2024, 1, 20)).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        assert_eq!(db.journal().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_posted_writes_reversing_entry() {
        let db = test_db().await;
        let repo = db.invoices();
        let receivable = seed_account(&db, "1300", AccountType::Asset).await;
        let sales = seed_account(&db, "4100", AccountType::Income).await;

        let draft = draft_invoice("cust-1", 10000);
        let lines = one_line(&draft);
        let invoice = repo.create(draft, lines).await.unwrap();
        let posted = repo
            .post(&invoice.id, posting_entry(&invoice, &receivable, &sales))
            .await
            .unwrap();

        let cancelled = repo.cancel(&posted.id, date(2024, 1, 20)).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

        // original entry plus its reversal
        assert_eq!(db.journal().count().await.unwrap(), 2);

        // original debit on receivable is mirrored by a credit
        let ledger = db.journal().general_ledger(Some(&receivable), None, None).await.unwrap();
        assert_eq!(ledger.len(), 2);
        let debits: i64 = ledger.iter().map(|r| r.debit_cents).sum();
        let credits: i64 = ledger.iter().map(|r| r.credit_cents).sum();
        assert_eq!(debits, credits);

        // cancelling again refuses
        let err = repo.cancel(&posted.id, date(2024, 1, 21)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::State(StateError::NotCancellable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_outstanding_lists_posted_only() {
        let db = test_db().await;
        let repo = db.invoices();
        let receivable = seed_account(&db, "1300", AccountType::Asset).await;
        let sales = seed_account(&db, "4100", AccountType::Income).await;

        let draft = draft_invoice("cust-1", 4000);
        let lines = one_line(&draft);
        repo.create(draft, lines).await.unwrap();

        let draft = draft_invoice("cust-2", 9000);
        let lines = one_line(&draft);
        let invoice = repo.create(draft, lines).await.unwrap();
        repo.post(&invoice.id, posting_entry(&invoice, &receivable, &sales))
            .await
            .unwrap();

        let rows = repo.outstanding().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].partner_id, "cust-2");
        assert_eq!(rows[0].total_cents, 9000);
        assert_eq!(rows[0].paid_cents, 0);
    }
}

//! # Payment Repository
//!
//! Records payments against posted invoices and bills. A payment is never
//! stored alone: the settlement journal entry, the payment row, and the
//! invoice status transition all land in one transaction, so cumulative
//! payments and document status can never disagree.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::fetch_invoice_on;
use crate::repository::journal::insert_entry_on;
use crate::repository::purchase_invoice::fetch_purchase_invoice_on;
use meridian_core::{
    BalancedEntry, InvoiceKind, InvoiceStatus, JournalStatus, Money, Payment, StateError,
    ValidationError,
};

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Registers a payment against a posted or partially paid document.
    ///
    /// One transaction: guards the document status, rejects overpayment
    /// against the live outstanding balance, writes the settlement entry
    /// and the payment row, then moves the document to `partially_paid`
    /// or `paid`.
    pub async fn register(&self, mut payment: Payment, entry: BalancedEntry) -> DbResult<Payment> {
        debug!(
            invoice_id = %payment.invoice_id,
            kind = %payment.invoice_kind,
            amount_cents = payment.amount_cents,
            method = %payment.method,
            "Registering payment"
        );
        let mut tx = self.pool.begin().await?;

        let (status, total_cents) =
            fetch_document_state(&mut *tx, &payment.invoice_id, payment.invoice_kind).await?;
        if !status.can_receive_payment() {
            return Err(DbError::Domain(
                StateError::NotPayable {
                    id: payment.invoice_id.clone(),
                    status: status.to_string(),
                }
                .into(),
            ));
        }

        let paid_before =
            total_paid_on(&mut *tx, &payment.invoice_id, payment.invoice_kind).await?;
        let outstanding = total_cents - paid_before;
        if payment.amount_cents > outstanding {
            return Err(DbError::Domain(
                ValidationError::Overpayment {
                    amount: payment.amount_cents,
                    outstanding,
                }
                .into(),
            ));
        }

        let (stored_entry, _) = insert_entry_on(&mut *tx, entry, JournalStatus::Posted).await?;
        payment.journal_entry_id = Some(stored_entry.id.clone());

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, invoice_id, invoice_kind, payment_date, amount_cents,
                method, reference, journal_entry_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(payment.invoice_kind)
        .bind(payment.payment_date)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(&payment.journal_entry_id)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        let new_status = InvoiceStatus::after_payment(
            Money::from_cents(total_cents),
            Money::from_cents(paid_before + payment.amount_cents),
        );
        let table = match payment.invoice_kind {
            InvoiceKind::Sale => "invoices",
            InvoiceKind::Purchase => "purchase_invoices",
        };
        let result = sqlx::query(&format!(
            "UPDATE {table} SET status = ?2, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND status IN ('posted', 'partially_paid')"
        ))
        .bind(&payment.invoice_id)
        .bind(new_status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payable document", &payment.invoice_id));
        }

        tx.commit().await?;
        Ok(payment)
    }

    /// Cumulative amount paid against a document, in cents.
    pub async fn total_paid(&self, invoice_id: &str, kind: InvoiceKind) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        total_paid_on(&mut conn, invoice_id, kind).await
    }

    /// All payments recorded against a document, oldest first.
    pub async fn list_for_invoice(
        &self,
        invoice_id: &str,
        kind: InvoiceKind,
    ) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, invoice_id, invoice_kind, payment_date, amount_cents,
                   method, reference, journal_entry_id, created_at
            FROM payments
            WHERE invoice_id = ?1 AND invoice_kind = ?2
            ORDER BY payment_date, created_at
            "#,
        )
        .bind(invoice_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Status and total of the document a payment targets, whichever side it
/// lives on.
async fn fetch_document_state(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    kind: InvoiceKind,
) -> DbResult<(InvoiceStatus, i64)> {
    match kind {
        InvoiceKind::Sale => {
            let invoice = fetch_invoice_on(conn, invoice_id).await?;
            Ok((invoice.status, invoice.total_cents))
        }
        InvoiceKind::Purchase => {
            let invoice = fetch_purchase_invoice_on(conn, invoice_id).await?;
            Ok((invoice.status, invoice.total_cents))
        }
    }
}

async fn total_paid_on(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    kind: InvoiceKind,
) -> DbResult<i64> {
    let paid: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments \
         WHERE invoice_id = ?1 AND invoice_kind = ?2",
    )
    .bind(invoice_id)
    .bind(kind)
    .fetch_one(&mut *conn)
    .await?;

    Ok(paid)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{NaiveDate, Utc};
    use meridian_core::{
        Account, AccountType, CoreError, Invoice, InvoiceLine, JournalEntryBuilder, JournalSource,
        PaymentMethod,
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

    /// Seeds a posted sale invoice for `total_cents` and returns it
    /// together with the cash and receivable account ids.
    async fn posted_invoice(db: &Database, total_cents: i64) -> (Invoice, String, String) {
        let cash = seed_account(db, "1100", AccountType::Asset).await;
        let receivable = seed_account(db, "1300", AccountType::Asset).await;
        let sales = seed_account(db, "4100", AccountType::Income).await;

        let now = Utc::now();
        let draft = Invoice {
            id: Uuid::new_v4().to_string(),
            number: String::new(),
            customer_id: "cust-1".to_string(),
            invoice_date: date(2024, 5, 1),
            due_date: date(2024, 5, 31),
            status: InvoiceStatus::Draft,
            subtotal_cents: total_cents,
            tax_cents: 0,
            total_cents,
            journal_entry_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let lines = vec![InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: draft.id.clone(),
            line_no: 1,
            product_id: None,
            description: "Consulting".to_string(),
            quantity: 1,
            unit_price_cents: total_cents,
            tax_rate_bps: 0,
            line_total_cents: total_cents,
            tax_cents: 0,
        }];
        let invoice = db.invoices().create(draft, lines).await.unwrap();

        let entry = JournalEntryBuilder::new(invoice.invoice_date)
            .reference(invoice.number.clone())
            .source(JournalSource::Invoice, invoice.id.clone())
            .debit(&receivable, Money::from_cents(total_cents))
            .credit(&sales, Money::from_cents(total_cents))
            .build()
            .unwrap();
        let invoice = db.invoices().post(&invoice.id, entry).await.unwrap();

        (invoice, cash, receivable)
    }

    fn payment(invoice: &Invoice, amount_cents: i64, day: u32) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            invoice_kind: InvoiceKind::Sale,
            payment_date: date(2024, 5, day),
            amount_cents,
            method: PaymentMethod::Cash,
            reference: None,
            journal_entry_id: None,
            created_at: Utc::now(),
        }
    }

    fn settlement_entry(
        invoice: &Invoice,
        cash: &str,
        receivable: &str,
        amount_cents: i64,
        day: u32,
    ) -> BalancedEntry {
        JournalEntryBuilder::new(date(2024, 5, day))
            .reference(invoice.number.clone())
            .source(JournalSource::Payment, invoice.id.clone())
            .debit(cash, Money::from_cents(amount_cents))
            .credit(receivable, Money::from_cents(amount_cents))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let db = test_db().await;
        let (invoice, cash, receivable) = posted_invoice(&db, 10000).await;
        let repo = db.payments();

        let first = repo
            .register(
                payment(&invoice, 6000, 10),
                settlement_entry(&invoice, &cash, &receivable, 6000, 10),
            )
            .await
            .unwrap();
        assert!(first.journal_entry_id.is_some());

        let after_first = db.invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(after_first.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(
            repo.total_paid(&invoice.id, InvoiceKind::Sale).await.unwrap(),
            6000
        );

        repo.register(
            payment(&invoice, 4000, 20),
            settlement_entry(&invoice, &cash, &receivable, 4000, 20),
        )
        .await
        .unwrap();

        let after_second = db.invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(after_second.status, InvoiceStatus::Paid);
        assert_eq!(
            repo.total_paid(&invoice.id, InvoiceKind::Sale).await.unwrap(),
            10000
        );

        // posting entry plus two settlement entries
        assert_eq!(db.journal().count().await.unwrap(), 3);
        let history = repo
            .list_for_invoice(&invoice.id, InvoiceKind::Sale)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount_cents, 6000);
    }

    #[tokio::test]
    async fn test_overpayment_rejected_against_live_balance() {
        let db = test_db().await;
        let (invoice, cash, receivable) = posted_invoice(&db, 10000).await;
        let repo = db.payments();

        repo.register(
            payment(&invoice, 6000, 10),
            settlement_entry(&invoice, &cash, &receivable, 6000, 10),
        )
        .await
        .unwrap();

        let err = repo
            .register(
                payment(&invoice, 5000, 15),
                settlement_entry(&invoice, &cash, &receivable, 5000, 15),
            )
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::Validation(ValidationError::Overpayment {
                amount,
                outstanding,
            })) => {
                assert_eq!(amount, 5000);
                assert_eq!(outstanding, 4000);
            }
            other => panic!("expected overpayment, got {other:?}"),
        }

        // the rejected attempt left no trace
        assert_eq!(
            repo.total_paid(&invoice.id, InvoiceKind::Sale).await.unwrap(),
            6000
        );
        assert_eq!(db.journal().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_payment_on_fully_paid_invoice_rejected() {
        let db = test_db().await;
        let (invoice, cash, receivable) = posted_invoice(&db, 5000).await;
        let repo = db.payments();

        repo.register(
            payment(&invoice, 5000, 10),
            settlement_entry(&invoice, &cash, &receivable, 5000, 10),
        )
        .await
        .unwrap();

        let err = repo
            .register(
                payment(&invoice, 100, 11),
                settlement_entry(&invoice, &cash, &receivable, 100, 11),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::State(StateError::NotPayable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_payment_on_draft_rejected() {
        let db = test_db().await;
        let now = Utc::now();
        let cash = seed_account(&db, "1100", AccountType::Asset).await;
        let receivable = seed_account(&db, "1300", AccountType::Asset).await;

        let draft = Invoice {
            id: Uuid::new_v4().to_string(),
            number: String::new(),
            customer_id: "cust-1".to_string(),
            invoice_date: date(2024, 5, 1),
            due_date: date(2024, 5, 31),
            status: InvoiceStatus::Draft,
            subtotal_cents: 5000,
            tax_cents: 0,
            total_cents: 5000,
            journal_entry_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let lines = vec![InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: draft.id.clone(),
            line_no: 1,
            product_id: None,
            description: "Consulting".to_string(),
            quantity: 1,
            unit_price_cents: 5000,
            tax_rate_bps: 0,
            line_total_cents: 5000,
            tax_cents: 0,
        }];
        let invoice = db.invoices().create(draft, lines).await.unwrap();

        let err = db
            .payments()
            .register(
                payment(&invoice, 1000, 5),
                settlement_entry(&invoice, &cash, &receivable, 1000, 5),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::State(StateError::NotPayable { .. }))
        ));
        assert_eq!(db.journal().count().await.unwrap(), 0);
    }
}

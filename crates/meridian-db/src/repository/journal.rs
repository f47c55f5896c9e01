//! # Journal Repository
//!
//! Database operations for journal entries and their lines.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Journal Entry Lifecycle                             │
//! │                                                                         │
//! │  1. BUILD (meridian-core)                                              │
//! │     └── JournalEntryBuilder::build() → BalancedEntry                   │
//! │         (the only way in: Σ debit == Σ credit or no entry at all)      │
//! │                                                                         │
//! │  2. INSERT                                                             │
//! │     └── insert(balanced, status)                                       │
//! │         ├── assign entry number  (JE-YYYYMMDD-NNNN)                    │
//! │         ├── insert header + N lines                                    │
//! │         └── one transaction: all rows or none                          │
//! │                                                                         │
//! │  3. (DRAFT ONLY) POST                                                  │
//! │     └── post() → status = posted, now visible to balances/reports      │
//! │                                                                         │
//! │  Posted entries are immutable. Cancellation elsewhere writes a         │
//! │  reversing entry; nothing is ever updated or deleted here.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::{BalancedEntry, JournalEntry, JournalItem, JournalStatus, StateError};

/// One general ledger line: a posted journal item joined to its entry
/// header and account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GeneralLedgerRow {
    pub entry_id: String,
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub line_no: i64,
    pub account_id: String,
    pub account_code: String,
    pub account_name: String,
    pub debit_cents: i64,
    pub credit_cents: i64,
}

/// Repository for journal database operations.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    /// Creates a new JournalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JournalRepository { pool }
    }

    /// Inserts a balanced entry with the given status.
    ///
    /// Assigns the business entry number and writes header plus lines in
    /// one transaction. Returns the stored header and lines.
    ///
    /// Accepting only [`BalancedEntry`] is the write gate: there is no way
    /// to hand this function an unbalanced entry.
    pub async fn insert(
        &self,
        balanced: BalancedEntry,
        status: JournalStatus,
    ) -> DbResult<(JournalEntry, Vec<JournalItem>)> {
        let mut tx = self.pool.begin().await?;
        let stored = insert_entry_on(&mut *tx, balanced, status).await?;
        tx.commit().await?;
        Ok(stored)
    }

    /// Gets an entry header by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<JournalEntry>> {
        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, entry_number, entry_date, reference, description,
                   status, source_type, source_id, created_at, updated_at
            FROM journal_entries
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets the lines of an entry, in line order.
    pub async fn get_items(&self, entry_id: &str) -> DbResult<Vec<JournalItem>> {
        let items = sqlx::query_as::<_, JournalItem>(
            r#"
            SELECT id, entry_id, line_no, account_id, debit_cents, credit_cents
            FROM journal_items
            WHERE entry_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Posts a draft entry, making it visible to balances and reports.
    ///
    /// Posting anything but a draft is a [`StateError`]; the entry is left
    /// untouched.
    pub async fn post(&self, id: &str) -> DbResult<JournalEntry> {
        debug!(id = %id, "Posting journal entry");
        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, entry_number, entry_date, reference, description,
                   status, source_type, source_id, created_at, updated_at
            FROM journal_entries
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Journal entry", id))?;

        if entry.status != JournalStatus::Draft {
            return Err(DbError::Domain(
                StateError::NotDraft {
                    entity: "journal entry",
                    id: id.to_string(),
                    status: entry.status.to_string(),
                }
                .into(),
            ));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE journal_entries SET
                status = 'posted',
                updated_at = ?2
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Journal entry (draft)", id));
        }

        tx.commit().await?;

        Ok(JournalEntry {
            status: JournalStatus::Posted,
            updated_at: now,
            ..entry
        })
    }

    /// General ledger projection: posted lines joined to entry and account,
    /// date range inclusive, ordered by date then entry number then line.
    pub async fn general_ledger(
        &self,
        account_id: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> DbResult<Vec<GeneralLedgerRow>> {
        let mut qb = sqlx::QueryBuilder::new(
            r#"
            SELECT e.id AS entry_id,
                   e.entry_number,
                   e.entry_date,
                   e.reference,
                   e.description,
                   i.line_no,
                   i.account_id,
                   a.code AS account_code,
                   a.name AS account_name,
                   i.debit_cents,
                   i.credit_cents
            FROM journal_items i
            JOIN journal_entries e ON e.id = i.entry_id
            JOIN accounts a ON a.id = i.account_id
            WHERE e.status = 'posted'
            "#,
        );

        if let Some(account_id) = account_id {
            qb.push(" AND i.account_id = ").push_bind(account_id);
        }
        if let Some(start) = start_date {
            qb.push(" AND e.entry_date >= ").push_bind(start);
        }
        if let Some(end) = end_date {
            qb.push(" AND e.entry_date <= ").push_bind(end);
        }
        qb.push(" ORDER BY e.entry_date, e.entry_number, i.line_no");

        let rows = qb
            .build_query_as::<GeneralLedgerRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Number of stored entries. Used by tests and diagnostics to show that
    /// rejected input wrote nothing.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Shared Insert (used inside document transactions)
// =============================================================================

/// Inserts a balanced entry on an open transaction.
///
/// Document repositories call this so the journal entry and the document
/// status flip commit or roll back together.
pub(crate) async fn insert_entry_on(
    conn: &mut SqliteConnection,
    balanced: BalancedEntry,
    status: JournalStatus,
) -> DbResult<(JournalEntry, Vec<JournalItem>)> {
    let (mut entry, items) = balanced.into_parts();
    entry.status = status;
    entry.entry_number = next_entry_number(&mut *conn, entry.entry_date).await?;

    debug!(
        id = %entry.id,
        entry_number = %entry.entry_number,
        lines = items.len(),
        status = %entry.status,
        "Inserting journal entry"
    );

    sqlx::query(
        r#"
        INSERT INTO journal_entries (
            id, entry_number, entry_date, reference, description,
            status, source_type, source_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.entry_number)
    .bind(entry.entry_date)
    .bind(&entry.reference)
    .bind(&entry.description)
    .bind(entry.status)
    .bind(entry.source_type)
    .bind(&entry.source_id)
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &items {
        sqlx::query(
            r#"
            INSERT INTO journal_items (
                id, entry_id, line_no, account_id, debit_cents, credit_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.entry_id)
        .bind(item.line_no)
        .bind(&item.account_id)
        .bind(item.debit_cents)
        .bind(item.credit_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok((entry, items))
}

/// Next entry number for a date: JE-YYYYMMDD-NNNN, NNNN counting entries
/// already carrying that date. Runs on the caller's transaction, so the
/// count and the insert are serialized together.
async fn next_entry_number(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<String> {
    let prior: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries WHERE entry_date = ?1")
            .bind(date)
            .fetch_one(conn)
            .await?;

    Ok(format!("JE-{}-{:04}", date.format("%Y%m%d"), prior + 1))
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Account Repository
//!
//! Database operations for the chart of accounts and leaf balances.
//!
//! ## Balance Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Where Does a Balance Come From?                         │
//! │                                                                         │
//! │  Nothing stores a running balance. Every balance is recomputed from     │
//! │  posted journal items on demand:                                        │
//! │                                                                         │
//! │    leaf balance  = signed Σ over posted journal_items                   │
//! │                    (debit − credit for Asset/Expense,                   │
//! │                     credit − debit for Liability/Equity/Income)         │
//! │    group balance = recursive Σ of children (AccountNode::build_tree)    │
//! │                                                                         │
//! │  Draft entries never appear in the sums.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::{Account, AccountType};

/// Debit/credit totals for one leaf account over posted entries.
///
/// Raw sums; the sign convention is applied by the caller through
/// [`AccountType::signed_balance`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountBalanceRow {
    pub account_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit_cents: i64,
    pub credit_cents: i64,
}

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Inserts an account built by the service layer.
    ///
    /// A duplicate code surfaces as [`DbError::UniqueViolation`] from the
    /// UNIQUE index on `accounts.code`.
    pub async fn insert(&self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, code = %account.code, "Inserting account");

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, code, name, account_type, parent_id,
                is_group, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&account.id)
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type)
        .bind(&account.parent_id)
        .bind(account.is_group)
        .bind(account.is_active)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an account by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, code, name, account_type, parent_id,
                   is_group, is_active, created_at, updated_at
            FROM accounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Gets an account by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, code, name, account_type, parent_id,
                   is_group, is_active, created_at, updated_at
            FROM accounts
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists every account, archived ones included, ordered by code.
    ///
    /// The chart keeps archived accounts visible because their history
    /// still contributes to group balances.
    pub async fn list_all(&self) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, code, name, account_type, parent_id,
                   is_group, is_active, created_at, updated_at
            FROM accounts
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Lists active accounts only (picker lists), ordered by code.
    pub async fn list_active(&self) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, code, name, account_type, parent_id,
                   is_group, is_active, created_at, updated_at
            FROM accounts
            WHERE is_active = 1
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Deactivates an account. History and balances are untouched; hard
    /// delete does not exist.
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Archiving account");
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                is_active = 0,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    /// Debit/credit sums per account over posted entries, optionally up to
    /// and including `as_of`. Accounts with no posted activity are absent.
    ///
    /// Feeds both the chart (signed, rolled up the tree) and the trial
    /// balance (raw debit/credit columns).
    pub async fn leaf_balance_rows(
        &self,
        as_of: Option<NaiveDate>,
    ) -> DbResult<Vec<AccountBalanceRow>> {
        let rows = match as_of {
            Some(date) => {
                sqlx::query_as::<_, AccountBalanceRow>(
                    r#"
                    SELECT a.id AS account_id,
                           a.code,
                           a.name,
                           a.account_type,
                           COALESCE(SUM(i.debit_cents), 0) AS debit_cents,
                           COALESCE(SUM(i.credit_cents), 0) AS credit_cents
                    FROM accounts a
                    JOIN journal_items i ON i.account_id = a.id
                    JOIN journal_entries e ON e.id = i.entry_id
                    WHERE e.status = 'posted' AND e.entry_date <= ?1
                    GROUP BY a.id
                    ORDER BY a.code
                    "#,
                )
                .bind(date)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, AccountBalanceRow>(
                    r#"
                    SELECT a.id AS account_id,
                           a.code,
                           a.name,
                           a.account_type,
                           COALESCE(SUM(i.debit_cents), 0) AS debit_cents,
                           COALESCE(SUM(i.credit_cents), 0) AS credit_cents
                    FROM accounts a
                    JOIN journal_items i ON i.account_id = a.id
                    JOIN journal_entries e ON e.id = i.entry_id
                    WHERE e.status = 'posted'
                    GROUP BY a.id
                    ORDER BY a.code
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::journal::JournalRepository;
    use meridian_core::{JournalEntryBuilder, JournalStatus, Money};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn account(code: &str, account_type: AccountType, parent: Option<&str>, is_group: bool) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: format!("Account {code}"),
            account_type,
            parent_id: parent.map(str::to_string),
            is_group,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = test_db().await;
        let repo = db.accounts();

        let cash = account("1100", AccountType::Asset, None, false);
        repo.insert(&cash).await.unwrap();

        let found = repo.get_by_code("1100").await.unwrap().unwrap();
        assert_eq!(found.id, cash.id);
        assert_eq!(found.name, "Account 1100");
        assert_eq!(found.account_type, AccountType::Asset);
        assert!(found.is_active);
        assert!(!found.is_group);
        assert_eq!(found.parent_id, None);

        assert!(repo.get_by_code("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.accounts();

        repo.insert(&account("1100", AccountType::Asset, None, false))
            .await
            .unwrap();
        let err = repo
            .insert(&account("1100", AccountType::Asset, None, false))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_orders_by_code_and_filters_active() {
        let db = test_db().await;
        let repo = db.accounts();

        repo.insert(&account("4000", AccountType::Income, None, false))
            .await
            .unwrap();
        let archived = account("1100", AccountType::Asset, None, false);
        repo.insert(&archived).await.unwrap();
        repo.archive(&archived.id).await.unwrap();

        let all = repo.list_all().await.unwrap();
        let codes: Vec<&str> = all.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["1100", "4000"]);
        assert!(!all[0].is_active);

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "4000");
    }

    #[tokio::test]
    async fn test_archive_unknown_account() {
        let db = test_db().await;
        let err = db.accounts().archive("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_leaf_balances_cover_posted_entries_only() {
        let db = test_db().await;
        let accounts = db.accounts();
        let journal = JournalRepository::new(db.pool().clone());

        let cash = account("1100", AccountType::Asset, None, false);
        let sales = account("4000", AccountType::Income, None, false);
        accounts.insert(&cash).await.unwrap();
        accounts.insert(&sales).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let posted = JournalEntryBuilder::new(date)
            .debit(cash.id.clone(), Money::from_cents(10000))
            .credit(sales.id.clone(), Money::from_cents(10000))
            .build()
            .unwrap();
        journal.insert(posted, JournalStatus::Posted).await.unwrap();

        let draft = JournalEntryBuilder::new(date)
            .debit(cash.id.clone(), Money::from_cents(500))
            .credit(sales.id.clone(), Money::from_cents(500))
            .build()
            .unwrap();
        journal.insert(draft, JournalStatus::Draft).await.unwrap();

        let rows = accounts.leaf_balance_rows(None).await.unwrap();
        assert_eq!(rows.len(), 2);

        let cash_row = rows.iter().find(|r| r.account_id == cash.id).unwrap();
        assert_eq!(cash_row.debit_cents, 10000);
        assert_eq!(cash_row.credit_cents, 0);

        let sales_row = rows.iter().find(|r| r.account_id == sales.id).unwrap();
        assert_eq!(sales_row.credit_cents, 10000);

        // as_of before the entry date: no activity at all
        let before = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = accounts.leaf_balance_rows(Some(before)).await.unwrap();
        assert!(rows.is_empty());

        // as_of on the entry date is inclusive
        let rows = accounts.leaf_balance_rows(Some(date)).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

}

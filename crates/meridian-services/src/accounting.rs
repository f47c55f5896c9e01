//! # Accounting Service
//!
//! Chart of accounts, manual journal entries, the general ledger, and the
//! trial balance.
//!
//! ## Balance Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  No account stores a balance.                                           │
//! │                                                                         │
//! │  chart_of_accounts()                                                    │
//! │    1. one grouped query: Σ debit, Σ credit per leaf (posted only)       │
//! │    2. sign by account type (asset/expense debit-normal)                 │
//! │    3. roll groups up from the leaves                                    │
//! │                                                                         │
//! │  Always consistent with the journal; nothing to invalidate.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use meridian_core::{
    validation::{validate_account_code, validate_date_range, validate_name},
    Account, AccountNode, AccountType, JournalEntry, JournalEntryBuilder, JournalItem,
    JournalStatus, Money, ValidationError,
};
use meridian_db::Database;

// =============================================================================
// Input / Output Types
// =============================================================================

/// Input for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountInput {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<String>,
    pub is_group: bool,
}

/// Header fields for a manual journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalHeaderInput {
    pub entry_date: NaiveDate,
    pub reference: Option<String>,
    pub description: Option<String>,
}

/// One line of a manual journal entry. Exactly one side must be positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalLineInput {
    pub account_id: String,
    pub debit_cents: i64,
    pub credit_cents: i64,
}

/// One general ledger line, joined to its entry header and account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLine {
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

    /// Signed balance after this line; present only when the ledger is
    /// filtered to a single account.
    pub running_balance_cents: Option<i64>,
}

/// One trial balance row: the account's net posted balance placed in its
/// debit or credit column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub debit_cents: i64,
    pub credit_cents: i64,
}

/// The trial balance: every leaf with posted activity, and the proof that
/// the books balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalance {
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit_cents: i64,
    pub total_credit_cents: i64,
    pub is_balanced: bool,
}

// =============================================================================
// Accounting Service
// =============================================================================

/// Service for chart and journal operations.
#[derive(Debug, Clone)]
pub struct AccountingService {
    db: Database,
}

impl AccountingService {
    /// Creates a new AccountingService.
    pub fn new(db: Database) -> Self {
        AccountingService { db }
    }

    /// The account tree with computed balances: leaves carry the signed sum
    /// of their posted journal items, groups the recursive sum of children.
    pub async fn chart_of_accounts(&self) -> ServiceResult<Vec<AccountNode>> {
        debug!("chart_of_accounts");

        // archived accounts stay in the tree so group totals keep history
        let accounts = self.db.accounts().list_all().await?;
        let balance_rows = self.db.accounts().leaf_balance_rows(None).await?;

        let leaf_balances: HashMap<String, Money> = balance_rows
            .into_iter()
            .map(|row| {
                let balance = row.account_type.signed_balance(
                    Money::from_cents(row.debit_cents),
                    Money::from_cents(row.credit_cents),
                );
                (row.account_id, balance)
            })
            .collect();

        Ok(AccountNode::build_tree(accounts, &leaf_balances))
    }

    /// Creates an account. The parent, when given, must exist and be a
    /// group; a duplicate code is rejected.
    pub async fn create_account(&self, input: CreateAccountInput) -> ServiceResult<Account> {
        debug!(code = %input.code, "create_account");

        validate_account_code(&input.code)?;
        validate_name(&input.name)?;

        if let Some(parent_id) = &input.parent_id {
            let parent = self
                .db
                .accounts()
                .get(parent_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Account", parent_id))?;
            if !parent.is_group {
                return Err(ValidationError::LeafParent { code: parent.code }.into());
            }
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            account_type: input.account_type,
            parent_id: input.parent_id,
            is_group: input.is_group,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.accounts().insert(&account).await?;

        info!(id = %account.id, code = %account.code, "Account created");
        Ok(account)
    }

    /// Archives an account: hidden from pickers, history intact.
    pub async fn archive_account(&self, id: &str) -> ServiceResult<()> {
        self.db.accounts().archive(id).await?;
        info!(id = %id, "Account archived");
        Ok(())
    }

    /// Creates and posts a journal entry in one step. The builder rejects
    /// unbalanced, short, or ill-sided input before anything is written.
    pub async fn create_journal_entry(
        &self,
        header: JournalHeaderInput,
        lines: Vec<JournalLineInput>,
    ) -> ServiceResult<(JournalEntry, Vec<JournalItem>)> {
        let balanced = build_entry(header, lines)?;
        let total = balanced.total();

        let (entry, items) = self
            .db
            .journal()
            .insert(balanced, JournalStatus::Posted)
            .await?;

        info!(entry_number = %entry.entry_number, total = %total, "Journal entry posted");
        Ok((entry, items))
    }

    /// Creates a draft journal entry: same validation, but invisible to
    /// balances and reports until posted.
    pub async fn draft_journal_entry(
        &self,
        header: JournalHeaderInput,
        lines: Vec<JournalLineInput>,
    ) -> ServiceResult<(JournalEntry, Vec<JournalItem>)> {
        let balanced = build_entry(header, lines)?;

        let (entry, items) = self
            .db
            .journal()
            .insert(balanced, JournalStatus::Draft)
            .await?;

        info!(entry_number = %entry.entry_number, "Journal entry drafted");
        Ok((entry, items))
    }

    /// Posts a draft entry. Posting anything else is a state error.
    pub async fn post_journal_entry(&self, id: &str) -> ServiceResult<JournalEntry> {
        let entry = self.db.journal().post(id).await?;
        info!(entry_number = %entry.entry_number, "Journal entry posted");
        Ok(entry)
    }

    /// Posted ledger lines, optionally filtered to one account and an
    /// inclusive date window. When a single account is selected each line
    /// carries the running signed balance.
    pub async fn general_ledger(
        &self,
        account_id: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ServiceResult<Vec<LedgerLine>> {
        validate_date_range(start_date, end_date)?;

        let account_type = match account_id {
            Some(id) => {
                let account = self
                    .db
                    .accounts()
                    .get(id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Account", id))?;
                Some(account.account_type)
            }
            None => None,
        };

        let rows = self
            .db
            .journal()
            .general_ledger(account_id, start_date, end_date)
            .await?;

        let mut running = Money::zero();
        let lines = rows
            .into_iter()
            .map(|row| {
                let running_balance_cents = account_type.map(|t| {
                    running += t.signed_balance(
                        Money::from_cents(row.debit_cents),
                        Money::from_cents(row.credit_cents),
                    );
                    running.cents()
                });
                LedgerLine {
                    entry_id: row.entry_id,
                    entry_number: row.entry_number,
                    entry_date: row.entry_date,
                    reference: row.reference,
                    description: row.description,
                    line_no: row.line_no,
                    account_id: row.account_id,
                    account_code: row.account_code,
                    account_name: row.account_name,
                    debit_cents: row.debit_cents,
                    credit_cents: row.credit_cents,
                    running_balance_cents,
                }
            })
            .collect();

        Ok(lines)
    }

    /// Per-leaf debit/credit net balances as of a date, with the balance
    /// proof. `is_balanced` is true unless the store is corrupt: the
    /// builder gate makes an unbalanced journal unrepresentable.
    pub async fn trial_balance(&self, as_of: Option<NaiveDate>) -> ServiceResult<TrialBalance> {
        let balance_rows = self.db.accounts().leaf_balance_rows(as_of).await?;

        let mut rows = Vec::with_capacity(balance_rows.len());
        let mut total_debit = 0i64;
        let mut total_credit = 0i64;

        for row in balance_rows {
            let net = row.debit_cents - row.credit_cents;
            let (debit_cents, credit_cents) = if net >= 0 { (net, 0) } else { (0, -net) };
            total_debit += debit_cents;
            total_credit += credit_cents;
            rows.push(TrialBalanceRow {
                account_code: row.code,
                account_name: row.name,
                account_type: row.account_type,
                debit_cents,
                credit_cents,
            });
        }

        Ok(TrialBalance {
            as_of,
            rows,
            total_debit_cents: total_debit,
            total_credit_cents: total_credit,
            is_balanced: total_debit == total_credit,
        })
    }
}

// =============================================================================
// Entry Assembly
// =============================================================================

fn build_entry(
    header: JournalHeaderInput,
    lines: Vec<JournalLineInput>,
) -> ServiceResult<meridian_core::BalancedEntry> {
    let mut builder = JournalEntryBuilder::new(header.entry_date);
    if let Some(reference) = header.reference {
        builder = builder.reference(reference);
    }
    if let Some(description) = header.description {
        builder = builder.description(description);
    }
    for line in lines {
        builder = builder.add_line(
            line.account_id,
            Money::from_cents(line.debit_cents),
            Money::from_cents(line.credit_cents),
        );
    }
    Ok(builder.build()?)
}

// =============================================================================
// Unit Tests
// =============================================================================

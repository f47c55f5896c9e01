//! # Journal Entries
//!
//! The double-entry journal: entry header, line items, and the builder
//! that refuses to produce an unbalanced entry.
//!
//! ## The One Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Σ debit == Σ credit, to the cent, always                   │
//! │                                                                         │
//! │  Every path that creates a journal entry goes through                   │
//! │  JournalEntryBuilder::build(), which returns BalancedEntry only         │
//! │  when the rule holds. The store accepts nothing else, so an             │
//! │  unbalanced entry is rejected before any write happens.                 │
//! │                                                                         │
//! │    JournalEntryBuilder::new(date)                                       │
//! │        .description("Invoice INV-001")                                  │
//! │        .debit(receivable_id, Money::from_cents(11700))                  │
//! │        .credit(sales_id,     Money::from_cents(10000))                  │
//! │        .credit(tax_id,       Money::from_cents(1700))                   │
//! │        .build()?                          // ← the gate                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Journal Status
// =============================================================================

/// The status of a journal entry.
///
/// Draft entries are invisible to balances, the general ledger, and every
/// report. Posted entries are immutable accounting facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Draft,
    Posted,
}

impl Default for JournalStatus {
    fn default() -> Self {
        JournalStatus::Draft
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JournalStatus::Draft => "draft",
            JournalStatus::Posted => "posted",
        })
    }
}

// =============================================================================
// Journal Source
// =============================================================================

/// Which document generated a system entry. Manual entries carry no source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum JournalSource {
    Invoice,
    PurchaseInvoice,
    Payment,
    /// Reversing entry written when a posted document is cancelled.
    Reversal,
}

// =============================================================================
// Journal Entry (header)
// =============================================================================

/// A journal entry header. Lines are stored separately as [`JournalItem`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business number ("JE-20240101-0001"), assigned by the store at insert.
    pub entry_number: String,

    /// Accounting date the entry takes effect.
    pub entry_date: NaiveDate,

    /// Free-form cross reference (invoice number, cheque number).
    pub reference: Option<String>,

    pub description: Option<String>,

    pub status: JournalStatus,

    /// Set on system-generated entries; None for manual ones.
    pub source_type: Option<JournalSource>,

    /// Id of the generating document, when source_type is set.
    pub source_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Journal Item (line)
// =============================================================================

/// One debit or credit line of a journal entry.
///
/// Exactly one of `debit_cents`/`credit_cents` is positive, the other is
/// zero. Lines keep their insertion order through `line_no`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalItem {
    pub id: String,
    pub entry_id: String,
    /// 1-based position within the entry.
    pub line_no: i64,
    pub account_id: String,
    pub debit_cents: i64,
    pub credit_cents: i64,
}

impl JournalItem {
    /// Returns the debit side as Money.
    #[inline]
    pub fn debit(&self) -> Money {
        Money::from_cents(self.debit_cents)
    }

    /// Returns the credit side as Money.
    #[inline]
    pub fn credit(&self) -> Money {
        Money::from_cents(self.credit_cents)
    }
}

// =============================================================================
// Balanced Entry (proof of balance)
// =============================================================================

/// A journal entry that has passed the balance gate.
///
/// The fields are private: the only way to obtain one is
/// [`JournalEntryBuilder::build`] (or [`BalancedEntry::reversal_of`], which
/// routes through the same builder). Persistence code accepts this type and
/// nothing else, so `Σ debit == Σ credit` holds for every stored entry by
/// construction.
#[derive(Debug, Clone)]
pub struct BalancedEntry {
    entry: JournalEntry,
    items: Vec<JournalItem>,
}

impl BalancedEntry {
    /// The entry header. Status is Draft until the store posts it.
    pub fn entry(&self) -> &JournalEntry {
        &self.entry
    }

    /// The balanced lines, in order.
    pub fn items(&self) -> &[JournalItem] {
        &self.items
    }

    /// Total of the debit side (== total of the credit side).
    pub fn total(&self) -> Money {
        self.items.iter().map(JournalItem::debit).sum()
    }

    /// Deconstructs for persistence.
    pub fn into_parts(self) -> (JournalEntry, Vec<JournalItem>) {
        (self.entry, self.items)
    }

    /// Builds the reversing entry for a posted entry: same lines with the
    /// sides swapped, dated `date`, carrying a `Reversal` source pointing
    /// back at the original.
    pub fn reversal_of(
        original: &JournalEntry,
        items: &[JournalItem],
        date: NaiveDate,
        reference: impl Into<String>,
    ) -> CoreResult<BalancedEntry> {
        let mut builder = JournalEntryBuilder::new(date)
            .reference(reference)
            .description(format!("Reversal of {}", original.entry_number))
            .source(JournalSource::Reversal, original.id.clone());
        for item in items {
            builder = builder.add_line(item.account_id.clone(), item.credit(), item.debit());
        }
        builder.build()
    }
}

// =============================================================================
// Journal Entry Builder
// =============================================================================

/// Accumulates lines and validates the whole entry on [`build`].
///
/// [`build`]: JournalEntryBuilder::build
#[derive(Debug, Clone)]
pub struct JournalEntryBuilder {
    entry_date: NaiveDate,
    reference: Option<String>,
    description: Option<String>,
    source: Option<(JournalSource, String)>,
    lines: Vec<PendingLine>,
}

#[derive(Debug, Clone)]
struct PendingLine {
    account_id: String,
    debit: Money,
    credit: Money,
}

impl JournalEntryBuilder {
    /// Starts an entry effective on `entry_date`.
    pub fn new(entry_date: NaiveDate) -> Self {
        JournalEntryBuilder {
            entry_date,
            reference: None,
            description: None,
            source: None,
            lines: Vec::new(),
        }
    }

    /// Sets the cross reference.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the entry as generated by a document.
    pub fn source(mut self, source_type: JournalSource, source_id: impl Into<String>) -> Self {
        self.source = Some((source_type, source_id.into()));
        self
    }

    /// Adds a debit line.
    pub fn debit(self, account_id: impl Into<String>, amount: Money) -> Self {
        self.add_line(account_id, amount, Money::zero())
    }

    /// Adds a credit line.
    pub fn credit(self, account_id: impl Into<String>, amount: Money) -> Self {
        self.add_line(account_id, Money::zero(), amount)
    }

    /// Adds a raw line. Validation happens in [`build`], not here, so a
    /// whole entry can be assembled before any error is reported.
    ///
    /// [`build`]: JournalEntryBuilder::build
    pub fn add_line(mut self, account_id: impl Into<String>, debit: Money, credit: Money) -> Self {
        self.lines.push(PendingLine {
            account_id: account_id.into(),
            debit,
            credit,
        });
        self
    }

    /// Number of lines added so far.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Validates and seals the entry.
    ///
    /// Checks, in order:
    /// 1. every line names an account and has exactly one positive side
    /// 2. at least two lines
    /// 3. `Σ debit == Σ credit` exactly
    ///
    /// Returns the entry as Draft; the caller decides whether the store
    /// posts it immediately.
    pub fn build(self) -> CoreResult<BalancedEntry> {
        for (idx, line) in self.lines.iter().enumerate() {
            let line_no = idx + 1;
            if line.account_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: format!("line {line_no} account_id"),
                }
                .into());
            }
            let debit_ok = line.debit.is_positive() && line.credit.is_zero();
            let credit_ok = line.credit.is_positive() && line.debit.is_zero();
            if !debit_ok && !credit_ok {
                return Err(ValidationError::InvalidLineSides { line_no }.into());
            }
        }

        if self.lines.len() < 2 {
            return Err(ValidationError::TooFewLines {
                count: self.lines.len(),
            }
            .into());
        }

        let debits: Money = self.lines.iter().map(|l| l.debit).sum();
        let credits: Money = self.lines.iter().map(|l| l.credit).sum();
        if debits != credits {
            return Err(ValidationError::UnbalancedEntry {
                debits: debits.cents(),
                credits: credits.cents(),
            }
            .into());
        }

        let now = Utc::now();
        let entry_id = Uuid::new_v4().to_string();
        let (source_type, source_id) = match self.source {
            Some((t, id)) => (Some(t), Some(id)),
            None => (None, None),
        };

        let items = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| JournalItem {
                id: Uuid::new_v4().to_string(),
                entry_id: entry_id.clone(),
                line_no: (idx + 1) as i64,
                account_id: line.account_id,
                debit_cents: line.debit.cents(),
                credit_cents: line.credit.cents(),
            })
            .collect();

        let entry = JournalEntry {
            id: entry_id,
            entry_number: String::new(),
            entry_date: self.entry_date,
            reference: self.reference,
            description: self.description,
            status: JournalStatus::Draft,
            source_type,
            source_id,
            created_at: now,
            updated_at: now,
        };

        Ok(BalancedEntry { entry, items })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_balanced_entry_builds() {
        let balanced = JournalEntryBuilder::new(date())
            .description("Cash sale")
            .debit("cash", Money::from_cents(10000))
            .credit("sales", Money::from_cents(10000))
            .build()
            .unwrap();

        assert_eq!(balanced.items().len(), 2);
        assert_eq!(balanced.total().cents(), 10000);
        assert_eq!(balanced.entry().status, JournalStatus::Draft);
        assert_eq!(balanced.entry().entry_date, date());

        let debits: i64 = balanced.items().iter().map(|i| i.debit_cents).sum();
        let credits: i64 = balanced.items().iter().map(|i| i.credit_cents).sum();
        assert_eq!(debits, credits);
    }

    #[test]
    fn test_multi_line_split_balances() {
        let balanced = JournalEntryBuilder::new(date())
            .debit("receivable", Money::from_cents(11700))
            .credit("sales", Money::from_cents(10000))
            .credit("tax_payable", Money::from_cents(1700))
            .build()
            .unwrap();
        assert_eq!(balanced.items().len(), 3);
        assert_eq!(balanced.total().cents(), 11700);
    }

    #[test]
    fn test_unbalanced_rejected() {
        let err = JournalEntryBuilder::new(date())
            .debit("cash", Money::from_cents(10000))
            .credit("sales", Money::from_cents(9900))
            .build()
            .unwrap_err();

        match err {
            CoreError::Validation(ValidationError::UnbalancedEntry { debits, credits }) => {
                assert_eq!(debits, 10000);
                assert_eq!(credits, 9900);
            }
            other => panic!("expected UnbalancedEntry, got {other:?}"),
        }
    }

    #[test]
    fn test_single_line_rejected() {
        let err = JournalEntryBuilder::new(date())
            .debit("cash", Money::from_cents(100))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooFewLines { count: 1 })
        ));
    }

    #[test]
    fn test_empty_entry_rejected() {
        let err = JournalEntryBuilder::new(date()).build().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooFewLines { count: 0 })
        ));
    }

    #[test]
    fn test_zero_sided_line_rejected() {
        let err = JournalEntryBuilder::new(date())
            .add_line("cash", Money::zero(), Money::zero())
            .credit("sales", Money::from_cents(100))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidLineSides { line_no: 1 })
        ));
    }

    #[test]
    fn test_both_sided_line_rejected() {
        let err = JournalEntryBuilder::new(date())
            .debit("cash", Money::from_cents(100))
            .add_line("sales", Money::from_cents(50), Money::from_cents(150))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidLineSides { line_no: 2 })
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = JournalEntryBuilder::new(date())
            .debit("cash", Money::from_cents(-100))
            .credit("sales", Money::from_cents(-100))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidLineSides { line_no: 1 })
        ));
    }

    #[test]
    fn test_missing_account_rejected() {
        let err = JournalEntryBuilder::new(date())
            .debit("", Money::from_cents(100))
            .credit("sales", Money::from_cents(100))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_line_numbers_follow_insertion_order() {
        let balanced = JournalEntryBuilder::new(date())
            .debit("a", Money::from_cents(300))
            .credit("b", Money::from_cents(100))
            .credit("c", Money::from_cents(200))
            .build()
            .unwrap();
        let numbers: Vec<i64> = balanced.items().iter().map(|i| i.line_no).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(balanced.items().iter().all(|i| i.entry_id == balanced.entry().id));
    }

    #[test]
    fn test_reversal_swaps_sides() {
        let original = JournalEntryBuilder::new(date())
            .debit("receivable", Money::from_cents(11700))
            .credit("sales", Money::from_cents(10000))
            .credit("tax", Money::from_cents(1700))
            .build()
            .unwrap();
        let (mut entry, items) = original.into_parts();
        entry.entry_number = "JE-20240101-0001".to_string();

        let reversal = BalancedEntry::reversal_of(&entry, &items, date(), "REV-INV-001").unwrap();

        assert_eq!(reversal.items().len(), 3);
        assert_eq!(reversal.total().cents(), 11700);
        assert_eq!(reversal.entry().source_type, Some(JournalSource::Reversal));
        assert_eq!(reversal.entry().source_id.as_deref(), Some(entry.id.as_str()));

        // first original line was a debit; reversed it is a credit
        assert_eq!(reversal.items()[0].account_id, "receivable");
        assert_eq!(reversal.items()[0].debit_cents, 0);
        assert_eq!(reversal.items()[0].credit_cents, 11700);
    }
}

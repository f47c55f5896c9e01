//! # Ledger Configuration
//!
//! Posting-account codes and document defaults, passed explicitly into the
//! service constructors. No module-level settings: two services in one
//! process can run different charts.

use std::env;

use serde::{Deserialize, Serialize};

/// Account codes the posting recipes resolve at runtime, plus document
/// defaults.
///
/// The codes must name active leaf accounts; posting fails with a
/// validation error when one points at a group, and with not-found when the
/// chart has not been bootstrapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerConfig {
    /// Cash on hand (Asset). Debited by cash payments on sales.
    pub cash_account: String,

    /// Bank (Asset). Debited by non-cash payments on sales.
    pub bank_account: String,

    /// Accounts Receivable (Asset). Debited at invoice posting.
    pub receivable_account: String,

    /// Tax Receivable (Asset). Debited for input tax on purchases.
    pub tax_receivable_account: String,

    /// Accounts Payable (Liability). Credited at bill posting.
    pub payable_account: String,

    /// Tax Payable (Liability). Credited for output tax on sales.
    pub tax_payable_account: String,

    /// Sales Income. Credited with the pre-tax amount at invoice posting.
    pub sales_account: String,

    /// Purchases/Expense. Debited with the pre-tax amount at bill posting.
    pub expense_account: String,

    /// Due date offset applied when an invoice is created without one.
    pub default_due_days: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            cash_account: "1100".to_string(),
            bank_account: "1200".to_string(),
            receivable_account: "1300".to_string(),
            tax_receivable_account: "1400".to_string(),
            payable_account: "2100".to_string(),
            tax_payable_account: "2200".to_string(),
            sales_account: "4100".to_string(),
            expense_account: "5100".to_string(),
            default_due_days: 30,
        }
    }
}

impl LedgerConfig {
    /// Sets the cash account code.
    pub fn with_cash_account(mut self, code: impl Into<String>) -> Self {
        self.cash_account = code.into();
        self
    }

    /// Sets the bank account code.
    pub fn with_bank_account(mut self, code: impl Into<String>) -> Self {
        self.bank_account = code.into();
        self
    }

    /// Sets the receivable account code.
    pub fn with_receivable_account(mut self, code: impl Into<String>) -> Self {
        self.receivable_account = code.into();
        self
    }

    /// Sets the payable account code.
    pub fn with_payable_account(mut self, code: impl Into<String>) -> Self {
        self.payable_account = code.into();
        self
    }

    /// Sets the sales income account code.
    pub fn with_sales_account(mut self, code: impl Into<String>) -> Self {
        self.sales_account = code.into();
        self
    }

    /// Sets the expense account code.
    pub fn with_expense_account(mut self, code: impl Into<String>) -> Self {
        self.expense_account = code.into();
        self
    }

    /// Sets the default due-date offset in days.
    pub fn with_default_due_days(mut self, days: i64) -> Self {
        self.default_due_days = days;
        self
    }

    /// Loads overrides from `MERIDIAN_*` environment variables on top of the
    /// defaults. Unset or unparseable variables keep the default.
    pub fn from_env() -> Self {
        let defaults = LedgerConfig::default();

        LedgerConfig {
            cash_account: env_or("MERIDIAN_CASH_ACCOUNT", defaults.cash_account),
            bank_account: env_or("MERIDIAN_BANK_ACCOUNT", defaults.bank_account),
            receivable_account: env_or("MERIDIAN_RECEIVABLE_ACCOUNT", defaults.receivable_account),
            tax_receivable_account: env_or(
                "MERIDIAN_TAX_RECEIVABLE_ACCOUNT",
                defaults.tax_receivable_account,
            ),
            payable_account: env_or("MERIDIAN_PAYABLE_ACCOUNT", defaults.payable_account),
            tax_payable_account: env_or(
                "MERIDIAN_TAX_PAYABLE_ACCOUNT",
                defaults.tax_payable_account,
            ),
            sales_account: env_or("MERIDIAN_SALES_ACCOUNT", defaults.sales_account),
            expense_account: env_or("MERIDIAN_EXPENSE_ACCOUNT", defaults.expense_account),
            default_due_days: env::var("MERIDIAN_DUE_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_due_days),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

// =============================================================================
// Unit Tests
// =============================================================================

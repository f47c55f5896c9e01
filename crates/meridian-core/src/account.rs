//! # Chart of Accounts
//!
//! Account types, the account entity, and the pure tree roll-up used by
//! the chart-of-accounts view.
//!
//! ## Account Tree
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Chart of Accounts                                  │
//! │                                                                         │
//! │  1000 Assets (group)                 balance = Σ children               │
//! │  ├── 1100 Cash            (leaf)     balance = Σ debits − Σ credits     │
//! │  ├── 1200 Bank            (leaf)                                        │
//! │  └── 1300 Receivables     (leaf)                                        │
//! │  2000 Liabilities (group)                                               │
//! │  ├── 2100 Payables        (leaf)     balance = Σ credits − Σ debits     │
//! │  └── 2200 Tax Payable     (leaf)                                        │
//! │  ...                                                                    │
//! │                                                                         │
//! │  Rules:                                                                 │
//! │  • Only leaves take journal postings                                    │
//! │  • A leaf never has children                                            │
//! │  • Group balances are recomputed on every read, never stored            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Account Type
// =============================================================================

/// The five fundamental account types.
///
/// The type decides which side of an entry increases the account:
/// Asset and Expense accounts are debit-normal, Liability, Equity and
/// Income accounts are credit-normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    /// True when debits increase the balance of this account type.
    #[inline]
    pub const fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Applies the standard sign convention to raw debit/credit totals.
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::account::AccountType;
    /// use meridian_core::money::Money;
    ///
    /// let debits = Money::from_cents(10000);
    /// let credits = Money::from_cents(2500);
    ///
    /// // Cash (asset): 100.00 in, 25.00 out → 75.00
    /// assert_eq!(
    ///     AccountType::Asset.signed_balance(debits, credits).cents(),
    ///     7500
    /// );
    /// // Sales (income) with the same raw totals reads -75.00
    /// assert_eq!(
    ///     AccountType::Income.signed_balance(debits, credits).cents(),
    ///     -7500
    /// );
    /// ```
    #[inline]
    pub fn signed_balance(&self, debits: Money, credits: Money) -> Money {
        if self.is_debit_normal() {
            debits - credits
        } else {
            credits - debits
        }
    }

    /// All types in their conventional chart order.
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Income,
        AccountType::Expense,
    ];
}

// =============================================================================
// Account
// =============================================================================

/// A node in the chart of accounts.
///
/// ## Dual-Key Identity Pattern
/// - `id`: UUID v4, immutable, used for journal references
/// - `code`: business identifier, unique and sortable ("1100" < "1200"),
///   what accountants actually type and read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, unique across the chart, lexicographically sortable.
    pub code: String,

    /// Display name ("Cash on Hand", "Accounts Receivable").
    pub name: String,

    /// One of the five fundamental types.
    pub account_type: AccountType,

    /// Parent account id; None for top-level accounts.
    pub parent_id: Option<String>,

    /// Groups organize the tree and never take postings.
    pub is_group: bool,

    /// Archived accounts are hidden from pickers but keep their history.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether journal lines may post against this account.
    #[inline]
    pub fn can_post(&self) -> bool {
        !self.is_group && self.is_active
    }
}

// =============================================================================
// Account Tree
// =============================================================================

/// An account with its computed balance and children, as returned by the
/// chart-of-accounts view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountNode {
    #[serde(flatten)]
    pub account: Account,

    /// Leaf: signed sum of the account's own posted journal items.
    /// Group: recursive sum of children.
    pub balance: Money,

    /// Child nodes ordered by code.
    pub children: Vec<AccountNode>,
}

impl AccountNode {
    /// Assembles the account tree from a flat account list and per-leaf
    /// balances, rolling group balances up from the leaves.
    ///
    /// Accounts whose id is missing from `leaf_balances` count as zero.
    /// Orphans (parent id pointing at a non-existent account) surface as
    /// roots rather than disappearing.
    pub fn build_tree(accounts: Vec<Account>, leaf_balances: &HashMap<String, Money>) -> Vec<AccountNode> {
        let known: HashMap<&str, ()> = accounts.iter().map(|a| (a.id.as_str(), ())).collect();

        let mut by_parent: HashMap<Option<String>, Vec<Account>> = HashMap::new();
        for account in accounts.iter().cloned() {
            let key = match &account.parent_id {
                Some(pid) if known.contains_key(pid.as_str()) => Some(pid.clone()),
                _ => None,
            };
            by_parent.entry(key).or_default().push(account);
        }

        let mut roots = by_parent.remove(&None).unwrap_or_default();
        roots.sort_by(|a, b| a.code.cmp(&b.code));

        roots
            .into_iter()
            .map(|account| Self::assemble(account, &mut by_parent, leaf_balances))
            .collect()
    }

    fn assemble(
        account: Account,
        by_parent: &mut HashMap<Option<String>, Vec<Account>>,
        leaf_balances: &HashMap<String, Money>,
    ) -> AccountNode {
        let mut child_accounts = by_parent.remove(&Some(account.id.clone())).unwrap_or_default();
        child_accounts.sort_by(|a, b| a.code.cmp(&b.code));

        let children: Vec<AccountNode> = child_accounts
            .into_iter()
            .map(|child| Self::assemble(child, by_parent, leaf_balances))
            .collect();

        let balance = if children.is_empty() {
            leaf_balances.get(&account.id).copied().unwrap_or_default()
        } else {
            children.iter().map(|c| c.balance).sum()
        };

        AccountNode {
            account,
            balance,
            children,
        }
    }

    /// Total number of nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(AccountNode::node_count).sum::<usize>()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, code: &str, parent: Option<&str>, is_group: bool) -> Account {
        let now = Utc::now();
        Account {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("Account {code}"),
            account_type: AccountType::Asset,
            parent_id: parent.map(str::to_string),
            is_group,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_signed_balance_convention() {
        let d = Money::from_cents(10000);
        let c = Money::from_cents(4000);

        assert_eq!(AccountType::Asset.signed_balance(d, c).cents(), 6000);
        assert_eq!(AccountType::Expense.signed_balance(d, c).cents(), 6000);
        assert_eq!(AccountType::Liability.signed_balance(d, c).cents(), -6000);
        assert_eq!(AccountType::Equity.signed_balance(d, c).cents(), -6000);
        assert_eq!(AccountType::Income.signed_balance(d, c).cents(), -6000);
    }

    #[test]
    fn test_group_balance_is_recursive_sum() {
        // 1000 (group)
        //   1100 (group)
        //     1110 leaf = 25.00
        //     1120 leaf = 75.00
        //   1200 leaf = 50.00
        let accounts = vec![
            account("a", "1000", None, true),
            account("b", "1100", Some("a"), true),
            account("c", "1110", Some("b"), false),
            account("d", "1120", Some("b"), false),
            account("e", "1200", Some("a"), false),
        ];
        let mut balances = HashMap::new();
        balances.insert("c".to_string(), Money::from_cents(2500));
        balances.insert("d".to_string(), Money::from_cents(7500));
        balances.insert("e".to_string(), Money::from_cents(5000));

        let tree = AccountNode::build_tree(accounts, &balances);
        assert_eq!(tree.len(), 1);

        let root = &tree[0];
        assert_eq!(root.balance.cents(), 15000);
        assert_eq!(root.node_count(), 5);

        let inner = &root.children[0];
        assert_eq!(inner.account.code, "1100");
        assert_eq!(inner.balance.cents(), 10000);
        // inner group's balance equals the sum of its children
        let child_sum: Money = inner.children.iter().map(|c| c.balance).sum();
        assert_eq!(inner.balance, child_sum);
    }

    #[test]
    fn test_children_sorted_by_code() {
        let accounts = vec![
            account("root", "1000", None, true),
            account("z", "1300", Some("root"), false),
            account("y", "1100", Some("root"), false),
            account("x", "1200", Some("root"), false),
        ];
        let tree = AccountNode::build_tree(accounts, &HashMap::new());
        let codes: Vec<&str> = tree[0].children.iter().map(|n| n.account.code.as_str()).collect();
        assert_eq!(codes, vec!["1100", "1200", "1300"]);
    }

    #[test]
    fn test_missing_balance_counts_as_zero() {
        let accounts = vec![account("only", "9999", None, false)];
        let tree = AccountNode::build_tree(accounts, &HashMap::new());
        assert_eq!(tree[0].balance, Money::zero());
    }

    #[test]
    fn test_orphan_surfaces_as_root() {
        let accounts = vec![account("orphan", "5100", Some("gone"), false)];
        let tree = AccountNode::build_tree(accounts, &HashMap::new());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].account.code, "5100");
    }

    #[test]
    fn test_can_post() {
        let leaf = account("l", "1100", None, false);
        assert!(leaf.can_post());

        let group = account("g", "1000", None, true);
        assert!(!group.can_post());

        let mut archived = account("a", "1110", None, false);
        archived.is_active = false;
        assert!(!archived.can_post());
    }
}

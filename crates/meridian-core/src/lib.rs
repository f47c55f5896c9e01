//! # meridian-core: Pure Domain Logic for Meridian ERP
//!
//! This crate is the **heart** of the ledger. It contains the accounting and
//! inventory rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian ERP Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  meridian-services (boundary)                   │   │
//! │  │   chart_of_accounts, create_journal_entry, post_invoice,        │   │
//! │  │   register_payment, confirm_stock_transfer, aging_report, …     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ meridian-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌──────────┐ ┌───────┐  │   │
//! │  │  │  money  │ │ account │ │  journal  │ │documents │ │inven- │  │   │
//! │  │  │  Money  │ │  tree   │ │  builder  │ │ invoice  │ │ tory  │  │   │
//! │  │  │ TaxRate │ │ roll-up │ │  balance  │ │ payment  │ │ types │  │   │
//! │  │  └─────────┘ └─────────┘ │   gate    │ └──────────┘ └───────┘  │   │
//! │  │                          └───────────┘                          │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK DECISIONS • PURE FUNCTIONS    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  meridian-db (persistence)                      │   │
//! │  │           SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer minor units, tax rates (no floating point!)
//! - [`account`] - Chart of accounts, sign convention, tree roll-up
//! - [`journal`] - Journal entries and the balancing builder
//! - [`documents`] - Invoices, purchase invoices, payments, lifecycles
//! - [`inventory`] - Locations, stock quants, movements, adjustments
//! - [`error`] - The domain error taxonomy
//! - [`validation`] - Field-level validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: every monetary value is cents (i64), never a float
//! 4. **Fail Closed**: an entry that does not balance never leaves
//!    [`journal::JournalEntryBuilder::build`]
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use meridian_core::journal::JournalEntryBuilder;
//! use meridian_core::money::Money;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let entry = JournalEntryBuilder::new(date)
//!     .description("Opening cash")
//!     .debit("cash-account-id", Money::from_cents(10000))
//!     .credit("equity-account-id", Money::from_cents(10000))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(entry.total().cents(), 10000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod documents;
pub mod error;
pub mod inventory;
pub mod journal;
pub mod money;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use account::{Account, AccountNode, AccountType};
pub use documents::{
    DocumentTotals, Invoice, InvoiceKind, InvoiceLine, InvoiceStatus, LineInput, Payment,
    PaymentMethod, PurchaseInvoice,
};
pub use error::{CoreError, CoreResult, StateError, ValidationError};
pub use inventory::{
    Location, LocationKind, MovementStatus, StockAdjustment, StockMovement, StockQuant,
};
pub use journal::{
    BalancedEntry, JournalEntry, JournalEntryBuilder, JournalItem, JournalSource, JournalStatus,
};
pub use money::{Money, TaxRate};

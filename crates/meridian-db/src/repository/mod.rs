//! # Repository Module
//!
//! Database repository implementations for the Meridian ledger core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Service call                                                           │
//! │       │                                                                 │
//! │       │  db.invoices().post(&id, balanced_entry)                        │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── create(&self, invoice, lines)                                     │
//! │  ├── get(&self, id)                                                    │
//! │  ├── post(&self, id, entry)     ← one BEGIN..COMMIT                    │
//! │  └── cancel(&self, id, date)    ← one BEGIN..COMMIT                    │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place per aggregate                          │
//! │  • The transaction boundary is visible in one function                 │
//! │  • Domain guards (status, stock) run inside the transaction            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`account::AccountRepository`] - Chart of accounts and leaf balances
//! - [`journal::JournalRepository`] - Entries, items, general ledger rows
//! - [`invoice::InvoiceRepository`] - Customer invoices and posting
//! - [`purchase_invoice::PurchaseInvoiceRepository`] - Supplier bills
//! - [`payment::PaymentRepository`] - Payment registration
//! - [`location::LocationRepository`] - Warehouse/zone/bin tree
//! - [`stock::StockRepository`] - Quants, movements, adjustments
//! - [`tax_rate::TaxRateRepository`] - Tax rate catalog

pub mod account;
pub mod invoice;
pub mod journal;
pub mod location;
pub mod payment;
pub mod purchase_invoice;
pub mod stock;
pub mod tax_rate;

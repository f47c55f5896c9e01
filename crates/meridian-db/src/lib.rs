//! # meridian-db: Persistence Layer for Meridian
//!
//! This crate provides database access for the Meridian ledger and inventory
//! core. It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Meridian Data Flow                                │
//! │                                                                         │
//! │  Service call (post_invoice, confirm_stock_transfer, ...)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   meridian-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (per agg.)    │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ AccountRepo   │    │ 0001_*.sql   │  │   │
//! │  │   │ Connection    │◄───│ JournalRepo   │    │ 0002_*.sql   │  │   │
//! │  │   │ Management    │    │ InvoiceRepo   │    │ 0003_*.sql   │  │   │
//! │  │   └───────────────┘    │ StockRepo ... │    └──────────────┘  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode, foreign keys on)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Discipline
//!
//! Every mutating repository operation runs in exactly one database
//! transaction: `BEGIN` ... validate ... write ... `COMMIT`. An operation
//! that returns an error wrote nothing. Document posting writes the journal
//! entry and flips the document status inside the same transaction, so a
//! posted invoice without its journal entry is unrepresentable.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (account, journal, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//!
//! // Create database with default config (runs migrations)
//! let config = DbConfig::new("path/to/ledger.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let accounts = db.accounts().list_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::{AccountBalanceRow, AccountRepository};
pub use repository::invoice::{InvoiceRepository, OutstandingInvoiceRow};
pub use repository::journal::{GeneralLedgerRow, JournalRepository};
pub use repository::location::LocationRepository;
pub use repository::payment::PaymentRepository;
pub use repository::purchase_invoice::PurchaseInvoiceRepository;
pub use repository::stock::{StockOnHandRow, StockRepository};
pub use repository::tax_rate::{TaxRateRepository, TaxRateRow};

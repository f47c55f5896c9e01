//! # meridian-services: Service Boundary for Meridian ERP
//!
//! The operations a caller actually invokes. Each service validates input,
//! picks the posting accounts, asks [`meridian_core`] to assemble the
//! domain objects, and hands them to [`meridian_db`] for storage. All
//! failures leave as a coded [`ServiceError`] envelope.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        meridian-services                                │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌───────────────┐             │
//! │  │   accounting   │  │   invoicing    │  │   inventory   │             │
//! │  │                │  │                │  │               │             │
//! │  │ chart, journal │  │ sale/purchase  │  │ locations,    │             │
//! │  │ entries, GL,   │  │ invoices,      │  │ transfers,    │             │
//! │  │ trial balance  │  │ payments       │  │ corrections   │             │
//! │  └────────┬───────┘  └───────┬────────┘  └───────┬───────┘             │
//! │           │                  │                   │                      │
//! │           │         ┌────────▼────────┐          │                      │
//! │           │         │     reports     │          │                      │
//! │           │         │  AR / AP aging  │          │                      │
//! │           │         └────────┬────────┘          │                      │
//! │           ▼                  ▼                   ▼                      │
//! │       meridian-core (rules)  +  meridian-db (storage)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`accounting`] - Chart of accounts, journal entries, GL, trial balance
//! - [`invoicing`] - Sale and purchase invoices, postings, payments
//! - [`inventory`] - Locations, stock transfers, quantity corrections
//! - [`reports`] - Receivables and payables aging
//! - [`config`] - Posting account codes and payment terms
//! - [`error`] - The coded error envelope

pub mod accounting;
pub mod config;
pub mod error;
pub mod inventory;
pub mod invoicing;
pub mod reports;

pub use accounting::{
    AccountingService, CreateAccountInput, JournalHeaderInput, JournalLineInput, LedgerLine,
    TrialBalance, TrialBalanceRow,
};
pub use config::LedgerConfig;
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use inventory::{InventoryService, LocationInput, TransferInput, UpdateStockInput};
pub use invoicing::{
    CreateInvoiceInput, CreatePurchaseInvoiceInput, InvoiceLineInput, InvoiceView,
    InvoicingService, PaymentInput, PurchaseInvoiceView,
};
pub use reports::{AgingBuckets, AgingKind, AgingReport, AgingRow, ReportingService};

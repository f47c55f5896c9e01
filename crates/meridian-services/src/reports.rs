//! # Reporting Service
//!
//! Receivables and payables aging.
//!
//! ## Bucket Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  days past due  =  as_of - due_date                                     │
//! │                                                                         │
//! │   ≤ 0        1-30       31-60      61-90       > 90                     │
//! │  current │ 1-30 days │ 31-60 d │ 61-90 d │ over 90 days                 │
//! │                                                                         │
//! │  Every outstanding amount lands in exactly one bucket, so the           │
//! │  bucket sums always add up to the grand total.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Outstanding means posted or partially paid; what is aged is the unpaid
//! remainder, not the face value.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceResult;
use meridian_db::Database;

// =============================================================================
// Report Types
// =============================================================================

/// Which side of the balance sheet to age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingKind {
    /// Customer invoices (money owed to us).
    Receivable,
    /// Supplier bills (money we owe).
    Payable,
}

impl fmt::Display for AgingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgingKind::Receivable => "receivable",
            AgingKind::Payable => "payable",
        })
    }
}

/// Outstanding amounts split by how overdue they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingBuckets {
    pub current_cents: i64,
    pub days_1_30_cents: i64,
    pub days_31_60_cents: i64,
    pub days_61_90_cents: i64,
    pub days_over_90_cents: i64,
}

impl AgingBuckets {
    /// Adds an amount to the bucket its age falls in.
    fn add(&mut self, days_past_due: i64, cents: i64) {
        match days_past_due {
            d if d <= 0 => self.current_cents += cents,
            d if d <= 30 => self.days_1_30_cents += cents,
            d if d <= 60 => self.days_31_60_cents += cents,
            d if d <= 90 => self.days_61_90_cents += cents,
            _ => self.days_over_90_cents += cents,
        }
    }

    /// Sum across all buckets.
    pub fn total(&self) -> i64 {
        self.current_cents
            + self.days_1_30_cents
            + self.days_31_60_cents
            + self.days_61_90_cents
            + self.days_over_90_cents
    }
}

/// One partner's outstanding position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingRow {
    pub partner_id: String,
    #[serde(flatten)]
    pub buckets: AgingBuckets,
    pub total_cents: i64,
}

/// The full aging report: one row per partner plus column totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingReport {
    pub kind: AgingKind,
    pub as_of: NaiveDate,
    pub rows: Vec<AgingRow>,
    pub totals: AgingBuckets,
    pub grand_total_cents: i64,
}

// =============================================================================
// Reporting Service
// =============================================================================

/// Service for cross-module reports.
#[derive(Debug, Clone)]
pub struct ReportingService {
    db: Database,
}

impl ReportingService {
    /// Creates a new ReportingService.
    pub fn new(db: Database) -> Self {
        ReportingService { db }
    }

    /// Ages everything outstanding as of a date, grouped by partner.
    /// Partners are ordered by id so the report is stable run to run.
    pub async fn aging_report(
        &self,
        kind: AgingKind,
        as_of: NaiveDate,
    ) -> ServiceResult<AgingReport> {
        debug!(kind = %kind, as_of = %as_of, "aging_report");

        let outstanding = match kind {
            AgingKind::Receivable => self.db.invoices().outstanding().await?,
            AgingKind::Payable => self.db.purchase_invoices().outstanding().await?,
        };

        let mut per_partner: BTreeMap<String, AgingBuckets> = BTreeMap::new();
        let mut totals = AgingBuckets::default();

        for row in outstanding {
            let remainder = row.total_cents - row.paid_cents;
            if remainder <= 0 {
                continue;
            }
            let days_past_due = (as_of - row.due_date).num_days();
            per_partner
                .entry(row.partner_id)
                .or_default()
                .add(days_past_due, remainder);
            totals.add(days_past_due, remainder);
        }

        let rows = per_partner
            .into_iter()
            .map(|(partner_id, buckets)| AgingRow {
                partner_id,
                total_cents: buckets.total(),
                buckets,
            })
            .collect();

        Ok(AgingReport {
            kind,
            as_of,
            rows,
            grand_total_cents: totals.total(),
            totals,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::invoicing::{
        CreateInvoiceInput, CreatePurchaseInvoiceInput, InvoiceLineInput, InvoicingService,
        PaymentInput,
    };
    use meridian_core::{Account, AccountType, InvoiceKind, PaymentMethod};
    use meridian_db::{Database, DbConfig};

    async fn services() -> (InvoicingService, ReportingService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_accounts(&db).await;
        (
            InvoicingService::new(db.clone(), LedgerConfig::default()),
            ReportingService::new(db),
        )
    }

    async fn seed_accounts(db: &Database) {
        let specs = [
            ("1100", AccountType::Asset),
            ("1200", AccountType::Asset),
            ("1300", AccountType::Asset),
            ("1400", AccountType::Asset),
            ("2100", AccountType::Liability),
            ("2200", AccountType::Liability),
            ("4100", AccountType::Income),
            ("5100", AccountType::Expense),
        ];
        for (code, account_type) in specs {
            let now = chrono::Utc::now();
            db.accounts()
                .insert(&Account {
                    id: format!("acc-{code}"),
                    code: code.to_string(),
                    name: format!("Account {code}"),
                    account_type,
                    parent_id: None,
                    is_group: false,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Creates and posts an invoice for `customer` due on `due`, worth
    /// `total_cents`, returning its id.
    async fn posted_invoice(
        svc: &InvoicingService,
        customer: &str,
        due: NaiveDate,
        total_cents: i64,
    ) -> String {
        let invoice = svc
            .create_invoice(CreateInvoiceInput {
                customer_id: customer.to_string(),
                invoice_date: date(2024, 1, 1),
                due_date: Some(due),
                notes: None,
                lines: vec![InvoiceLineInput {
                    product_id: None,
                    description: "Service".to_string(),
                    quantity: 1,
                    unit_price_cents: total_cents,
                    tax_rate_bps: 0,
                }],
            })
            .await
            .unwrap();
        svc.post_invoice(&invoice.id).await.unwrap();
        invoice.id
    }

    #[tokio::test]
    async fn test_buckets_split_on_boundaries() {
        let (invoicing, reporting) = services().await;
        let as_of = date(2024, 6, 30);

        // due today, 30 / 31 / 90 / 91 days ago
        posted_invoice(&invoicing, "c-current", as_of, 1000).await;
        posted_invoice(&invoicing, "c-30", date(2024, 5, 31), 2000).await;
        posted_invoice(&invoicing, "c-31", date(2024, 5, 30), 3000).await;
        posted_invoice(&invoicing, "c-90", date(2024, 4, 1), 4000).await;
        posted_invoice(&invoicing, "c-91", date(2024, 3, 31), 5000).await;

        let report = reporting
            .aging_report(AgingKind::Receivable, as_of)
            .await
            .unwrap();

        assert_eq!(report.totals.current_cents, 1000);
        assert_eq!(report.totals.days_1_30_cents, 2000);
        assert_eq!(report.totals.days_31_60_cents, 3000);
        assert_eq!(report.totals.days_61_90_cents, 4000);
        assert_eq!(report.totals.days_over_90_cents, 5000);
        assert_eq!(report.grand_total_cents, 15000);

        // every amount is in exactly one bucket
        assert_eq!(report.totals.total(), report.grand_total_cents);
        let row_sum: i64 = report.rows.iter().map(|r| r.total_cents).sum();
        assert_eq!(row_sum, report.grand_total_cents);
    }

    #[tokio::test]
    async fn test_partial_payment_ages_the_remainder() {
        let (invoicing, reporting) = services().await;
        let as_of = date(2024, 6, 30);

        let id = posted_invoice(&invoicing, "cust-1", date(2024, 6, 10), 10000).await;
        invoicing
            .register_payment(PaymentInput {
                invoice_id: id,
                invoice_kind: InvoiceKind::Sale,
                payment_date: date(2024, 6, 15),
                amount_cents: 6000,
                method: PaymentMethod::BankTransfer,
                reference: None,
            })
            .await
            .unwrap();

        let report = reporting
            .aging_report(AgingKind::Receivable, as_of)
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].buckets.days_1_30_cents, 4000);
        assert_eq!(report.grand_total_cents, 4000);
    }

    #[tokio::test]
    async fn test_drafts_and_paid_are_excluded() {
        let (invoicing, reporting) = services().await;
        let as_of = date(2024, 6, 30);

        // draft: never aged
        invoicing
            .create_invoice(CreateInvoiceInput {
                customer_id: "cust-1".to_string(),
                invoice_date: date(2024, 1, 1),
                due_date: Some(date(2024, 2, 1)),
                notes: None,
                lines: vec![InvoiceLineInput {
                    product_id: None,
                    description: "Draft work".to_string(),
                    quantity: 1,
                    unit_price_cents: 9999,
                    tax_rate_bps: 0,
                }],
            })
            .await
            .unwrap();

        // fully paid: drops out
        let id = posted_invoice(&invoicing, "cust-2", date(2024, 6, 10), 5000).await;
        invoicing
            .register_payment(PaymentInput {
                invoice_id: id,
                invoice_kind: InvoiceKind::Sale,
                payment_date: date(2024, 6, 15),
                amount_cents: 5000,
                method: PaymentMethod::Cash,
                reference: None,
            })
            .await
            .unwrap();

        let report = reporting
            .aging_report(AgingKind::Receivable, as_of)
            .await
            .unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.grand_total_cents, 0);
    }

    #[tokio::test]
    async fn test_rows_group_by_partner_in_order() {
        let (invoicing, reporting) = services().await;
        let as_of = date(2024, 6, 30);

        posted_invoice(&invoicing, "beta", date(2024, 6, 1), 1000).await;
        posted_invoice(&invoicing, "alpha", date(2024, 6, 1), 2000).await;
        posted_invoice(&invoicing, "alpha", date(2024, 1, 1), 3000).await;

        let report = reporting
            .aging_report(AgingKind::Receivable, as_of)
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].partner_id, "alpha");
        assert_eq!(report.rows[0].total_cents, 5000);
        assert_eq!(report.rows[1].partner_id, "beta");
        assert_eq!(report.rows[1].total_cents, 1000);
    }

    #[tokio::test]
    async fn test_payable_side_ages_bills() {
        let (invoicing, reporting) = services().await;
        let as_of = date(2024, 6, 30);

        let bill = invoicing
            .create_purchase_invoice(CreatePurchaseInvoiceInput {
                supplier_id: "supp-1".to_string(),
                invoice_date: date(2024, 4, 1),
                due_date: Some(date(2024, 5, 1)),
                notes: None,
                lines: vec![InvoiceLineInput {
                    product_id: None,
                    description: "Materials".to_string(),
                    quantity: 1,
                    unit_price_cents: 8000,
                    tax_rate_bps: 0,
                }],
            })
            .await
            .unwrap();
        invoicing.post_purchase_invoice(&bill.id).await.unwrap();

        let payables = reporting
            .aging_report(AgingKind::Payable, as_of)
            .await
            .unwrap();
        assert_eq!(payables.rows.len(), 1);
        assert_eq!(payables.rows[0].partner_id, "supp-1");
        // 60 days past due on 2024-06-30
        assert_eq!(payables.rows[0].buckets.days_31_60_cents, 8000);

        // the receivable side is untouched by bills
        let receivables = reporting
            .aging_report(AgingKind::Receivable, as_of)
            .await
            .unwrap();
        assert!(receivables.rows.is_empty());
    }
}

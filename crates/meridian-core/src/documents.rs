//! # Trading Documents
//!
//! Invoices, purchase invoices, and payments, plus the lifecycle rules
//! that govern them.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   draft ──post──► posted ──payment──► partially_paid ──payment──► paid  │
//! │     │               │                      │                            │
//! │     │               │ (no payments yet)    │                            │
//! │     ▼               ▼                      ▼                            │
//! │  cancelled      cancelled              (cannot cancel,                  │
//! │  (no journal    (reversing entry        payments exist)                 │
//! │   effect)        posted)                                                │
//! │                                                                         │
//! │  post:    only from draft; writes exactly one journal entry             │
//! │  payment: only from posted / partially_paid; never exceeds the          │
//! │           outstanding balance, so paid is reached exactly at            │
//! │           cumulative == total                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line items freeze `unit_price` and `tax_rate_bps` at creation, so a later
//! tax-rate change never rewrites a document that is already in flight.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, TaxRate};

// =============================================================================
// Invoice Status
// =============================================================================

/// The status of an invoice or purchase invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Items mutable, no journal entry, invisible to AR/AP.
    Draft,
    /// Journal entry written, awaiting payment in full.
    Posted,
    /// Some payment received, balance still outstanding.
    PartiallyPaid,
    /// Cumulative payments reached the total.
    Paid,
    /// Terminal. Posted documents get a reversing entry on the way here.
    Cancelled,
}

impl InvoiceStatus {
    /// Posting is only valid from draft.
    #[inline]
    pub fn can_post(&self) -> bool {
        matches!(self, InvoiceStatus::Draft)
    }

    /// Payments apply only while a posted balance is outstanding.
    #[inline]
    pub fn can_receive_payment(&self) -> bool {
        matches!(self, InvoiceStatus::Posted | InvoiceStatus::PartiallyPaid)
    }

    /// Whether the document still counts toward AR/AP aging.
    #[inline]
    pub fn is_outstanding(&self) -> bool {
        self.can_receive_payment()
    }

    /// Status after a payment brings cumulative receipts to `paid`.
    pub fn after_payment(total: Money, paid: Money) -> InvoiceStatus {
        if paid >= total {
            InvoiceStatus::Paid
        } else if paid.is_positive() {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Posted
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Posted => "posted",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Invoice Kind
// =============================================================================

/// Distinguishes customer invoices (AR side) from purchase invoices (AP side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Sale,
    Purchase,
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvoiceKind::Sale => "sale",
            InvoiceKind::Purchase => "purchase",
        })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment was made. Decides whether the cash or the bank account
/// takes the counter-posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

impl PaymentMethod {
    /// Cash hits the cash account; everything else clears through the bank.
    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Cheque => "cheque",
        })
    }
}

// =============================================================================
// Invoice Line
// =============================================================================

/// A line item on an invoice or purchase invoice.
///
/// Uses the snapshot pattern: `unit_price_cents` and `tax_rate_bps` are
/// frozen copies taken when the line was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    /// 1-based position within the document.
    pub line_no: i64,
    /// Opaque product reference; product master data lives outside this core.
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    /// Unit price in cents at time of writing (frozen).
    pub unit_price_cents: i64,
    /// Tax rate in basis points at time of writing (frozen).
    pub tax_rate_bps: u32,
    /// quantity × unit_price, before tax.
    pub line_total_cents: i64,
    /// Tax on this line, rounded per line.
    pub tax_cents: i64,
}

impl InvoiceLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }
}

/// Caller-supplied line data before totals are computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
}

// =============================================================================
// Document Totals
// =============================================================================

/// Subtotal, tax, and grand total of a document, derived from its lines.
///
/// Tax is computed and rounded per line, then summed, so the stored line
/// amounts always add up to the stored totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Computes totals over caller-supplied lines.
    pub fn compute(lines: &[LineInput]) -> DocumentTotals {
        let mut subtotal = Money::zero();
        let mut tax = Money::zero();
        for line in lines {
            let line_total = line.unit_price * line.quantity;
            subtotal += line_total;
            tax += line_total.calculate_tax(line.tax_rate);
        }
        DocumentTotals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A customer invoice (receivable side).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business number ("INV-20240101-0001"), assigned at insert.
    pub number: String,

    /// Opaque customer reference; the customer master lives outside this core.
    pub customer_id: String,

    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,

    pub status: InvoiceStatus,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,

    /// The journal entry written at posting; None while draft.
    pub journal_entry_id: Option<String>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// What is still owed given cumulative payments of `paid`.
    #[inline]
    pub fn outstanding(&self, paid: Money) -> Money {
        self.total() - paid
    }
}

// =============================================================================
// Purchase Invoice
// =============================================================================

/// A supplier bill (payable side). Mirrors [`Invoice`] with the supplier
/// in place of the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseInvoice {
    pub id: String,

    /// Business number ("BILL-20240101-0001"), assigned at insert.
    pub number: String,

    /// Opaque supplier reference.
    pub supplier_id: String,

    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,

    pub status: InvoiceStatus,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,

    pub journal_entry_id: Option<String>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseInvoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn outstanding(&self, paid: Money) -> Money {
        self.total() - paid
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment registered against a posted invoice. Each payment generates
/// its own journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,

    /// The invoice this payment settles (sale or purchase side).
    pub invoice_id: String,
    pub invoice_kind: InvoiceKind,

    pub payment_date: NaiveDate,
    pub amount_cents: i64,
    pub method: PaymentMethod,

    /// External reference (transaction id, cheque number).
    pub reference: Option<String>,

    /// The journal entry this payment generated.
    pub journal_entry_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, unit_cents: i64, bps: u32) -> LineInput {
        LineInput {
            product_id: None,
            description: "test line".to_string(),
            quantity: qty,
            unit_price: Money::from_cents(unit_cents),
            tax_rate: TaxRate::from_bps(bps),
        }
    }

    #[test]
    fn test_totals_simple() {
        let totals = DocumentTotals::compute(&[line(2, 5000, 0)]);
        assert_eq!(totals.subtotal.cents(), 10000);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 10000);
    }

    #[test]
    fn test_totals_with_tax_rounded_per_line() {
        // 3 × 3.33 = 9.99; 8.25% of 9.99 = 0.824175 → 0.82
        let totals = DocumentTotals::compute(&[line(3, 333, 825), line(1, 10000, 1700)]);
        assert_eq!(totals.subtotal.cents(), 999 + 10000);
        assert_eq!(totals.tax.cents(), 82 + 1700);
        assert_eq!(totals.total.cents(), 10999 + 1782);
    }

    #[test]
    fn test_status_guards() {
        assert!(InvoiceStatus::Draft.can_post());
        assert!(!InvoiceStatus::Posted.can_post());
        assert!(!InvoiceStatus::Cancelled.can_post());

        assert!(InvoiceStatus::Posted.can_receive_payment());
        assert!(InvoiceStatus::PartiallyPaid.can_receive_payment());
        assert!(!InvoiceStatus::Draft.can_receive_payment());
        assert!(!InvoiceStatus::Paid.can_receive_payment());
        assert!(!InvoiceStatus::Cancelled.can_receive_payment());
    }

    #[test]
    fn test_after_payment_progression() {
        let total = Money::from_cents(10000);

        assert_eq!(
            InvoiceStatus::after_payment(total, Money::from_cents(6000)),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(
            InvoiceStatus::after_payment(total, Money::from_cents(10000)),
            InvoiceStatus::Paid
        );
        assert_eq!(
            InvoiceStatus::after_payment(total, Money::zero()),
            InvoiceStatus::Posted
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(InvoiceStatus::PartiallyPaid.to_string(), "partially_paid");
        assert_eq!(InvoiceStatus::Draft.to_string(), "draft");
    }

    #[test]
    fn test_payment_method_routing() {
        assert!(PaymentMethod::Cash.is_cash());
        assert!(!PaymentMethod::BankTransfer.is_cash());
        assert!(!PaymentMethod::Card.is_cash());
        assert!(!PaymentMethod::Cheque.is_cash());
    }
}

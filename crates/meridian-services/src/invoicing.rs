//! # Invoicing Service
//!
//! Sale and purchase invoices, their postings, and payments.
//!
//! ## Posting Recipes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Post sale invoice              Post purchase invoice                   │
//! │    DR  Receivable      total      DR  Expense          subtotal         │
//! │    CR  Sales           subtotal   DR  Tax Receivable   tax              │
//! │    CR  Tax Payable     tax        CR  Payable          total            │
//! │                                                                         │
//! │  Payment on sale                Payment on purchase                     │
//! │    DR  Cash / Bank     amount     DR  Payable          amount           │
//! │    CR  Receivable      amount     CR  Cash / Bank      amount           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Account codes come from [`LedgerConfig`]; the deposit side follows the
//! payment method (cash vs everything else). Tax lines are emitted only
//! when the document actually carries tax.
//!
//! Cancelling a posted document writes a reversing entry rather than
//! deleting anything, so the ledger keeps its full history.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{ServiceError, ServiceResult};
use meridian_core::{
    validation::{
        validate_due_date, validate_name, validate_payment_amount, validate_price_cents,
        validate_quantity, validate_tax_rate_bps,
    },
    DocumentTotals, Invoice, InvoiceKind, InvoiceLine, InvoiceStatus, JournalEntryBuilder,
    JournalSource, LineInput, Money, Payment, PaymentMethod, PurchaseInvoice, TaxRate,
    ValidationError,
};
use meridian_db::Database;

// =============================================================================
// Input / Output Types
// =============================================================================

/// One document line as entered by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineInput {
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub tax_rate_bps: u32,
}

/// Input for creating a sale invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceInput {
    pub customer_id: String,
    pub invoice_date: NaiveDate,
    /// Defaults to invoice date + the configured payment terms.
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<InvoiceLineInput>,
}

/// Input for creating a purchase invoice (supplier bill).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseInvoiceInput {
    pub supplier_id: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<InvoiceLineInput>,
}

/// Input for registering a payment against a posted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub invoice_id: String,
    pub invoice_kind: InvoiceKind,
    pub payment_date: NaiveDate,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

/// A sale invoice with its lines and payment state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    pub payments: Vec<Payment>,
}

/// A purchase invoice with its lines and payment state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInvoiceView {
    #[serde(flatten)]
    pub invoice: PurchaseInvoice,
    pub lines: Vec<InvoiceLine>,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    pub payments: Vec<Payment>,
}

// =============================================================================
// Invoicing Service
// =============================================================================

/// Service for invoice and payment operations.
#[derive(Debug, Clone)]
pub struct InvoicingService {
    db: Database,
    config: LedgerConfig,
}

impl InvoicingService {
    /// Creates a new InvoicingService.
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        InvoicingService { db, config }
    }

    // -------------------------------------------------------------------------
    // Sale Invoices
    // -------------------------------------------------------------------------

    /// Creates a draft sale invoice. Totals are computed from the lines;
    /// the due date falls back to the configured payment terms.
    pub async fn create_invoice(&self, input: CreateInvoiceInput) -> ServiceResult<Invoice> {
        debug!(
            customer_id = %input.customer_id,
            lines = input.lines.len(),
            "create_invoice"
        );

        if input.customer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customer_id".to_string(),
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let (totals, lines) = convert_lines(&id, &input.lines)?;
        let due_date = self.resolve_due_date(input.invoice_date, input.due_date)?;

        let now = Utc::now();
        let invoice = Invoice {
            id,
            number: String::new(),
            customer_id: input.customer_id.trim().to_string(),
            invoice_date: input.invoice_date,
            due_date,
            status: InvoiceStatus::Draft,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            journal_entry_id: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let invoice = self.db.invoices().create(invoice, lines).await?;
        info!(number = %invoice.number, total = %invoice.total(), "Invoice created");
        Ok(invoice)
    }

    /// An invoice with its lines and payment history.
    pub async fn get_invoice(&self, id: &str) -> ServiceResult<InvoiceView> {
        let invoice = self
            .db
            .invoices()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", id))?;
        let lines = self.db.invoices().get_lines(id).await?;
        let payments = self
            .db
            .payments()
            .list_for_invoice(id, InvoiceKind::Sale)
            .await?;
        let paid_cents: i64 = payments.iter().map(|p| p.amount_cents).sum();

        Ok(InvoiceView {
            paid_cents,
            outstanding_cents: invoice.total_cents - paid_cents,
            invoice,
            lines,
            payments,
        })
    }

    /// Posts a draft sale invoice: writes its journal entry (receivable
    /// against sales and tax payable) and moves it to `Posted`.
    pub async fn post_invoice(&self, id: &str) -> ServiceResult<Invoice> {
        let invoice = self
            .db
            .invoices()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", id))?;

        let receivable = self.posting_account(&self.config.receivable_account).await?;
        let sales = self.posting_account(&self.config.sales_account).await?;

        let mut builder = JournalEntryBuilder::new(invoice.invoice_date)
            .reference(invoice.number.clone())
            .description(format!("Invoice {}", invoice.number))
            .source(JournalSource::Invoice, invoice.id.clone())
            .debit(receivable, invoice.total())
            .credit(sales, invoice.subtotal());
        if invoice.tax_cents > 0 {
            let tax_payable = self.posting_account(&self.config.tax_payable_account).await?;
            builder = builder.credit(tax_payable, invoice.tax());
        }
        let entry = builder.build()?;

        let invoice = self.db.invoices().post(id, entry).await?;
        info!(number = %invoice.number, total = %invoice.total(), "Invoice posted");
        Ok(invoice)
    }

    /// Cancels a sale invoice. Drafts are marked cancelled; posted
    /// invoices get a reversing entry dated today. Paid documents cannot
    /// be cancelled.
    pub async fn cancel_invoice(&self, id: &str) -> ServiceResult<Invoice> {
        let invoice = self
            .db
            .invoices()
            .cancel(id, Utc::now().date_naive())
            .await?;
        info!(number = %invoice.number, "Invoice cancelled");
        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Purchase Invoices
    // -------------------------------------------------------------------------

    /// Creates a draft purchase invoice.
    pub async fn create_purchase_invoice(
        &self,
        input: CreatePurchaseInvoiceInput,
    ) -> ServiceResult<PurchaseInvoice> {
        debug!(
            supplier_id = %input.supplier_id,
            lines = input.lines.len(),
            "create_purchase_invoice"
        );

        if input.supplier_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "supplier_id".to_string(),
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let (totals, lines) = convert_lines(&id, &input.lines)?;
        let due_date = self.resolve_due_date(input.invoice_date, input.due_date)?;

        let now = Utc::now();
        let invoice = PurchaseInvoice {
            id,
            number: String::new(),
            supplier_id: input.supplier_id.trim().to_string(),
            invoice_date: input.invoice_date,
            due_date,
            status: InvoiceStatus::Draft,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            journal_entry_id: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let invoice = self.db.purchase_invoices().create(invoice, lines).await?;
        info!(number = %invoice.number, total = %invoice.total(), "Purchase invoice created");
        Ok(invoice)
    }

    /// A purchase invoice with its lines and payment history.
    pub async fn get_purchase_invoice(&self, id: &str) -> ServiceResult<PurchaseInvoiceView> {
        let invoice = self
            .db
            .purchase_invoices()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase invoice", id))?;
        let lines = self.db.purchase_invoices().get_lines(id).await?;
        let payments = self
            .db
            .payments()
            .list_for_invoice(id, InvoiceKind::Purchase)
            .await?;
        let paid_cents: i64 = payments.iter().map(|p| p.amount_cents).sum();

        Ok(PurchaseInvoiceView {
            paid_cents,
            outstanding_cents: invoice.total_cents - paid_cents,
            invoice,
            lines,
            payments,
        })
    }

    /// Posts a draft purchase invoice: expense and recoverable tax against
    /// the payable account.
    pub async fn post_purchase_invoice(&self, id: &str) -> ServiceResult<PurchaseInvoice> {
        let invoice = self
            .db
            .purchase_invoices()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase invoice", id))?;

        let expense = self.posting_account(&self.config.expense_account).await?;
        let payable = self.posting_account(&self.config.payable_account).await?;

        let mut builder = JournalEntryBuilder::new(invoice.invoice_date)
            .reference(invoice.number.clone())
            .description(format!("Bill {}", invoice.number))
            .source(JournalSource::PurchaseInvoice, invoice.id.clone())
            .debit(expense, invoice.subtotal());
        if invoice.tax_cents > 0 {
            let tax_receivable = self
                .posting_account(&self.config.tax_receivable_account)
                .await?;
            builder = builder.debit(tax_receivable, invoice.tax());
        }
        let entry = builder.credit(payable, invoice.total()).build()?;

        let invoice = self.db.purchase_invoices().post(id, entry).await?;
        info!(number = %invoice.number, total = %invoice.total(), "Purchase invoice posted");
        Ok(invoice)
    }

    /// Cancels a purchase invoice, reversing its posting if needed.
    pub async fn cancel_purchase_invoice(&self, id: &str) -> ServiceResult<PurchaseInvoice> {
        let invoice = self
            .db
            .purchase_invoices()
            .cancel(id, Utc::now().date_naive())
            .await?;
        info!(number = %invoice.number, "Purchase invoice cancelled");
        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Registers a payment against a posted document and writes its journal
    /// entry. The repository enforces payability and the overpayment limit
    /// inside one transaction; this layer picks the accounts.
    pub async fn register_payment(&self, input: PaymentInput) -> ServiceResult<Payment> {
        debug!(
            invoice_id = %input.invoice_id,
            kind = %input.invoice_kind,
            amount_cents = input.amount_cents,
            "register_payment"
        );

        validate_payment_amount(input.amount_cents)?;

        let amount = Money::from_cents(input.amount_cents);
        let deposit_code = if input.method.is_cash() {
            &self.config.cash_account
        } else {
            &self.config.bank_account
        };
        let deposit = self.posting_account(deposit_code).await?;

        let payment_id = Uuid::new_v4().to_string();
        let (number, entry) = match input.invoice_kind {
            InvoiceKind::Sale => {
                let invoice = self
                    .db
                    .invoices()
                    .get(&input.invoice_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Invoice", &input.invoice_id))?;
                let receivable = self.posting_account(&self.config.receivable_account).await?;
                let entry = JournalEntryBuilder::new(input.payment_date)
                    .reference(invoice.number.clone())
                    .description(format!("Payment for {}", invoice.number))
                    .source(JournalSource::Payment, payment_id.clone())
                    .debit(deposit, amount)
                    .credit(receivable, amount)
                    .build()?;
                (invoice.number, entry)
            }
            InvoiceKind::Purchase => {
                let invoice = self
                    .db
                    .purchase_invoices()
                    .get(&input.invoice_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::not_found("Purchase invoice", &input.invoice_id)
                    })?;
                let payable = self.posting_account(&self.config.payable_account).await?;
                let entry = JournalEntryBuilder::new(input.payment_date)
                    .reference(invoice.number.clone())
                    .description(format!("Payment for {}", invoice.number))
                    .source(JournalSource::Payment, payment_id.clone())
                    .debit(payable, amount)
                    .credit(deposit, amount)
                    .build()?;
                (invoice.number, entry)
            }
        };

        let now = Utc::now();
        let payment = Payment {
            id: payment_id,
            invoice_id: input.invoice_id,
            invoice_kind: input.invoice_kind,
            payment_date: input.payment_date,
            amount_cents: input.amount_cents,
            method: input.method,
            reference: input.reference,
            journal_entry_id: None,
            created_at: now,
        };

        let payment = self.db.payments().register(payment, entry).await?;
        info!(number = %number, amount = %amount, "Payment registered");
        Ok(payment)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Resolves a configured account code to an account the journal can
    /// post to. Group and archived accounts are rejected.
    async fn posting_account(&self, code: &str) -> ServiceResult<String> {
        let account = self
            .db
            .accounts()
            .get_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", code))?;
        if !account.can_post() {
            return Err(ValidationError::GroupAccountPosting { code: account.code }.into());
        }
        Ok(account.id)
    }

    fn resolve_due_date(
        &self,
        invoice_date: NaiveDate,
        due_date: Option<NaiveDate>,
    ) -> ServiceResult<NaiveDate> {
        let due_date = match due_date {
            Some(date) => date,
            None => invoice_date + Duration::days(self.config.default_due_days),
        };
        validate_due_date(invoice_date, due_date)?;
        Ok(due_date)
    }
}

// =============================================================================
// Line Assembly
// =============================================================================

/// Validates caller lines and materializes them as numbered document rows.
/// Per-line tax is rounded before summing, so stored lines always add up
/// to the stored totals.
fn convert_lines(
    invoice_id: &str,
    lines: &[InvoiceLineInput],
) -> ServiceResult<(DocumentTotals, Vec<InvoiceLine>)> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        }
        .into());
    }

    let mut inputs = Vec::with_capacity(lines.len());
    for line in lines {
        validate_name(&line.description)?;
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;
        validate_tax_rate_bps(line.tax_rate_bps)?;
        inputs.push(LineInput {
            product_id: line.product_id.clone(),
            description: line.description.trim().to_string(),
            quantity: line.quantity,
            unit_price: Money::from_cents(line.unit_price_cents),
            tax_rate: TaxRate::from_bps(line.tax_rate_bps),
        });
    }

    let totals = DocumentTotals::compute(&inputs);

    let rows = inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            let line_total = input.unit_price * input.quantity;
            let tax = line_total.calculate_tax(input.tax_rate);
            InvoiceLine {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice_id.to_string(),
                line_no: (i + 1) as i64,
                product_id: input.product_id,
                description: input.description,
                quantity: input.quantity,
                unit_price_cents: input.unit_price.cents(),
                tax_rate_bps: input.tax_rate.bps(),
                line_total_cents: line_total.cents(),
                tax_cents: tax.cents(),
            }
        })
        .collect();

    Ok((totals, rows))
}

// =============================================================================
// Unit Tests
// =============================================================================

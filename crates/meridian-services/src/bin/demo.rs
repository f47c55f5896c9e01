//! # Demo Walkthrough
//!
//! Boots a Meridian database, seeds a minimal chart of accounts, and runs
//! one trading cycle end to end: buy stock on credit, sell it, collect the
//! money, move goods between warehouses, then print the books.
//!
//! ## Usage
//! ```bash
//! # Run against the default dev database
//! cargo run -p meridian-services --bin demo
//!
//! # Specify database path
//! cargo run -p meridian-services --bin demo -- --db ./data/meridian.db
//! ```
//!
//! Safe to re-run: if the chart already exists the cycle is skipped and
//! only the reports are printed.

use std::collections::HashMap;
use std::env;

use chrono::{Duration, Utc};
use tracing::Level;

use meridian_core::{AccountNode, AccountType, InvoiceKind, LocationKind, PaymentMethod};
use meridian_db::{Database, DbConfig, TaxRateRow};
use meridian_services::{
    AccountingService, AgingKind, CreateAccountInput, CreateInvoiceInput,
    CreatePurchaseInvoiceInput, InventoryService, InvoiceLineInput, InvoicingService,
    LedgerConfig, LocationInput, PaymentInput, ReportingService, TransferInput, UpdateStockInput,
};

/// Minimal chart: (code, name, type, parent code, is_group).
const CHART: &[(&str, &str, AccountType, Option<&str>, bool)] = &[
    ("1000", "Assets", AccountType::Asset, None, true),
    ("1100", "Cash", AccountType::Asset, Some("1000"), false),
    ("1200", "Bank", AccountType::Asset, Some("1000"), false),
    ("1300", "Accounts Receivable", AccountType::Asset, Some("1000"), false),
    ("1400", "Tax Receivable", AccountType::Asset, Some("1000"), false),
    ("2000", "Liabilities", AccountType::Liability, None, true),
    ("2100", "Accounts Payable", AccountType::Liability, Some("2000"), false),
    ("2200", "Tax Payable", AccountType::Liability, Some("2000"), false),
    ("3000", "Equity", AccountType::Equity, None, true),
    ("3100", "Owner's Equity", AccountType::Equity, Some("3000"), false),
    ("4000", "Income", AccountType::Income, None, true),
    ("4100", "Sales", AccountType::Income, Some("4000"), false),
    ("5000", "Expenses", AccountType::Expense, None, true),
    ("5100", "Purchases", AccountType::Expense, Some("5000"), false),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./meridian_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meridian ERP Demo Walkthrough");
                println!();
                println!("Usage: demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./meridian_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .init();

    println!("📒 Meridian ERP Demo Walkthrough");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let config = LedgerConfig::from_env();
    let accounting = AccountingService::new(db.clone());
    let invoicing = InvoicingService::new(db.clone(), config);
    let inventory = InventoryService::new(db.clone());
    let reporting = ReportingService::new(db.clone());

    let existing = db.accounts().list_all().await?;
    if existing.is_empty() {
        bootstrap(&db, &accounting, &inventory).await?;
        run_trading_cycle(&invoicing, &inventory).await?;
    } else {
        println!("⚠ Database already has {} accounts", existing.len());
        println!("  Skipping bootstrap; printing reports only.");
    }

    print_books(&accounting, &inventory, &reporting).await?;

    println!();
    println!("✓ Demo complete!");
    Ok(())
}

// =============================================================================
// Bootstrap
// =============================================================================

/// Seeds the chart, two warehouses, and the standard tax rate.
async fn bootstrap(
    db: &Database,
    accounting: &AccountingService,
    inventory: &InventoryService,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Seeding chart of accounts...");

    let mut ids_by_code: HashMap<&str, String> = HashMap::new();
    for &(code, name, account_type, parent_code, is_group) in CHART {
        let parent_id = parent_code.map(|p| ids_by_code[p].clone());
        let account = accounting
            .create_account(CreateAccountInput {
                code: code.to_string(),
                name: name.to_string(),
                account_type,
                parent_id,
                is_group,
            })
            .await?;
        ids_by_code.insert(code, account.id);
    }
    println!("✓ {} accounts created", CHART.len());

    for (code, name) in [("WH1", "Main Warehouse"), ("WH2", "Overflow Warehouse")] {
        inventory
            .create_location(LocationInput {
                code: code.to_string(),
                name: name.to_string(),
                kind: LocationKind::Warehouse,
                parent_id: None,
            })
            .await?;
    }
    println!("✓ 2 warehouses created");

    db.tax_rates()
        .insert(&TaxRateRow {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Standard 17%".to_string(),
            rate_bps: 1700,
            is_active: true,
            created_at: Utc::now(),
        })
        .await?;
    println!("✓ Standard tax rate registered");

    Ok(())
}

// =============================================================================
// Trading Cycle
// =============================================================================

/// Buy on credit, receive the stock, sell it, collect in two payments,
/// shift part of the stock to the overflow warehouse.
async fn run_trading_cycle(
    invoicing: &InvoicingService,
    inventory: &InventoryService,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Running trading cycle...");

    let today = Utc::now().date_naive();
    let locations = inventory.list_locations().await?;
    let location_id = |code: &str| -> Result<String, Box<dyn std::error::Error>> {
        locations
            .iter()
            .find(|l| l.code == code)
            .map(|l| l.id.clone())
            .ok_or_else(|| format!("warehouse {code} missing").into())
    };
    let wh1 = location_id("WH1")?;
    let wh2 = location_id("WH2")?;

    // 1. Supplier bill: 50 widgets at 8.00 + 17% tax, posted, half paid
    let bill = invoicing
        .create_purchase_invoice(CreatePurchaseInvoiceInput {
            supplier_id: "ACME-SUPPLIES".to_string(),
            invoice_date: today - Duration::days(45),
            due_date: Some(today - Duration::days(15)),
            notes: Some("Initial stock order".to_string()),
            lines: vec![InvoiceLineInput {
                product_id: Some("SKU-WIDGET".to_string()),
                description: "Widget, bulk".to_string(),
                quantity: 50,
                unit_price_cents: 800,
                tax_rate_bps: 1700,
            }],
        })
        .await?;
    invoicing.post_purchase_invoice(&bill.id).await?;
    invoicing
        .register_payment(PaymentInput {
            invoice_id: bill.id.clone(),
            invoice_kind: InvoiceKind::Purchase,
            payment_date: today - Duration::days(10),
            amount_cents: bill.total_cents / 2,
            method: PaymentMethod::BankTransfer,
            reference: Some("TT-10021".to_string()),
        })
        .await?;
    println!("✓ Purchase {} posted, half paid", bill.number);

    // 2. Stock arrives at the main warehouse
    inventory
        .update_stock(UpdateStockInput {
            product_id: "SKU-WIDGET".to_string(),
            location_id: wh1.clone(),
            quantity: 50,
            reason: Some("goods receipt".to_string()),
        })
        .await?;
    println!("✓ 50 widgets received at WH1");

    // 3. Customer invoice: 30 widgets at 15.00 + 17%, collected 60/40
    let invoice = invoicing
        .create_invoice(CreateInvoiceInput {
            customer_id: "NORTHWIND".to_string(),
            invoice_date: today - Duration::days(40),
            due_date: Some(today - Duration::days(10)),
            notes: None,
            lines: vec![InvoiceLineInput {
                product_id: Some("SKU-WIDGET".to_string()),
                description: "Widget, retail".to_string(),
                quantity: 30,
                unit_price_cents: 1500,
                tax_rate_bps: 1700,
            }],
        })
        .await?;
    invoicing.post_invoice(&invoice.id).await?;
    let first = invoice.total_cents * 60 / 100;
    for (amount, offset) in [(first, 20), (invoice.total_cents - first, 5)] {
        invoicing
            .register_payment(PaymentInput {
                invoice_id: invoice.id.clone(),
                invoice_kind: InvoiceKind::Sale,
                payment_date: today - Duration::days(offset),
                amount_cents: amount,
                method: PaymentMethod::BankTransfer,
                reference: None,
            })
            .await?;
    }
    println!("✓ Invoice {} posted and collected in two payments", invoice.number);

    // 4. A second, still-unpaid invoice so the aging has something to show
    let open_invoice = invoicing
        .create_invoice(CreateInvoiceInput {
            customer_id: "CONTOSO".to_string(),
            invoice_date: today - Duration::days(50),
            due_date: Some(today - Duration::days(35)),
            notes: None,
            lines: vec![InvoiceLineInput {
                product_id: Some("SKU-WIDGET".to_string()),
                description: "Widget, retail".to_string(),
                quantity: 10,
                unit_price_cents: 1500,
                tax_rate_bps: 1700,
            }],
        })
        .await?;
    invoicing.post_invoice(&open_invoice.id).await?;
    println!("✓ Invoice {} posted, left outstanding", open_invoice.number);

    // 5. Move 20 widgets to the overflow warehouse
    inventory
        .transfer_now(TransferInput {
            product_id: "SKU-WIDGET".to_string(),
            quantity: 20,
            source_location_id: wh1,
            dest_location_id: wh2,
            movement_date: None,
        })
        .await?;
    println!("✓ 20 widgets moved WH1 → WH2");

    Ok(())
}

// =============================================================================
// Report Printing
// =============================================================================

async fn print_books(
    accounting: &AccountingService,
    inventory: &InventoryService,
    reporting: &ReportingService,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = Utc::now().date_naive();

    println!();
    println!("Chart of Accounts");
    println!("-----------------");
    let chart = accounting.chart_of_accounts().await?;
    for node in &chart {
        print_account_node(node, 0);
    }

    println!();
    println!("Trial Balance");
    println!("-------------");
    let tb = accounting.trial_balance(None).await?;
    for row in &tb.rows {
        println!(
            "  {:<6} {:<24} {:>12} {:>12}",
            row.account_code,
            row.account_name,
            format_cents(row.debit_cents),
            format_cents(row.credit_cents),
        );
    }
    println!(
        "  {:<31} {:>12} {:>12}",
        "TOTAL",
        format_cents(tb.total_debit_cents),
        format_cents(tb.total_credit_cents),
    );
    if tb.is_balanced {
        println!("  ✓ Debits equal credits");
    } else {
        println!("  ⚠ OUT OF BALANCE");
    }

    println!();
    println!("Stock on Hand");
    println!("-------------");
    let stock = inventory.stock_on_hand(None).await?;
    if stock.is_empty() {
        println!("  (no stock)");
    }
    for row in &stock {
        println!("  {:<14} {:<6} {:>6}", row.product_id, row.location_code, row.quantity);
    }

    for kind in [AgingKind::Receivable, AgingKind::Payable] {
        println!();
        println!("{} Aging (as of {})", aging_title(kind), today);
        println!("--------------------------------");
        let report = reporting.aging_report(kind, today).await?;
        if report.rows.is_empty() {
            println!("  (nothing outstanding)");
            continue;
        }
        println!(
            "  {:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "Partner", "Current", "1-30", "31-60", "61-90", "90+", "Total"
        );
        for row in &report.rows {
            println!(
                "  {:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                row.partner_id,
                format_cents(row.buckets.current_cents),
                format_cents(row.buckets.days_1_30_cents),
                format_cents(row.buckets.days_31_60_cents),
                format_cents(row.buckets.days_61_90_cents),
                format_cents(row.buckets.days_over_90_cents),
                format_cents(row.total_cents),
            );
        }
        println!(
            "  {:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "TOTAL",
            format_cents(report.totals.current_cents),
            format_cents(report.totals.days_1_30_cents),
            format_cents(report.totals.days_31_60_cents),
            format_cents(report.totals.days_61_90_cents),
            format_cents(report.totals.days_over_90_cents),
            format_cents(report.grand_total_cents),
        );
    }

    Ok(())
}

fn print_account_node(node: &AccountNode, depth: usize) {
    let indent = "  ".repeat(depth + 1);
    let marker = if node.account.is_group { "▸" } else { " " };
    println!(
        "{}{} {:<6} {:<26} {:>12}",
        indent,
        marker,
        node.account.code,
        node.account.name,
        node.balance.to_string(),
    );
    for child in &node.children {
        print_account_node(child, depth + 1);
    }
}

fn aging_title(kind: AgingKind) -> &'static str {
    match kind {
        AgingKind::Receivable => "Receivables",
        AgingKind::Payable => "Payables",
    }
}

fn format_cents(cents: i64) -> String {
    meridian_core::Money::from_cents(cents).to_string()
}

//! # Validation Module
//!
//! Input validation utilities for the ledger core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service boundary (Rust)                                      │
//! │  ├── THIS MODULE: field and business rule validation                   │
//! │  └── JournalEntryBuilder: the balance gate                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / FOREIGN KEY constraints                       │
//! │  └── CHECK constraints (quantity >= 0, single-sided lines)             │
//! │                                                                         │
//! │  Defense in depth: a bug above still cannot persist bad state          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use meridian_core::validation::{validate_account_code, validate_quantity};
//!
//! validate_account_code("1100").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an account code.
///
/// ## Rules
/// - Must not be empty
/// - Maximum 20 characters
/// - Only alphanumeric characters, hyphens, and dots (codes must sort
///   cleanly and survive being typed)
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_account_code;
///
/// assert!(validate_account_code("1100").is_ok());
/// assert!(validate_account_code("1100.01").is_ok());
/// assert!(validate_account_code("").is_err());
/// ```
pub fn validate_account_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 20,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and dots".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (account, location, document description).
///
/// ## Rules
/// - Must not be empty
/// - Maximum 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement or line quantity.
///
/// ## Rules
/// - Must be positive (> 0); direction never hides in the sign
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates an absolute stock level for an adjustment.
///
/// ## Rules
/// - Must be non-negative (>= 0); zero empties the location
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0); zero is allowed (free of charge lines)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates an optional date range filter.
///
/// ## Rules
/// - When both ends are present, start must not be after end
pub fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(ValidationError::InvalidDateRange {
                reason: format!("start {s} is after end {e}"),
            });
        }
    }

    Ok(())
}

/// Validates an invoice date pair.
///
/// ## Rules
/// - Due date must not precede the invoice date
pub fn validate_due_date(invoice_date: NaiveDate, due_date: NaiveDate) -> ValidationResult<()> {
    if due_date < invoice_date {
        return Err(ValidationError::InvalidDateRange {
            reason: format!("due date {due_date} precedes invoice date {invoice_date}"),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

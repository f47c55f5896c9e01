//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                       │
//! │  ├── CoreError        - Domain errors (taxonomy root)                   │
//! │  ├── ValidationError  - Input rejected before any write                 │
//! │  └── StateError       - Invalid lifecycle transition                    │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  meridian-services errors (separate crate)                              │
//! │  └── ServiceError     - What callers see (coded envelope)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ServiceError → Caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, id, amounts)
//! 3. Errors are enum variants, never String
//! 4. A mutating operation that returns an error wrote nothing

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// The four categories every caller can rely on: validation failures,
/// lifecycle violations, insufficient stock, and missing references.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input rejected before any write (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid lifecycle transition (wraps StateError).
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A transfer would drive quantity-on-hand below zero.
    ///
    /// ## When This Occurs
    /// - Confirming a movement for more than the source location holds
    /// - The product has no quant row at the source (available = 0)
    #[error(
        "Insufficient stock of product {product_id} at location {location_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        location_id: String,
        available: i64,
        requested: i64,
    },

    /// A referenced entity does not exist.
    ///
    /// ## When This Occurs
    /// - Journal line posted against an unknown account id
    /// - Payment registered against an unknown invoice id
    /// - Transfer between locations that were never created
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl CoreError {
    /// Shorthand for the NotFound variant.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for the InsufficientStock variant.
    pub fn insufficient_stock(
        product_id: impl Into<String>,
        location_id: impl Into<String>,
        available: i64,
        requested: i64,
    ) -> Self {
        CoreError::InsufficientStock {
            product_id: product_id.into(),
            location_id: location_id.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input does not meet requirements. Raised before
/// business logic runs and always before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed account code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate account code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Journal entry debits and credits do not match.
    ///
    /// The single most important check in the system. An entry that fails
    /// it never reaches the database.
    #[error("journal entry is unbalanced: debits {debits} != credits {credits}")]
    UnbalancedEntry { debits: i64, credits: i64 },

    /// Journal entry needs at least two lines.
    #[error("journal entry requires at least 2 lines, got {count}")]
    TooFewLines { count: usize },

    /// A journal line must carry exactly one of debit/credit, positive.
    #[error("journal line {line_no} must have exactly one positive side (debit or credit)")]
    InvalidLineSides { line_no: usize },

    /// Transfer source and destination must differ.
    #[error("source and destination location must differ: {location_id}")]
    SameLocation { location_id: String },

    /// Payment exceeds what is still owed on the invoice.
    #[error("payment {amount} exceeds outstanding balance {outstanding}")]
    Overpayment { amount: i64, outstanding: i64 },

    /// A group account cannot take journal postings.
    #[error("account {code} is a group and cannot be posted to")]
    GroupAccountPosting { code: String },

    /// A leaf account cannot have children.
    #[error("account {code} is not a group and cannot have children")]
    LeafParent { code: String },

    /// Start date after end date and similar.
    #[error("invalid date range: {reason}")]
    InvalidDateRange { reason: String },
}

// =============================================================================
// State Error
// =============================================================================

/// Lifecycle transition errors.
///
/// Raised when an operation is requested on a document whose status does
/// not permit it. The document is left untouched.
#[derive(Debug, Error)]
pub enum StateError {
    /// Posting is only valid from draft.
    #[error("{entity} {id} is {status}, only draft documents can be posted")]
    NotDraft {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// Payments only apply to posted or partially paid invoices.
    #[error("invoice {id} is {status}, payments require posted or partially_paid")]
    NotPayable { id: String, status: String },

    /// Cancellation rejected for the current status.
    #[error("{entity} {id} is {status} and cannot be cancelled: {reason}")]
    NotCancellable {
        entity: &'static str,
        id: String,
        status: String,
        reason: &'static str,
    },

    /// Confirming a movement is only valid from draft.
    #[error("stock movement {id} is {status}, only draft movements can be confirmed")]
    MovementNotDraft { id: String, status: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::insufficient_stock("prod-1", "loc-a", 5, 10);
        assert_eq!(
            err.to_string(),
            "Insufficient stock of product prod-1 at location loc-a: available 5, requested 10"
        );

        let err = CoreError::not_found("Account", "acc-9");
        assert_eq!(err.to_string(), "Account not found: acc-9");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::UnbalancedEntry {
            debits: 10000,
            credits: 9900,
        };
        assert_eq!(
            err.to_string(),
            "journal entry is unbalanced: debits 10000 != credits 9900"
        );

        let err = ValidationError::TooFewLines { count: 1 };
        assert_eq!(err.to_string(), "journal entry requires at least 2 lines, got 1");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_state_converts_to_core_error() {
        let state_err = StateError::NotPayable {
            id: "inv-1".to_string(),
            status: "draft".to_string(),
        };
        let core_err: CoreError = state_err.into();
        assert!(matches!(core_err, CoreError::State(_)));
    }
}

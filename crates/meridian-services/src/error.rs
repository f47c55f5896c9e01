//! # Service Error Type
//!
//! The coded error envelope callers of the service boundary receive.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error Flow in Meridian                             │
//! │                                                                         │
//! │  Caller                         Service Boundary                        │
//! │  ──────                         ────────────────                        │
//! │                                                                         │
//! │  post_invoice(id)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Service operation                                               │  │
//! │  │  Result<T, ServiceError>                                         │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Domain rule?   ── CoreError (validation/state/stock) ──┐       │  │
//! │  │         │                                               │       │  │
//! │  │         ▼                                               ▼       │  │
//! │  │  Persistence?   ── DbError ─────────────────────► ServiceError ─►  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────► │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Caller matches on the stable `code`; the `message` is for humans.      │
//! │  Infrastructure detail (SQL text, pool state) is logged, never leaked.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use meridian_core::CoreError;
use meridian_db::DbError;

/// Error returned from every service operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock of product widget at location WH1: available 5, requested 10"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Stable error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced account/invoice/location/entry does not exist
    NotFound,

    /// Input rejected before any write
    ValidationError,

    /// Invalid lifecycle transition (post non-draft, pay draft, ...)
    StateError,

    /// Transfer would drive quantity on hand below zero
    InsufficientStock,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }
}

/// Converts domain errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ServiceError::validation(e.to_string()),
            CoreError::State(e) => ServiceError::new(ErrorCode::StateError, e.to_string()),
            CoreError::InsufficientStock { .. } => {
                ServiceError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::NotFound { entity, id } => ServiceError::not_found(entity, &id),
        }
    }
}

/// Converts validation errors raised at the boundary to service errors.
impl From<meridian_core::ValidationError> for ServiceError {
    fn from(err: meridian_core::ValidationError) -> Self {
        ServiceError::validation(err.to_string())
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field } => {
                ServiceError::validation(format!("Duplicate {}: already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ServiceError::new(ErrorCode::DatabaseError, "Database constraint violated")
            }
            DbError::ConnectionFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ServiceError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

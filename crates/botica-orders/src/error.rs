//! # Service Error Type
//!
//! Unified error type for lifecycle operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Botica ERP                             │
//! │                                                                         │
//! │  Caller                      Service Layer                              │
//! │  ──────                      ─────────────                              │
//! │                                                                         │
//! │  create_order(request)                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  OrderService method                                             │  │
//! │  │  Result<T, ServiceError>                                         │  │
//! │  │         │                                                        │  │
//! │  │  DbError? ──── UNIQUE/FK details kept, internals genericized ──┐ │  │
//! │  │  CoreError? ── stock/status/validation context preserved ──────┼─► │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { code: "INSUFFICIENT_STOCK",                                          │
//! │    message: "Insufficient stock for Ibuprofeno 600: available 2, ..." } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence internals are never leaked: query failures are logged here
//! and surface as a generic database error.

use serde::Serialize;

use botica_core::CoreError;
use botica_db::DbError;

/// Service error returned from lifecycle operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Order not found: o-123"
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

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (client, product, order, invoice)
    NotFound,

    /// Input validation failed; nothing was mutated
    ValidationError,

    /// A line item could not be reserved; the whole order was rolled back
    InsufficientStock,

    /// A business rule rejected the operation (e.g. deleting a
    /// non-pending order)
    BusinessRule,

    /// Database operation failed; details are in the logs
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
        ServiceError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
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

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ServiceError::new(
                ErrorCode::ValidationError,
                format!("{field} '{value}' already exists"),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violated: {}", message);
                ServiceError::new(ErrorCode::BusinessRule, "Operation violates a data constraint")
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
            DbError::Decode { column, message } => {
                tracing::error!("Stored value decode failed for {}: {}", column, message);
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

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ClientNotFound(id) => ServiceError::not_found("Client", &id),
            CoreError::ProductNotFound(id) => ServiceError::not_found("Product", &id),
            CoreError::OrderNotFound(id) => ServiceError::not_found("Order", &id),
            CoreError::InsufficientStock {
                product,
                available,
                requested,
            } => ServiceError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for {product}: available {available}, requested {requested}"
                ),
            ),
            CoreError::OrderNotPending { order_id, status } => ServiceError::new(
                ErrorCode::BusinessRule,
                format!("Order {order_id} is {status}, only pending orders can be deleted"),
            ),
            CoreError::EmptyOrder => {
                ServiceError::validation("Order must contain at least one line item")
            }
            CoreError::Validation(e) => ServiceError::validation(e.to_string()),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_keeps_context() {
        let err: ServiceError = CoreError::InsufficientStock {
            product: "Ibuprofeno 600mg".to_string(),
            available: 2,
            requested: 5,
        }
        .into();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("Ibuprofeno 600mg"));
        assert!(err.message.contains("available 2"));
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: ServiceError = DbError::not_found("Order", "o-1").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Order not found: o-1");
    }

    #[test]
    fn test_query_failure_is_genericized() {
        let err: ServiceError = DbError::QueryFailed("syntax error near SELEC".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEC"));
    }

    #[test]
    fn test_serializes_with_screaming_code() {
        let err = ServiceError::not_found("Client", "c-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
    }
}

//! # Error Types
//!
//! Domain-specific error types for botica-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  botica-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  botica-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  botica-orders errors (separate crate)                                 │
//! │  └── ServiceError     - What request handlers see                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, name, available stock)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Client cannot be found.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product id doesn't exist in the catalog
    /// - Product was deactivated (soft delete)
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Insufficient stock to reserve a line item.
    ///
    /// Aborting the WHOLE order on any single short line is deliberate:
    /// partial deliveries are handled commercially, never by silently
    /// shrinking an order.
    ///
    /// ## User Workflow
    /// ```text
    /// Order line (qty: 5)
    ///      │
    ///      ▼
    /// Conditional decrement fails: stock=2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Ibuprofeno 600", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// Whole order rolled back; caller sees which product and how many remain
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The order is not in a status that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Deleting an order that is no longer pending
    #[error("Order {order_id} is {status}, only pending orders allow this operation")]
    OrderNotPending { order_id: String, status: String },

    /// An order must contain at least one line item.
    #[error("Order must contain at least one line item")]
    EmptyOrder,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
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

    /// Invalid format (e.g., invalid UUID, malformed decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set (e.g., VAT rate outside {4, 10, 21}).
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate client or product code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
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
        let err = CoreError::InsufficientStock {
            product: "Ibuprofeno 600mg".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Ibuprofeno 600mg: available 2, requested 5"
        );
    }

    #[test]
    fn test_not_pending_message_names_status() {
        let err = CoreError::OrderNotPending {
            order_id: "P-20260315-001".to_string(),
            status: "delivered".to_string(),
        };
        assert!(err.to_string().contains("delivered"));
        assert!(err.to_string().contains("P-20260315-001"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

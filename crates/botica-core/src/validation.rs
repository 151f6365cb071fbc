//! # Validation Module
//!
//! Input validation for catalog and order data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service entry (botica-orders)                                │
//! │  └── THIS MODULE: field and business rule validation                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: both layers catch different errors                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a business code (client or product).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 20 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Returns
/// The trimmed, uppercased code — codes are stored normalized so lookups
/// never depend on caller casing.
///
/// ## Example
/// ```rust
/// use botica_core::validation::validate_code;
///
/// assert_eq!(validate_code("farm-017").unwrap(), "FARM-017");
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<String> {
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
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_uppercase())
}

/// Validates a display name (client or product).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 100 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a product price.
///
/// ## Rules
/// - Must be non-negative (zero is allowed: samples, promotional items)
pub fn validate_price(price: Decimal) -> ValidationResult<()> {
    if price < Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a VAT rate against the three catalog regimes.
///
/// ## Rules
/// - Must be exactly 4, 10 or 21 (percent)
///
/// The totals calculator tolerates other rates on historical data, but new
/// catalog entries are constrained to the regimes the surcharge table knows.
pub fn validate_tax_rate(rate: Decimal) -> ValidationResult<()> {
    let allowed = [Decimal::from(4), Decimal::from(10), Decimal::from(21)];

    if !allowed.contains(&rate) {
        return Err(ValidationError::NotAllowed {
            field: "tax_rate".to_string(),
            allowed: allowed.iter().map(|r| format!("{r}%")).collect(),
        });
    }

    Ok(())
}

/// Validates an explicit equivalence-surcharge rate.
///
/// ## Rules
/// - When present, must be one of 0, 0.5, 1.4 or 5.2 (percent)
pub fn validate_surcharge_rate(rate: Decimal) -> ValidationResult<()> {
    let allowed = [
        Decimal::ZERO,
        Decimal::new(5, 1),  // 0.5
        Decimal::new(14, 1), // 1.4
        Decimal::new(52, 1), // 5.2
    ];

    if !allowed.contains(&rate) {
        return Err(ValidationError::NotAllowed {
            field: "surcharge_rate".to_string(),
            allowed: allowed.iter().map(|r| format!("{r}%")).collect(),
        });
    }

    Ok(())
}

/// Validates a stock quantity or threshold.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
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
/// use botica_core::validation::validate_uuid;
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code("FARM-017").unwrap(), "FARM-017");
        assert_eq!(validate_code("par-1g").unwrap(), "PAR-1G");
        assert_eq!(validate_code("  abc_1  ").unwrap(), "ABC_1");

        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"A".repeat(30)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Paracetamol 1g 40 comprimidos").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(150)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9_999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10_000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(dec!(0)).is_ok());
        assert!(validate_price(dec!(3.20)).is_ok());
        assert!(validate_price(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_validate_tax_rate_allows_only_catalog_regimes() {
        assert!(validate_tax_rate(dec!(4)).is_ok());
        assert!(validate_tax_rate(dec!(10)).is_ok());
        assert!(validate_tax_rate(dec!(21)).is_ok());
        // Numerically equal scales pass too
        assert!(validate_tax_rate(dec!(21.0)).is_ok());

        assert!(validate_tax_rate(dec!(0)).is_err());
        assert!(validate_tax_rate(dec!(7)).is_err());
        assert!(validate_tax_rate(dec!(21.5)).is_err());
    }

    #[test]
    fn test_validate_surcharge_rate() {
        assert!(validate_surcharge_rate(dec!(0)).is_ok());
        assert!(validate_surcharge_rate(dec!(0.5)).is_ok());
        assert!(validate_surcharge_rate(dec!(1.4)).is_ok());
        assert!(validate_surcharge_rate(dec!(5.2)).is_ok());

        assert!(validate_surcharge_rate(dec!(1.0)).is_err());
        assert!(validate_surcharge_rate(dec!(-0.5)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}

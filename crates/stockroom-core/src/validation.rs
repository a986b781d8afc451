//! # Validation Module
//!
//! Input validation for products, movements, sales and payments.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── Field lengths, formats, positive amounts                          │
//! │  └── Runs before any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger rules (ledger.rs, sale.rs)                            │
//! │  ├── Stock sufficiency                                                 │
//! │  └── Sale status transitions                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (current_stock >= 0), CHECK (quantity > 0)                  │
//! │  ├── UNIQUE (sku), UNIQUE (invoice_number)                             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lengths are counted in characters, not bytes.
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{validate_sku, validate_price_cents};
//!
//! validate_sku("BRG-001").unwrap();
//! validate_price_cents("base price", 1500).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MovementMeta, NewPayment, NewProduct, NewSale, ProductUpdate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Limits
// =============================================================================

pub const SKU_MIN: usize = 3;
pub const SKU_MAX: usize = 50;
pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;
pub const CATEGORY_MAX: usize = 100;
pub const UNIT_MAX: usize = 20;
pub const REFERENCE_MAX: usize = 100;
pub const NOTES_MAX: usize = 500;
pub const CUSTOMER_NAME_MAX: usize = 200;
pub const PHONE_MAX: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - 3 to 50 characters after trimming
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_sku;
///
/// assert!(validate_sku("BRG-001").is_ok());
/// assert!(validate_sku("AB").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    validate_length("sku", sku, SKU_MIN, SKU_MAX)?;

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: 2 to 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    validate_length("name", name, NAME_MIN, NAME_MAX)
}

/// Validates a display unit: 1 to 20 characters.
pub fn validate_unit(unit: &str) -> ValidationResult<()> {
    let unit = unit.trim();

    if unit.is_empty() {
        return Err(ValidationError::Required {
            field: "unit".to_string(),
        });
    }

    validate_length("unit", unit, 1, UNIT_MAX)
}

/// Validates an optional free-text field against a maximum length.
///
/// ```rust
/// use stockroom_core::validation::validate_optional_text;
///
/// assert!(validate_optional_text("notes", None, 500).is_ok());
/// assert!(validate_optional_text("notes", Some("ok"), 500).is_ok());
/// assert!(validate_optional_text("phone", Some(&"9".repeat(21)), 20).is_err());
/// ```
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

fn validate_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.chars().count();

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents. Prices must be positive.
///
/// ```rust
/// use stockroom_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("selling price", 1099).is_ok());
/// assert!(validate_price_cents("selling price", 0).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a stock count that may be zero (min stock, opening stock).
pub fn validate_stock_level(field: &str, level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a movement or line quantity.
pub fn validate_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }

    Ok(())
}

// =============================================================================
// Input Validators
// =============================================================================

/// Validates a product about to be created.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_sku(&input.sku)?;
    validate_product_name(&input.name)?;
    validate_optional_text("description", input.description.as_deref(), DESCRIPTION_MAX)?;
    validate_optional_text("category", input.category.as_deref(), CATEGORY_MAX)?;
    validate_unit(&input.unit)?;
    validate_price_cents("base price", input.base_price_cents)?;
    validate_price_cents("selling price", input.selling_price_cents)?;
    validate_stock_level("min stock", input.min_stock)?;
    validate_stock_level("opening stock", input.opening_stock)?;
    Ok(())
}

/// Validates a product edit.
pub fn validate_product_update(input: &ProductUpdate) -> ValidationResult<()> {
    validate_sku(&input.sku)?;
    validate_product_name(&input.name)?;
    validate_optional_text("description", input.description.as_deref(), DESCRIPTION_MAX)?;
    validate_optional_text("category", input.category.as_deref(), CATEGORY_MAX)?;
    validate_unit(&input.unit)?;
    validate_price_cents("base price", input.base_price_cents)?;
    validate_price_cents("selling price", input.selling_price_cents)?;
    validate_stock_level("min stock", input.min_stock)?;
    Ok(())
}

/// Validates the optional details of a stock movement.
pub fn validate_movement_meta(meta: &MovementMeta) -> ValidationResult<()> {
    validate_optional_text("reference", meta.reference.as_deref(), REFERENCE_MAX)?;
    validate_optional_text("notes", meta.notes.as_deref(), NOTES_MAX)?;
    if let Some(price) = meta.unit_price_cents {
        validate_price_cents("unit price", price)?;
    }
    Ok(())
}

/// Validates a new sale's fields and lines. Stock is checked separately.
pub fn validate_new_sale(input: &NewSale) -> CoreResult<()> {
    if input.items.is_empty() {
        return Err(CoreError::EmptySale);
    }

    validate_optional_text("customer name", input.customer_name.as_deref(), CUSTOMER_NAME_MAX)?;
    validate_optional_text("customer phone", input.customer_phone.as_deref(), PHONE_MAX)?;
    validate_optional_text("notes", input.notes.as_deref(), NOTES_MAX)?;

    for item in &input.items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product".to_string(),
            }
            .into());
        }
        validate_quantity(item.quantity)?;
        validate_price_cents("unit price", item.unit_price_cents)?;
    }

    Ok(())
}

/// Validates a payment before it is applied.
pub fn validate_new_payment(input: &NewPayment) -> CoreResult<()> {
    if input.amount_cents <= 0 {
        return Err(CoreError::invalid_amount(format!(
            "payment amount must be positive, got {}",
            input.amount_cents
        )));
    }

    validate_optional_text("notes", input.notes.as_deref(), NOTES_MAX)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleLine;

    fn new_product() -> NewProduct {
        NewProduct {
            sku: "BRG-001".to_string(),
            name: "Beras 5kg".to_string(),
            unit: "sak".to_string(),
            base_price_cents: 6_000_000,
            selling_price_cents: 7_000_000,
            min_stock: 5,
            opening_stock: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("BRG-001").is_ok());
        assert!(validate_sku("abc_12").is_ok());

        assert!(matches!(validate_sku(""), Err(ValidationError::Required { .. })));
        assert!(matches!(validate_sku("AB"), Err(ValidationError::TooShort { min: 3, .. })));
        assert!(matches!(
            validate_sku(&"A".repeat(51)),
            Err(ValidationError::TooLong { max: 50, .. })
        ));
        assert!(matches!(
            validate_sku("BRG 001"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Gula").is_ok());
        assert!(validate_product_name("G").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        assert!(validate_new_product(&new_product()).is_ok());

        let mut input = new_product();
        input.selling_price_cents = 0;
        assert!(matches!(
            validate_new_product(&input),
            Err(ValidationError::MustBePositive { .. })
        ));

        let mut input = new_product();
        input.opening_stock = -1;
        assert!(matches!(
            validate_new_product(&input),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut input = new_product();
        input.category = Some("c".repeat(101));
        assert!(validate_new_product(&input).is_err());
    }

    #[test]
    fn test_validate_movement_meta() {
        assert!(validate_movement_meta(&MovementMeta::default()).is_ok());
        assert!(validate_movement_meta(&MovementMeta::referenced("PO-1", "restock")).is_ok());

        let meta = MovementMeta {
            reference: Some("R".repeat(101)),
            ..Default::default()
        };
        assert!(validate_movement_meta(&meta).is_err());
    }

    #[test]
    fn test_validate_new_sale() {
        assert!(matches!(
            validate_new_sale(&NewSale::default()),
            Err(CoreError::EmptySale)
        ));

        let sale = NewSale {
            items: vec![SaleLine {
                product_id: "p-1".to_string(),
                quantity: 0,
                unit_price_cents: 1000,
            }],
            ..Default::default()
        };
        assert!(matches!(
            validate_new_sale(&sale),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));

        let sale = NewSale {
            customer_phone: Some("0".repeat(21)),
            items: vec![SaleLine {
                product_id: "p-1".to_string(),
                quantity: 1,
                unit_price_cents: 1000,
            }],
            ..Default::default()
        };
        assert!(matches!(validate_new_sale(&sale), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_validate_new_payment() {
        assert!(validate_new_payment(&NewPayment::of(500)).is_ok());
        assert!(matches!(
            validate_new_payment(&NewPayment::of(0)),
            Err(CoreError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_optional_text_counts_stored_length() {
        let padded = format!("  {}  ", "n".repeat(NOTES_MAX - 4));
        assert!(validate_optional_text("notes", Some(&padded), NOTES_MAX).is_ok());

        let padded = format!("  {}  ", "n".repeat(NOTES_MAX));
        assert!(matches!(
            validate_optional_text("notes", Some(&padded), NOTES_MAX),
            Err(ValidationError::TooLong { max: NOTES_MAX, .. })
        ));
    }
}

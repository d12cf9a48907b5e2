//! # Validation Module
//!
//! Input validation utilities for Kaikei.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (hall terminal / admin UI)                            │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: Business rule validation                        │
//! │  ├── Quantities, prices, table numbers                                 │
//! │  └── Time strings go through hours::parse_clock_time instead           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use kaikei_core::validation::{validate_menu_item_name, validate_quantity};
//!
//! // Validate before database insert
//! validate_menu_item_name("唐揚げ").unwrap();
//!
//! // Validate before adding an order line
//! validate_quantity(2).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a store name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 100 characters
pub fn validate_store_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "store name".to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "store name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a menu item name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use kaikei_core::validation::validate_menu_item_name;
///
/// assert!(validate_menu_item_name("生ビール").is_ok());
/// assert!(validate_menu_item_name("").is_err());
/// ```
pub fn validate_menu_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "item name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "item name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an IANA timezone name ("Asia/Tokyo").
pub fn validate_timezone(tz: &str) -> ValidationResult<()> {
    if tz.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "timezone".to_string(),
        });
    }

    tz.parse::<chrono_tz::Tz>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "timezone".to_string(),
            reason: "must be an IANA timezone name".to_string(),
        })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a hall table number.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed 9999 (printed on physical table tents)
pub fn validate_table_number(number: i64) -> ValidationResult<()> {
    if number <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "table number".to_string(),
        });
    }

    if number > 9999 {
        return Err(ValidationError::OutOfRange {
            field: "table number".to_string(),
            min: 1,
            max: 9999,
        });
    }

    Ok(())
}

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Hall terminal: Add line to order                                       │
/// │                                                                         │
/// │  Staff enters quantity: 2                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → Proceed with add_item                                   │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a menu price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (service items, otoshi waivers)
///
/// ## Example
/// ```rust
/// use kaikei_core::money::Money;
/// use kaikei_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_yen(480)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_yen(-100)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an optional day-of-week override (0 = Sunday .. 6 = Saturday).
pub fn validate_day_of_week(day: Option<i64>) -> ValidationResult<()> {
    if let Some(day) = day {
        if !(0..=6).contains(&day) {
            return Err(ValidationError::OutOfRange {
                field: "day_of_week".to_string(),
                min: 0,
                max: 6,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_store_name() {
        assert!(validate_store_name("居酒屋 灯り").is_ok());
        assert!(validate_store_name("").is_err());
        assert!(validate_store_name("   ").is_err());
        assert!(validate_store_name(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_menu_item_name() {
        assert!(validate_menu_item_name("生ビール").is_ok());
        assert!(validate_menu_item_name("Edamame").is_ok());
        assert!(validate_menu_item_name("").is_err());
        assert!(validate_menu_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("Asia/Tokyo").is_ok());
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("").is_err());
        assert!(validate_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn test_validate_table_number() {
        assert!(validate_table_number(1).is_ok());
        assert!(validate_table_number(42).is_ok());
        assert!(validate_table_number(0).is_err());
        assert!(validate_table_number(-5).is_err());
        assert!(validate_table_number(10000).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::from_yen(480)).is_ok());
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_yen(-1)).is_err());
    }

    #[test]
    fn test_validate_day_of_week() {
        assert!(validate_day_of_week(None).is_ok());
        assert!(validate_day_of_week(Some(0)).is_ok());
        assert!(validate_day_of_week(Some(6)).is_ok());
        assert!(validate_day_of_week(Some(7)).is_err());
        assert!(validate_day_of_week(Some(-1)).is_err());
    }

}

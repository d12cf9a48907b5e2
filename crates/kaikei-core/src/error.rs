//! # Error Types
//!
//! Domain-specific error types for kaikei-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kaikei-core errors (this file)                                        │
//! │  ├── CoreError        - Calendar / pricing domain errors               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kaikei-db errors (separate crate)                                     │
//! │  └── DbError          - Persistence + checkout transaction failures    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → API collaborator        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (store id, raw input, etc.)
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
    /// A business-hours time string could not be parsed.
    ///
    /// ## When This Occurs
    /// - Input is not `HH:MM` (e.g. "5pm", "17", "17:00:00")
    /// - Minute component is outside 00-59
    /// - Hour component is outside 00-29 (24-29 denote a next-day close)
    /// - An opening time uses the overflow form (only closes may)
    #[error("Invalid time format '{input}': {reason}")]
    InvalidTimeFormat { input: String, reason: String },

    /// A menu item referenced by an order line no longer exists.
    ///
    /// ## When This Occurs
    /// - Checkout repricing hits an order line whose catalog item was
    ///   hard-deleted despite still being referenced
    ///
    /// Pricing a missing item at zero would silently corrupt totals, so the
    /// whole operation fails instead.
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    /// An IANA timezone name could not be resolved.
    ///
    /// ## When This Occurs
    /// - A store row carries a timezone string the tz database doesn't know
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Line quantity exceeds the allowed range.
    #[error("Quantity {requested} is outside the allowed range (1-{max})")]
    QuantityOutOfRange { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
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

    /// Invalid format (e.g., invalid date, invalid time).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

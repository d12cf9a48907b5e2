//! # kaikei-core: Pure Business Logic for Kaikei
//!
//! This crate is the **heart** of Kaikei, the business-day accounting engine
//! for restaurants whose hours cross midnight. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kaikei Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Hall Terminals / Admin UI                      │   │
//! │  │    Order entry ──► Checkout request ──► Daily close screen     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kaikei-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   hours   │  │ calendar  │  │  pricing  │  │   money   │  │   │
//! │  │   │ "26:00" ⇄ │  │ Clock +   │  │ base + Σ  │  │  integer  │  │   │
//! │  │   │ 02:00+flag│  │ biz dates │  │ modifiers │  │    yen    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kaikei-db (Database Layer)                   │   │
//! │  │      SQLite repositories, checkout archival, daily sales        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Store, DiningTable, Order, SalesCycle, etc.)
//! - [`money`] - Money type with integer yen arithmetic (no floating point!)
//! - [`hours`] - Overflow-hour parsing ("26:00" ⇄ 02:00 + crosses_midnight)
//! - [`calendar`] - Clock capability and instant → business-date mapping
//! - [`pricing`] - Checkout-time line repricing
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system, and the wall clock are FORBIDDEN here
//! 3. **Integer Money**: All monetary values are whole yen (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use kaikei_core::hours::BusinessHours;
//! use chrono::NaiveDate;
//! use chrono_tz::Asia::Tokyo;
//!
//! // "26:00" is staff notation for 02:00 the next morning.
//! let hours = BusinessHours::from_strings("17:00", "26:00", Tokyo).unwrap();
//! assert!(hours.crosses_midnight);
//!
//! // A 00:20 JST checkout on Jun 13 still belongs to business Jun 12.
//! let instant = "2025-06-12T15:20:00Z".parse().unwrap();
//! assert_eq!(
//!     hours.accounting_date(instant),
//!     NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod error;
pub mod hours;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kaikei_core::Money` instead of
// `use kaikei_core::money::Money`

pub use calendar::{civil_date, civil_day_period, Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use hours::{format_overflow_time, parse_clock_time, BusinessHours};
pub use money::Money;
pub use pricing::{resolve_line, CycleTotals, LinePricing, MAX_LINE_QUANTITY};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Timezone assigned to stores that never configured one.
///
/// ## Why a constant?
/// The product launched for izakaya operators in Japan; stores created before
/// the timezone field existed all meant JST. New stores set their own.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Default consumption-tax rate in basis points (10%).
///
/// ## Business Reason
/// Standard Japanese consumption tax. Reduced-rate (8%) lines are a menu
/// attribute, not a store attribute, and ride in per-call aggregator config.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

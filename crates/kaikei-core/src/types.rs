//! # Domain Types
//!
//! Core domain types used throughout the kaikei engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  LIVE (mutable until checkout)        ARCHIVE (immutable history)       │
//! │  ┌──────────────────┐                 ┌───────────────────────┐         │
//! │  │ Order            │   checkout      │ ArchivedOrder         │         │
//! │  │ └ OrderItem      │  ───────────►   │ └ ArchivedOrderItem   │         │
//! │  │   ├ ...Option    │   (one tx)      │   ├ ...Option         │         │
//! │  │   └ ...Topping   │                 │   └ ...Topping        │         │
//! │  └──────────────────┘                 └───────────────────────┘         │
//! │           │                                      │                      │
//! │           ▼                                      ▼                      │
//! │  ┌──────────────────┐                 ┌───────────────────────┐         │
//! │  │ DiningTable      │                 │ SalesCycle            │         │
//! │  │ checkout flag    │                 │ one visit, completed  │         │
//! │  └──────────────────┘                 │ exactly once          │         │
//! │                                       └───────────────────────┘         │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                       ┌───────────────────────┐         │
//! │                                       │ DailySales            │         │
//! │                                       │ one row per           │         │
//! │                                       │ (store, business day) │         │
//! │                                       └───────────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (store, table_number), (store, business_date)

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::hours::{format_overflow_time, parse_clock_time, BusinessHours};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (Japanese standard consumption tax)
/// 800 bps = 8% (reduced rate for takeout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    /// Japanese standard consumption tax, 10%.
    fn default() -> Self {
        TaxRate(1000)
    }
}

// =============================================================================
// Store
// =============================================================================

/// A store (tenant) owning tables, menu, and sales history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Store {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// IANA timezone name, e.g. "Asia/Tokyo".
    /// Every accounting-day boundary for this store is computed in this zone.
    pub timezone: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Resolves the configured timezone name against the tz database.
    pub fn tz(&self) -> CoreResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| CoreError::UnknownTimezone(self.timezone.clone()))
    }
}

// =============================================================================
// Store Hours (persisted form)
// =============================================================================

/// A store's persisted operating schedule.
///
/// One row with `day_of_week = None` is the default for every day; rows with
/// a weekday (0 = Sunday .. 6 = Saturday) override it. Times are stored
/// normalized - the staff notation "26:00" lives only at the display edge.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoreHours {
    pub id: String,
    pub store_id: String,
    /// 0 = Sunday .. 6 = Saturday; None applies wherever no override exists.
    pub day_of_week: Option<i64>,
    /// Normalized opening time, "HH:MM".
    pub open_time: String,
    /// Normalized closing time, "HH:MM" (02:00, never 26:00).
    pub close_time: String,
    pub crosses_midnight: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StoreHours {
    /// Rehydrates calendar-ready hours in the store's timezone.
    pub fn to_business_hours(&self, tz: Tz) -> CoreResult<BusinessHours> {
        let (open, _) = parse_clock_time(&self.open_time)?;
        let (close, _) = parse_clock_time(&self.close_time)?;
        Ok(BusinessHours::new(open, close, self.crosses_midnight, tz))
    }

    /// Closing time in staff notation ("26:00" when past midnight).
    pub fn close_display(&self) -> CoreResult<String> {
        let (close, _) = parse_clock_time(&self.close_time)?;
        Ok(format_overflow_time(close, self.crosses_midnight))
    }
}

// =============================================================================
// Menu Item
// =============================================================================

/// A catalog item - the price source for the pricing resolver.
///
/// Only `price` matters to this engine; richer catalog data (categories,
/// images, option groups) lives with the catalog CRUD collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MenuItem {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Current base price in yen, tax included.
    pub price: Money,
    pub is_available: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Dining Table
// =============================================================================

/// A physical table in a store.
///
/// `checkout_requested` is raised by the customer-facing trigger and cleared
/// by the checkout archiver in the same transaction that archives the
/// table's orders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiningTable {
    pub id: String,
    pub store_id: String,
    /// Business identifier, unique per store.
    pub table_number: i64,
    pub capacity: i64,
    /// Floor area label ("counter", "tatami", ...), if the store uses one.
    pub area: Option<String>,
    pub checkout_requested: bool,
    #[ts(as = "Option<String>")]
    pub checkout_requested_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The kitchen status of a live order.
///
/// Every live order is "open" from this engine's point of view regardless of
/// status; archival (not status) is what closes an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet picked up by the kitchen.
    Pending,
    /// Being prepared.
    Preparing,
    /// Brought to the table. May count toward daily sales before archival.
    Delivered,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Live Order Graph
// =============================================================================

/// A live order for a table. Mutable until archived at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub store_id: String,
    pub table_id: String,
    pub status: OrderStatus,
    /// Running sum of the frozen line snapshots, for hall display. Checkout
    /// reprices from the current menu, so the archived total may differ.
    pub total_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line item on a live order.
/// Uses snapshot pattern: name and prices are frozen at creation so a later
/// menu edit never rewrites a placed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    /// Item name at order time (frozen).
    pub item_name: String,
    pub quantity: i64,
    /// Unit price at order time: base + options + toppings (frozen).
    pub unit_price: Money,
    /// unit_price × quantity (frozen).
    pub total_price: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A selected option on an order line (e.g. "large serving").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItemOption {
    pub id: String,
    pub order_item_id: String,
    pub name: String,
    pub price: Money,
}

/// An added topping on an order line (e.g. "extra cheese").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItemTopping {
    pub id: String,
    pub order_item_id: String,
    pub name: String,
    pub price: Money,
}

// =============================================================================
// Sales Cycle
// =============================================================================

/// Lifecycle status of a sales cycle (one party's visit to a table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Visit in progress.
    Active,
    /// Checked out and archived. Terminal - a cycle is never resurrected.
    Completed,
    /// Voided by an administrator. Terminal.
    Cancelled,
}

impl Default for CycleStatus {
    fn default() -> Self {
        CycleStatus::Active
    }
}

/// One customer visit to a table, from first order to checkout.
///
/// `cycle_number` restarts at 1 each business day per table: the third party
/// seated at table 5 tonight is cycle 3 even if the clock has passed
/// midnight.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesCycle {
    pub id: String,
    pub store_id: String,
    pub table_id: String,
    /// Ordinal of this visit within the table's business day (1-based).
    pub cycle_number: i64,
    pub total_amount: Money,
    pub total_items: i64,
    pub status: CycleStatus,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Archive Graph
// =============================================================================

/// Immutable copy of a live order, written at checkout.
/// `created_at` carries the original order's creation time; `archived_at` is
/// when the checkout transaction ran.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ArchivedOrder {
    pub id: String,
    pub sales_cycle_id: String,
    pub store_id: String,
    pub table_id: String,
    /// Id the order had while live (live row is deleted at archival).
    pub original_order_id: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub archived_at: DateTime<Utc>,
}

/// Immutable copy of an order line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ArchivedOrderItem {
    pub id: String,
    pub archived_order_id: String,
    /// Kept as a plain id (no FK): the archive outlives catalog cleanup.
    pub menu_item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Immutable copy of a selected option.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ArchivedOrderItemOption {
    pub id: String,
    pub archived_order_item_id: String,
    pub name: String,
    pub price: Money,
}

/// Immutable copy of an added topping.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ArchivedOrderItemTopping {
    pub id: String,
    pub archived_order_item_id: String,
    pub name: String,
    pub price: Money,
}

// =============================================================================
// Daily Sales
// =============================================================================

/// Aggregated sales for one (store, business day).
///
/// Re-derived from the archive on demand; `is_finalized = true` freezes the
/// row against further recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailySales {
    pub id: String,
    pub store_id: String,
    /// The accounting date (not necessarily the calendar date of every sale
    /// it covers - a 25:30 checkout belongs to the previous day's row).
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub total_orders: i64,
    pub total_items: i64,
    pub total_amount: Money,
    /// Consumption tax contained in `total_amount` (tax-included pricing).
    pub tax_amount: Money,
    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub period_end: DateTime<Utc>,
    pub is_finalized: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Checkout Result
// =============================================================================

/// Outcome of a checkout call.
///
/// A checkout of a table with no open orders is a successful no-op:
/// `archived_orders = 0`, `sales_cycle = None`, nothing mutated. Callers must
/// treat it identically to a successful archival of zero orders, never as an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    /// Number of live orders moved into the archive.
    pub archived_orders: i64,
    pub total_amount: Money,
    pub total_items: i64,
    /// The completed cycle, when anything was archived.
    pub sales_cycle: Option<SalesCycle>,
}

impl CheckoutResult {
    /// The no-op result for a checkout of an empty table.
    pub fn empty() -> Self {
        CheckoutResult {
            archived_orders: 0,
            total_amount: Money::zero(),
            total_items: 0,
            sales_cycle: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(800);
        assert_eq!(rate.bps(), 800);
        assert!((rate.percentage() - 8.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(10.0);
        assert_eq!(rate.bps(), 1000);
    }

    #[test]
    fn test_tax_rate_default_is_japanese_standard() {
        assert_eq!(TaxRate::default().bps(), 1000);
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(CycleStatus::default(), CycleStatus::Active);
    }

    #[test]
    fn test_status_serde_encoding() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Delivered).unwrap(),
            "\"delivered\""
        );
        assert_eq!(
            serde_json::to_string(&CycleStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn test_store_timezone_resolution() {
        let store = Store {
            id: "s1".to_string(),
            name: "本店".to_string(),
            timezone: "Asia/Tokyo".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(store.tz().unwrap(), chrono_tz::Asia::Tokyo);

        let broken = Store {
            timezone: "Mars/Olympus".to_string(),
            ..store
        };
        assert!(matches!(broken.tz(), Err(CoreError::UnknownTimezone(_))));
    }

    #[test]
    fn test_store_hours_rehydration() {
        let hours = StoreHours {
            id: "h1".to_string(),
            store_id: "s1".to_string(),
            day_of_week: None,
            open_time: "17:00".to_string(),
            close_time: "02:00".to_string(),
            crosses_midnight: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let rehydrated = hours.to_business_hours(chrono_tz::Asia::Tokyo).unwrap();
        assert!(rehydrated.crosses_midnight);
        assert_eq!(rehydrated.close_display(), "26:00");
        assert_eq!(hours.close_display().unwrap(), "26:00");
    }

    #[test]
    fn test_checkout_result_serializes_camel_case() {
        let json = serde_json::to_string(&CheckoutResult::empty()).unwrap();
        assert!(json.contains("\"archivedOrders\":0"));
        assert!(json.contains("\"totalAmount\":0"));
        assert!(json.contains("\"salesCycle\":null"));
    }
}

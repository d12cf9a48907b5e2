//! # Daily Sales Aggregator
//!
//! Recomputes one `(store, business date)` row of `daily_sales` from the
//! archive. The row is a cache, never a source of truth: it can be thrown
//! away and rebuilt until the day is finalized.
//!
//! ## Recompute Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                recompute(store, 2025-06-12)                             │
//! │                                                                         │
//! │  1. PERIOD    schedule for the date → [Jun 12 17:00, Jun 13 17:00) JST  │
//! │               (no schedule → the plain civil day, midnight to midnight) │
//! │  2. GATE      row already finalized? → AlreadyFinalized, stop           │
//! │  3. SUM       archived_orders by archived_at ∈ period                   │
//! │               + live delivered orders by updated_at ∈ period (policy)   │
//! │  4. TAX       included-tax portion of the total (tax-included pricing)  │
//! │  5. UPSERT    INSERT .. ON CONFLICT (store_id, business_date)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Which Sales Belong to a Day
//! Archived orders land on the day containing their `archived_at` - the
//! moment the party paid - so a visit that spans 23:40-25:10 counts once,
//! on the night it ended. The delivered-but-unarchived policy additionally
//! counts live orders already served but not yet paid for, valued at their
//! creation-time snapshot totals (the only totals a live order has).

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::business_hours::{self, BusinessHoursRepository};
use kaikei_core::{
    civil_day_period, Clock, DailySales, Money, Store, SystemClock, TaxRate,
};

// =============================================================================
// Aggregator Configuration
// =============================================================================

/// Policy knobs for daily aggregation.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Consumption tax rate contained in the (tax-included) totals.
    pub tax_rate: TaxRate,
    /// Whether delivered-but-unarchived live orders count toward the day.
    /// On by default: the food is on the table, the revenue is real even
    /// before the party pays.
    pub count_delivered_unarchived: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            tax_rate: TaxRate::default(),
            count_delivered_unarchived: true,
        }
    }
}

impl AggregatorConfig {
    /// Strict policy: only archived (paid-for) orders count.
    pub fn archived_only() -> Self {
        AggregatorConfig {
            count_delivered_unarchived: false,
            ..AggregatorConfig::default()
        }
    }

    /// Standard policy at a non-default tax rate.
    pub fn with_tax_rate(tax_rate: TaxRate) -> Self {
        AggregatorConfig {
            tax_rate,
            ..AggregatorConfig::default()
        }
    }
}

// =============================================================================
// Daily Sales Aggregator
// =============================================================================

/// Recomputes, finalizes, and reopens daily sales rows.
#[derive(Debug, Clone)]
pub struct DailySalesAggregator {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    config: AggregatorConfig,
}

impl DailySalesAggregator {
    /// Creates an aggregator on the system clock.
    pub fn new(pool: SqlitePool, config: AggregatorConfig) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock), config)
    }

    /// Creates an aggregator on an injected clock.
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>, config: AggregatorConfig) -> Self {
        DailySalesAggregator {
            pool,
            clock,
            config,
        }
    }

    /// Rebuilds the row for one business date from the archive.
    ///
    /// Upserts on `(store_id, business_date)`: recomputing is always safe to
    /// repeat and converges on the same totals.
    ///
    /// ## Errors
    /// - `AlreadyFinalized` - the day is frozen; `unfinalize` first
    /// - `NotFound` - no such store
    pub async fn recompute(&self, store_id: &str, date: NaiveDate) -> DbResult<DailySales> {
        let mut tx = self.pool.begin().await?;

        let store = sqlx::query_as::<_, Store>(
            "SELECT id, name, timezone, created_at FROM stores WHERE id = ?1",
        )
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Store", store_id))?;
        let tz = store.tz()?;

        let (period_start, period_end) =
            match business_hours::effective_for_date_on(&mut *tx, store_id, tz, date).await? {
                Some(hours) => hours.accounting_period(date),
                None => {
                    debug!(
                        store_id = %store_id,
                        business_date = %date,
                        "No business hours configured - aggregating the civil day"
                    );
                    civil_day_period(tz, date)
                }
            };

        if let Some(row) = fetch_day(&mut *tx, store_id, date).await? {
            if row.is_finalized {
                return Err(DbError::AlreadyFinalized {
                    store_id: store_id.to_string(),
                    business_date: date,
                });
            }
        }

        let mut totals = archived_totals(&mut *tx, store_id, period_start, period_end).await?;
        if self.config.count_delivered_unarchived {
            let live = delivered_totals(&mut *tx, store_id, period_start, period_end).await?;
            totals.orders += live.orders;
            totals.items += live.items;
            totals.amount += live.amount;
        }
        let tax = totals.amount.tax_included_in(self.config.tax_rate);

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO daily_sales (
                id, store_id, business_date, total_orders, total_items,
                total_amount, tax_amount, period_start, period_end,
                is_finalized, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)
            ON CONFLICT (store_id, business_date) DO UPDATE SET
                total_orders = excluded.total_orders,
                total_items = excluded.total_items,
                total_amount = excluded.total_amount,
                tax_amount = excluded.tax_amount,
                period_start = excluded.period_start,
                period_end = excluded.period_end,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(store_id)
        .bind(date)
        .bind(totals.orders)
        .bind(totals.items)
        .bind(totals.amount)
        .bind(tax)
        .bind(period_start)
        .bind(period_end)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let sales = fetch_day(&mut *tx, store_id, date)
            .await?
            .ok_or_else(|| DbError::Internal("daily sales row vanished after upsert".into()))?;
        tx.commit().await?;

        info!(
            store_id = %store_id,
            business_date = %date,
            orders = sales.total_orders,
            items = sales.total_items,
            total = %sales.total_amount,
            tax = %sales.tax_amount,
            "Recomputed daily sales"
        );

        Ok(sales)
    }

    /// Rebuilds the row for the business date the clock currently falls in.
    pub async fn recompute_current(&self, store_id: &str) -> DbResult<DailySales> {
        let date = BusinessHoursRepository::new(self.pool.clone())
            .accounting_date(store_id, self.clock.now_utc())
            .await?;
        self.recompute(store_id, date).await
    }

    /// Freezes a day against further recomputation.
    ///
    /// Finalizing an already-finalized day returns the row unchanged. The
    /// day must have been recomputed at least once (`NotFound` otherwise):
    /// freezing a row that never existed would freeze nothing.
    pub async fn finalize(&self, store_id: &str, date: NaiveDate) -> DbResult<DailySales> {
        let mut tx = self.pool.begin().await?;

        let row = fetch_day(&mut *tx, store_id, date)
            .await?
            .ok_or_else(|| DbError::not_found("Daily sales", format!("{}/{}", store_id, date)))?;
        if row.is_finalized {
            return Ok(row);
        }

        sqlx::query("UPDATE daily_sales SET is_finalized = 1, updated_at = ?2 WHERE id = ?1")
            .bind(&row.id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        let sales = fetch_day(&mut *tx, store_id, date)
            .await?
            .ok_or_else(|| DbError::Internal("daily sales row vanished at finalize".into()))?;
        tx.commit().await?;

        info!(
            store_id = %store_id,
            business_date = %date,
            total = %sales.total_amount,
            "Finalized daily sales"
        );

        Ok(sales)
    }

    /// Reopens a finalized day so it can be recomputed again.
    ///
    /// The one legitimate reversal path; corrections go through the live
    /// data and a fresh `recompute`, never by editing the row.
    pub async fn unfinalize(&self, store_id: &str, date: NaiveDate) -> DbResult<DailySales> {
        let mut tx = self.pool.begin().await?;

        let row = fetch_day(&mut *tx, store_id, date)
            .await?
            .ok_or_else(|| DbError::not_found("Daily sales", format!("{}/{}", store_id, date)))?;
        if !row.is_finalized {
            return Ok(row);
        }

        sqlx::query("UPDATE daily_sales SET is_finalized = 0, updated_at = ?2 WHERE id = ?1")
            .bind(&row.id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        let sales = fetch_day(&mut *tx, store_id, date)
            .await?
            .ok_or_else(|| DbError::Internal("daily sales row vanished at unfinalize".into()))?;
        tx.commit().await?;

        warn!(
            store_id = %store_id,
            business_date = %date,
            "Reopened finalized daily sales"
        );

        Ok(sales)
    }
}

// =============================================================================
// Period Sums
// =============================================================================

/// Totals from one source over one period.
#[derive(Debug)]
struct DayTotals {
    orders: i64,
    items: i64,
    amount: Money,
}

async fn fetch_day(
    conn: &mut SqliteConnection,
    store_id: &str,
    date: NaiveDate,
) -> DbResult<Option<DailySales>> {
    let row = sqlx::query_as::<_, DailySales>(
        r#"
        SELECT id, store_id, business_date, total_orders, total_items,
               total_amount, tax_amount, period_start, period_end,
               is_finalized, created_at, updated_at
        FROM daily_sales
        WHERE store_id = ?1 AND business_date = ?2
        "#,
    )
    .bind(store_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Sums archived orders whose `archived_at` falls in `[start, end)`.
async fn archived_totals(
    conn: &mut SqliteConnection,
    store_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DbResult<DayTotals> {
    let (orders, amount): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(total_amount), 0)
        FROM archived_orders
        WHERE store_id = ?1 AND archived_at >= ?2 AND archived_at < ?3
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;

    let items: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(i.quantity), 0)
        FROM archived_order_items i
        JOIN archived_orders o ON o.id = i.archived_order_id
        WHERE o.store_id = ?1 AND o.archived_at >= ?2 AND o.archived_at < ?3
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;

    Ok(DayTotals {
        orders,
        items,
        amount: Money::from_yen(amount),
    })
}

/// Sums live delivered orders whose `updated_at` (the delivery stamp) falls
/// in `[start, end)`. Valued at the creation-time snapshot totals.
async fn delivered_totals(
    conn: &mut SqliteConnection,
    store_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DbResult<DayTotals> {
    let (orders, amount): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(total_amount), 0)
        FROM orders
        WHERE store_id = ?1 AND status = 'delivered'
          AND updated_at >= ?2 AND updated_at < ?3
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;

    let items: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(i.quantity), 0)
        FROM order_items i
        JOIN orders o ON o.id = i.order_id
        WHERE o.store_id = ?1 AND o.status = 'delivered'
          AND o.updated_at >= ?2 AND o.updated_at < ?3
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;

    Ok(DayTotals {
        orders,
        items,
        amount: Money::from_yen(amount),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, Utc};

    use super::AggregatorConfig;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::order::{LineModifier, NewOrderLine};
    use kaikei_core::{FixedClock, Money, TaxRate};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_config_policies() {
        let standard = AggregatorConfig::default();
        assert!(standard.count_delivered_unarchived);
        assert_eq!(standard.tax_rate.bps(), 1000);

        let strict = AggregatorConfig::archived_only();
        assert!(!strict.count_delivered_unarchived);

        let reduced = AggregatorConfig::with_tax_rate(TaxRate::from_bps(800));
        assert_eq!(reduced.tax_rate.bps(), 800);
        assert!(reduced.count_delivered_unarchived);
    }

    /// Archives the worked example: a 17:00-26:00 izakaya where table 5 ran
    /// up ¥3,700 over two orders (3 items), paid at 00:20 JST on civil
    /// Jun 13 - the night of business date Jun 12.
    async fn archived_night(db: &Database) -> String {
        let store = db.stores().create("炉ばた 甚八", "Asia/Tokyo").await.unwrap();
        db.business_hours()
            .upsert(&store.id, None, "17:00", "26:00")
            .await
            .unwrap();
        let table = db.tables().create(&store.id, 5, 4, None).await.unwrap();
        let yakitori = db
            .menu()
            .create(&store.id, "焼き鳥盛り", Money::from_yen(1000))
            .await
            .unwrap();
        let sashimi = db
            .menu()
            .create(&store.id, "刺し盛り", Money::from_yen(1500))
            .await
            .unwrap();

        db.orders()
            .place_order(&store.id, &table.id, &[NewOrderLine::plain(&yakitori.id, 2)])
            .await
            .unwrap();
        db.orders()
            .place_order(
                &store.id,
                &table.id,
                &[NewOrderLine {
                    menu_item_id: sashimi.id.clone(),
                    quantity: 1,
                    options: vec![],
                    toppings: vec![LineModifier::new("うに乗せ", Money::from_yen(200))],
                }],
            )
            .await
            .unwrap();

        let archiver = db.archiver_with(Arc::new(FixedClock::at(utc("2025-06-12T15:20:00Z"))));
        archiver.checkout(&store.id, 5).await.unwrap();

        store.id
    }

    #[tokio::test]
    async fn test_recompute_sums_the_business_night() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = archived_night(&db).await;

        let aggregator = db.aggregator(AggregatorConfig::default());
        let sales = aggregator.recompute(&store, date("2025-06-12")).await.unwrap();

        assert_eq!(sales.business_date, date("2025-06-12"));
        assert_eq!(sales.total_orders, 2);
        assert_eq!(sales.total_items, 3);
        assert_eq!(sales.total_amount, Money::from_yen(3700));
        // 10% contained in a tax-included ¥3,700.
        assert_eq!(sales.tax_amount, Money::from_yen(336));
        assert!(!sales.is_finalized);

        // [open, next open): 17:00 JST Jun 12 through 17:00 JST Jun 13.
        assert_eq!(sales.period_start, utc("2025-06-12T08:00:00Z"));
        assert_eq!(sales.period_end, utc("2025-06-13T08:00:00Z"));

        // The repository sees the same row.
        let fetched = db
            .daily_sales()
            .get(&store, date("2025-06-12"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, sales.id);
        assert_eq!(fetched.total_amount, sales.total_amount);
    }

    #[tokio::test]
    async fn test_recompute_converges_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = archived_night(&db).await;
        let aggregator = db.aggregator(AggregatorConfig::default());

        let first = aggregator.recompute(&store, date("2025-06-12")).await.unwrap();
        let second = aggregator.recompute(&store, date("2025-06-12")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.total_amount, second.total_amount);

        let rows = db
            .daily_sales()
            .list_range(&store, date("2025-06-01"), date("2025-06-30"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_day_recomputes_to_zeros() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();
        db.business_hours()
            .upsert(&store.id, None, "17:00", "26:00")
            .await
            .unwrap();

        let sales = db
            .aggregator(AggregatorConfig::default())
            .recompute(&store.id, date("2025-06-12"))
            .await
            .unwrap();

        assert_eq!(sales.total_orders, 0);
        assert_eq!(sales.total_amount, Money::zero());
        assert_eq!(sales.tax_amount, Money::zero());
    }

    #[tokio::test]
    async fn test_finalize_freezes_the_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = archived_night(&db).await;
        let aggregator = db.aggregator(AggregatorConfig::default());
        let day = date("2025-06-12");

        aggregator.recompute(&store, day).await.unwrap();
        let frozen = aggregator.finalize(&store, day).await.unwrap();
        assert!(frozen.is_finalized);

        let err = aggregator.recompute(&store, day).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyFinalized { .. }));

        // Finalizing again is a no-op, not an error.
        let again = aggregator.finalize(&store, day).await.unwrap();
        assert!(again.is_finalized);

        // Reopening makes recomputation legal again.
        let reopened = aggregator.unfinalize(&store, day).await.unwrap();
        assert!(!reopened.is_finalized);
        aggregator.recompute(&store, day).await.unwrap();
    }

    #[tokio::test]
    async fn test_finalize_requires_a_recomputed_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();

        let err = db
            .aggregator(AggregatorConfig::default())
            .finalize(&store.id, date("2025-06-12"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delivered_unarchived_policy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        // No schedule: the aggregation period degrades to the civil day, so
        // rows stamped with the real wall clock land inside it.
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();
        let served = db.tables().create(&store.id, 1, 2, None).await.unwrap();
        let paid = db.tables().create(&store.id, 2, 2, None).await.unwrap();
        let waiting = db.tables().create(&store.id, 3, 2, None).await.unwrap();
        let beer = db
            .menu()
            .create(&store.id, "生ビール", Money::from_yen(500))
            .await
            .unwrap();
        let sake = db
            .menu()
            .create(&store.id, "熱燗", Money::from_yen(800))
            .await
            .unwrap();

        // Table 1: delivered but unpaid.
        let order = db
            .orders()
            .place_order(&store.id, &served.id, &[NewOrderLine::plain(&beer.id, 1)])
            .await
            .unwrap();
        db.orders().mark_delivered(&order.id).await.unwrap();

        // Table 2: archived through a real checkout.
        db.orders()
            .place_order(&store.id, &paid.id, &[NewOrderLine::plain(&sake.id, 1)])
            .await
            .unwrap();
        db.archiver().checkout(&store.id, 2).await.unwrap();

        // Table 3: still pending - never counts.
        db.orders()
            .place_order(&store.id, &waiting.id, &[NewOrderLine::plain(&beer.id, 9)])
            .await
            .unwrap();

        let standard = db
            .aggregator(AggregatorConfig::default())
            .recompute_current(&store.id)
            .await
            .unwrap();
        assert_eq!(standard.total_orders, 2);
        assert_eq!(standard.total_items, 2);
        assert_eq!(standard.total_amount, Money::from_yen(1300));

        let strict = db
            .aggregator(AggregatorConfig::archived_only())
            .recompute_current(&store.id)
            .await
            .unwrap();
        assert_eq!(strict.total_orders, 1);
        assert_eq!(strict.total_items, 1);
        assert_eq!(strict.total_amount, Money::from_yen(800));
    }
}

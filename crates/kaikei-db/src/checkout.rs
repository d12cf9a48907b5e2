//! # Checkout Archiver
//!
//! The transactional core: closes out a table's visit by moving its live
//! order graph into the immutable archive.
//!
//! ## One Atomic Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     checkout(store, table 5)                            │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   1. CLAIM     touch the table row (write lock; serializes rivals)     │
//! │   2. LOAD      table · schedule · every open order with its graph      │
//! │        └─ zero open orders? → ROLLBACK, report no-op success           │
//! │   3. PRICE     re-resolve each line from the current menu              │
//! │   4. CYCLE     resolve-or-create the active cycle, number it           │
//! │   5. ARCHIVE   copy orders → archived_orders (+items/options/toppings) │
//! │   6. COMPLETE  cycle → completed, totals, completed_at = now           │
//! │   7. DELETE    live graph, leaves first (options/toppings→items→order) │
//! │   8. RESET     checkout_requested = 0                                  │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any failure after the claim rolls the whole thing back: the single    │
//! │  worst outcome would be a half-archived table (orders deleted but no   │
//! │  completed cycle), and the transaction boundary is what forbids it.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Same-Table Rivals
//! Two checkouts of one table serialize on the claim: the first statement of
//! the transaction is an UPDATE, so the loser waits on SQLite's write lock
//! (busy_timeout) and then reads the winner's committed state - an empty
//! table - and lands on the no-op path. Never double-archived, never lost.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::business_hours;
use kaikei_core::pricing::{resolve_line, CycleTotals, LinePricing};
use kaikei_core::{
    civil_date, CheckoutResult, Clock, CycleStatus, DiningTable, Money, Order, OrderItem,
    OrderItemOption, OrderItemTopping, SalesCycle, Store, SystemClock,
};

// =============================================================================
// Checkout Archiver
// =============================================================================

/// Runs the checkout transaction for a table.
#[derive(Debug, Clone)]
pub struct CheckoutArchiver {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl CheckoutArchiver {
    /// Creates an archiver on the system clock.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Creates an archiver on an injected clock.
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        CheckoutArchiver { pool, clock }
    }

    /// Closes out a table: archives its open orders as one completed sales
    /// cycle and clears the live state.
    ///
    /// ## Returns
    /// - `CheckoutResult` with the completed cycle when orders were archived
    /// - the zero no-op result when the table had no open orders (checking
    ///   out an empty table is success, not an error - this is what makes
    ///   retries safe)
    ///
    /// ## Errors
    /// - `TableNotFound` - no such table number in the store
    /// - `MenuItemNotFound` - an order line references a vanished catalog
    ///   item; failing loudly beats silently pricing the line at zero
    /// - `CheckoutFailed` - the archival mutations or the commit failed;
    ///   everything rolled back, the table is exactly as it was
    pub async fn checkout(&self, store_id: &str, table_number: i64) -> DbResult<CheckoutResult> {
        let now = self.clock.now_utc();
        let mut tx = self.pool.begin().await?;

        // The claim must be the FIRST statement: an UPDATE makes this
        // transaction a writer from the start, so a rival checkout of the
        // same table blocks here until we commit and then sees our result.
        let claimed = sqlx::query(
            r#"
            UPDATE dining_tables SET checkout_requested = checkout_requested
            WHERE store_id = ?1 AND table_number = ?2
            "#,
        )
        .bind(store_id)
        .bind(table_number)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Err(DbError::table_not_found(store_id, table_number));
        }

        let plan = load_plan(&mut *tx, store_id, table_number, now).await?;

        if plan.orders.is_empty() {
            // Nothing was mutated (the claim touched no data); make that
            // explicit instead of committing an empty transaction.
            tx.rollback().await?;
            debug!(
                store_id = %store_id,
                table_number,
                "Checkout of empty table - no-op"
            );
            return Ok(CheckoutResult::empty());
        }

        let cycle = match complete_cycle(&mut *tx, &plan, now).await {
            Ok(cycle) => cycle,
            // Dropping the transaction rolls every mutation back.
            Err(source) => return Err(DbError::checkout_failed(source)),
        };

        if let Err(e) = tx.commit().await {
            return Err(DbError::checkout_failed(e.into()));
        }

        info!(
            store_id = %store_id,
            table_number,
            business_date = %plan.business_date,
            cycle_number = cycle.cycle_number,
            archived = plan.orders.len(),
            total = %plan.totals.total_amount,
            "Checkout archived visit"
        );

        Ok(CheckoutResult {
            archived_orders: plan.orders.len() as i64,
            total_amount: plan.totals.total_amount,
            total_items: plan.totals.total_items,
            sales_cycle: Some(cycle),
        })
    }
}

// =============================================================================
// Loaded Graph
// =============================================================================

/// One open line with its repriced total.
#[derive(Debug)]
struct LoadedLine {
    item: OrderItem,
    options: Vec<OrderItemOption>,
    toppings: Vec<OrderItemTopping>,
    pricing: LinePricing,
}

/// One open order, fully loaded and repriced.
#[derive(Debug)]
struct LoadedOrder {
    order: Order,
    lines: Vec<LoadedLine>,
    /// Sum of the repriced line totals (may differ from the live preview).
    total: Money,
}

/// Everything the mutation phase needs, read under the claim.
#[derive(Debug)]
struct CheckoutPlan {
    table: DiningTable,
    orders: Vec<LoadedOrder>,
    totals: CycleTotals,
    business_date: NaiveDate,
    /// Accounting period scoping the cycle number; None when the store has
    /// no configured hours (degraded global numbering).
    period: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Loads the table, schedule, and every open order with its graph, repricing
/// each line from the current menu.
async fn load_plan(
    conn: &mut SqliteConnection,
    store_id: &str,
    table_number: i64,
    now: DateTime<Utc>,
) -> DbResult<CheckoutPlan> {
    // Claim matched, so the table row exists.
    let table = sqlx::query_as::<_, DiningTable>(
        r#"
        SELECT id, store_id, table_number, capacity, area,
               checkout_requested, checkout_requested_at, created_at
        FROM dining_tables
        WHERE store_id = ?1 AND table_number = ?2
        "#,
    )
    .bind(store_id)
    .bind(table_number)
    .fetch_one(&mut *conn)
    .await?;

    let store = sqlx::query_as::<_, Store>(
        "SELECT id, name, timezone, created_at FROM stores WHERE id = ?1",
    )
    .bind(store_id)
    .fetch_one(&mut *conn)
    .await?;
    let tz = store.tz()?;

    let hours = business_hours::effective_at_on(&mut *conn, store_id, tz, now).await?;
    let (business_date, period) = match &hours {
        Some(hours) => {
            let date = hours.accounting_date(now);
            (date, Some(hours.accounting_period(date)))
        }
        None => (civil_date(tz, now), None),
    };

    let open_orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, store_id, table_id, status, total_amount, created_at, updated_at
        FROM orders
        WHERE table_id = ?1
        ORDER BY created_at
        "#,
    )
    .bind(&table.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut totals = CycleTotals::new();
    let mut orders = Vec::with_capacity(open_orders.len());
    for order in open_orders {
        let loaded = load_order(&mut *conn, order, &mut totals).await?;
        orders.push(loaded);
    }

    debug!(
        table_number,
        orders = orders.len(),
        business_date = %business_date,
        "Loaded open orders for checkout"
    );

    Ok(CheckoutPlan {
        table,
        orders,
        totals,
        business_date,
        period,
    })
}

/// Loads one order's lines and reprices them against the current menu.
async fn load_order(
    conn: &mut SqliteConnection,
    order: Order,
    totals: &mut CycleTotals,
) -> DbResult<LoadedOrder> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, menu_item_id, item_name,
               quantity, unit_price, total_price, created_at
        FROM order_items
        WHERE order_id = ?1
        ORDER BY created_at
        "#,
    )
    .bind(&order.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines = Vec::with_capacity(items.len());
    let mut total = Money::zero();
    for item in items {
        let base_price: Option<Money> =
            sqlx::query_scalar("SELECT price FROM menu_items WHERE id = ?1")
                .bind(&item.menu_item_id)
                .fetch_optional(&mut *conn)
                .await?;
        let base_price =
            base_price.ok_or_else(|| DbError::MenuItemNotFound(item.menu_item_id.clone()))?;

        let options = sqlx::query_as::<_, OrderItemOption>(
            r#"
            SELECT id, order_item_id, name, price
            FROM order_item_options
            WHERE order_item_id = ?1
            ORDER BY name
            "#,
        )
        .bind(&item.id)
        .fetch_all(&mut *conn)
        .await?;
        let toppings = sqlx::query_as::<_, OrderItemTopping>(
            r#"
            SELECT id, order_item_id, name, price
            FROM order_item_toppings
            WHERE order_item_id = ?1
            ORDER BY name
            "#,
        )
        .bind(&item.id)
        .fetch_all(&mut *conn)
        .await?;

        let option_prices: Vec<Money> = options.iter().map(|o| o.price).collect();
        let topping_prices: Vec<Money> = toppings.iter().map(|t| t.price).collect();
        let pricing = resolve_line(base_price, &option_prices, &topping_prices, item.quantity)?;

        totals.add_line(&pricing, item.quantity);
        total += pricing.total_price;
        lines.push(LoadedLine {
            item,
            options,
            toppings,
            pricing,
        });
    }
    totals.add_order();

    Ok(LoadedOrder {
        order,
        lines,
        total,
    })
}

// =============================================================================
// Mutation Phase
// =============================================================================

/// Archives the plan and completes the cycle. Caller wraps any error as
/// `CheckoutFailed` and rolls back.
async fn complete_cycle(
    conn: &mut SqliteConnection,
    plan: &CheckoutPlan,
    now: DateTime<Utc>,
) -> DbResult<SalesCycle> {
    let existing = sqlx::query_as::<_, SalesCycle>(
        r#"
        SELECT id, store_id, table_id, cycle_number, total_amount,
               total_items, status, started_at, completed_at
        FROM sales_cycles
        WHERE table_id = ?1 AND status = 'active'
        "#,
    )
    .bind(&plan.table.id)
    .fetch_optional(&mut *conn)
    .await?;

    let cycle_number = next_cycle_number(&mut *conn, &plan.table.id, plan.period).await?;

    // The visit runs from the first order to this checkout.
    let first_order_at = plan
        .orders
        .iter()
        .map(|o| o.order.created_at)
        .min()
        .unwrap_or(now);

    let (cycle_id, started_at) = match existing {
        Some(cycle) => (cycle.id, cycle.started_at),
        None => {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO sales_cycles (
                    id, store_id, table_id, cycle_number,
                    total_amount, total_items, status, started_at, completed_at
                ) VALUES (?1, ?2, ?3, ?4, 0, 0, 'active', ?5, NULL)
                "#,
            )
            .bind(&id)
            .bind(&plan.table.store_id)
            .bind(&plan.table.id)
            .bind(cycle_number)
            .bind(first_order_at)
            .execute(&mut *conn)
            .await?;
            (id, first_order_at)
        }
    };

    for order in &plan.orders {
        archive_order(&mut *conn, &cycle_id, order, now).await?;
    }

    // Exactly-once completion: the status guard means a cycle can never be
    // completed twice even if a future caller misuses a resolved id.
    let completed = sqlx::query(
        r#"
        UPDATE sales_cycles SET
            cycle_number = ?2,
            total_amount = ?3,
            total_items = ?4,
            status = 'completed',
            completed_at = ?5
        WHERE id = ?1 AND status = 'active'
        "#,
    )
    .bind(&cycle_id)
    .bind(cycle_number)
    .bind(plan.totals.total_amount)
    .bind(plan.totals.total_items)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if completed.rows_affected() == 0 {
        return Err(DbError::Internal(format!(
            "sales cycle {} was not active at completion",
            cycle_id
        )));
    }

    for order in &plan.orders {
        delete_order_graph(&mut *conn, &order.order.id).await?;
    }

    sqlx::query(
        r#"
        UPDATE dining_tables SET
            checkout_requested = 0,
            checkout_requested_at = NULL
        WHERE id = ?1
        "#,
    )
    .bind(&plan.table.id)
    .execute(&mut *conn)
    .await?;

    Ok(SalesCycle {
        id: cycle_id,
        store_id: plan.table.store_id.clone(),
        table_id: plan.table.id.clone(),
        cycle_number,
        total_amount: plan.totals.total_amount,
        total_items: plan.totals.total_items,
        status: CycleStatus::Completed,
        started_at,
        completed_at: Some(now),
    })
}

/// Next visit ordinal for the table.
///
/// Scoped to the accounting period when one exists: `1 + max(cycle_number)`
/// over cycles completed inside it. Without configured hours the scope
/// degrades to the table's whole history - always available, never an error.
async fn next_cycle_number(
    conn: &mut SqliteConnection,
    table_id: &str,
    period: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> DbResult<i64> {
    let max: Option<i64> = match period {
        Some((start, end)) => {
            sqlx::query_scalar(
                r#"
                SELECT MAX(cycle_number)
                FROM sales_cycles
                WHERE table_id = ?1
                  AND completed_at IS NOT NULL
                  AND completed_at >= ?2
                  AND completed_at < ?3
                "#,
            )
            .bind(table_id)
            .bind(start)
            .bind(end)
            .fetch_one(&mut *conn)
            .await?
        }
        None => {
            warn!(
                table_id = %table_id,
                "No business hours configured - cycle numbers fall back to the table's whole history"
            );
            sqlx::query_scalar("SELECT MAX(cycle_number) FROM sales_cycles WHERE table_id = ?1")
                .bind(table_id)
                .fetch_one(&mut *conn)
                .await?
        }
    };

    Ok(max.unwrap_or(0) + 1)
}

/// Copies one live order into the archive, carrying original creation times
/// and stamping `archived_at`.
async fn archive_order(
    conn: &mut SqliteConnection,
    cycle_id: &str,
    loaded: &LoadedOrder,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let archived_order_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO archived_orders (
            id, sales_cycle_id, store_id, table_id, original_order_id,
            status, total_amount, created_at, archived_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&archived_order_id)
    .bind(cycle_id)
    .bind(&loaded.order.store_id)
    .bind(&loaded.order.table_id)
    .bind(&loaded.order.id)
    .bind(loaded.order.status)
    .bind(loaded.total)
    .bind(loaded.order.created_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for line in &loaded.lines {
        let archived_item_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO archived_order_items (
                id, archived_order_id, menu_item_id, item_name,
                quantity, unit_price, total_price, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&archived_item_id)
        .bind(&archived_order_id)
        .bind(&line.item.menu_item_id)
        .bind(&line.item.item_name)
        .bind(line.item.quantity)
        .bind(line.pricing.unit_price)
        .bind(line.pricing.total_price)
        .bind(line.item.created_at)
        .execute(&mut *conn)
        .await?;

        for option in &line.options {
            sqlx::query(
                r#"
                INSERT INTO archived_order_item_options (id, archived_order_item_id, name, price)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&archived_item_id)
            .bind(&option.name)
            .bind(option.price)
            .execute(&mut *conn)
            .await?;
        }
        for topping in &line.toppings {
            sqlx::query(
                r#"
                INSERT INTO archived_order_item_toppings (id, archived_order_item_id, name, price)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&archived_item_id)
            .bind(&topping.name)
            .bind(topping.price)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

/// Explicit aggregate delete of one live order, leaves before roots. No
/// schema-level cascades: the whole fan-out stays visible right here.
async fn delete_order_graph(conn: &mut SqliteConnection, order_id: &str) -> DbResult<()> {
    sqlx::query(
        r#"
        DELETE FROM order_item_options
        WHERE order_item_id IN (SELECT id FROM order_items WHERE order_id = ?1)
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM order_item_toppings
        WHERE order_item_id IN (SELECT id FROM order_items WHERE order_id = ?1)
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM orders WHERE id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, Utc};
    use chrono_tz::Asia::Tokyo;
    use uuid::Uuid;

    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::order::{LineModifier, NewOrderLine};
    use kaikei_core::{CycleStatus, FixedClock, Money};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// An izakaya open 17:00-26:00 with table 5 seated: order A is 2 × ¥1000,
    /// order B is 1 × ¥1500 plus a ¥200 topping.
    async fn seated_table(db: &Database) -> (String, String, String, String) {
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

        (store.id, table.id, yakitori.id, sashimi.id)
    }

    #[tokio::test]
    async fn test_late_night_checkout_lands_on_previous_business_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (store, table, _, _) = seated_table(&db).await;
        db.tables().request_checkout(&store, 5).await.unwrap();

        // 00:20 JST on civil Jun 13 - the operating night of Jun 12.
        let checkout_at = utc("2025-06-12T15:20:00Z");
        let archiver = db.archiver_with(Arc::new(FixedClock::at(checkout_at)));

        let result = archiver.checkout(&store, 5).await.unwrap();
        assert_eq!(result.archived_orders, 2);
        assert_eq!(result.total_amount, Money::from_yen(3700));
        assert_eq!(result.total_items, 3);

        let cycle = result.sales_cycle.unwrap();
        assert_eq!(cycle.cycle_number, 1);
        assert_eq!(cycle.status, CycleStatus::Completed);
        assert_eq!(cycle.completed_at, Some(checkout_at));
        assert_eq!(cycle.total_amount, Money::from_yen(3700));

        // The instant maps to the previous civil date's business day.
        let hours = db
            .business_hours()
            .effective_at(&store, Tokyo, checkout_at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hours.accounting_date(checkout_at), date("2025-06-12"));

        // Live state is gone and the flag is reset.
        assert!(db.orders().list_open_for_table(&table).await.unwrap().is_empty());
        let reloaded = db.tables().get_by_number(&store, 5).await.unwrap().unwrap();
        assert!(!reloaded.checkout_requested);
        assert!(reloaded.checkout_requested_at.is_none());

        // Both orders are in the archive.
        let archived = db.archive().orders_for_cycle(&cycle.id).await.unwrap();
        assert_eq!(archived.len(), 2);
    }

    #[tokio::test]
    async fn test_second_checkout_is_a_noop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (store, _, _, _) = seated_table(&db).await;

        let clock = Arc::new(FixedClock::at(utc("2025-06-12T15:20:00Z")));
        let archiver = db.archiver_with(clock);

        let first = archiver.checkout(&store, 5).await.unwrap();
        assert_eq!(first.archived_orders, 2);

        let second = archiver.checkout(&store, 5).await.unwrap();
        assert_eq!(second.archived_orders, 0);
        assert_eq!(second.total_amount, Money::zero());
        assert!(second.sales_cycle.is_none());

        // The first visit's record is untouched.
        assert_eq!(db.sales_cycles().count_for_store(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_archive_conserves_the_cycle_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (store, _, _, _) = seated_table(&db).await;

        let archiver = db.archiver_with(Arc::new(FixedClock::at(utc("2025-06-12T15:20:00Z"))));
        let cycle = archiver
            .checkout(&store, 5)
            .await
            .unwrap()
            .sales_cycle
            .unwrap();

        let archived_total = db.archive().total_for_cycle(&cycle.id).await.unwrap();
        assert_eq!(archived_total, cycle.total_amount);
        assert_eq!(archived_total, Money::from_yen(3700));
    }

    #[tokio::test]
    async fn test_checkout_reprices_from_the_current_menu() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();
        db.business_hours()
            .upsert(&store.id, None, "17:00", "26:00")
            .await
            .unwrap();
        let table = db.tables().create(&store.id, 1, 2, None).await.unwrap();
        let beer = db
            .menu()
            .create(&store.id, "生ビール", Money::from_yen(500))
            .await
            .unwrap();

        db.orders()
            .place_order(&store.id, &table.id, &[NewOrderLine::plain(&beer.id, 1)])
            .await
            .unwrap();
        // Price rises after the order was placed; checkout resolves against
        // the menu as it stands now.
        db.menu().update_price(&beer.id, Money::from_yen(600)).await.unwrap();

        let archiver = db.archiver_with(Arc::new(FixedClock::at(utc("2025-06-12T10:00:00Z"))));
        let result = archiver.checkout(&store.id, 1).await.unwrap();
        assert_eq!(result.total_amount, Money::from_yen(600));

        let cycle = result.sales_cycle.unwrap();
        let archived = db.archive().orders_for_cycle(&cycle.id).await.unwrap();
        let items = db.archive().items_for_order(&archived[0].id).await.unwrap();
        assert_eq!(items[0].unit_price, Money::from_yen(600));
    }

    #[tokio::test]
    async fn test_cycle_numbers_restart_at_opening_time() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();
        db.business_hours()
            .upsert(&store.id, None, "17:00", "26:00")
            .await
            .unwrap();
        let table = db.tables().create(&store.id, 5, 4, None).await.unwrap();
        let beer = db
            .menu()
            .create(&store.id, "生ビール", Money::from_yen(500))
            .await
            .unwrap();

        let mut numbers = Vec::new();
        for instant in [
            "2025-06-12T14:00:00Z", // 23:00 JST - the Jun 12 operating night
            "2025-06-12T16:30:00Z", // 01:30 JST next civil day, same night
            "2025-06-13T09:00:00Z", // 18:00 JST - the next operating day
        ] {
            db.orders()
                .place_order(&store.id, &table.id, &[NewOrderLine::plain(&beer.id, 1)])
                .await
                .unwrap();
            let archiver = db.archiver_with(Arc::new(FixedClock::at(utc(instant))));
            let result = archiver.checkout(&store.id, 5).await.unwrap();
            numbers.push(result.sales_cycle.unwrap().cycle_number);
        }

        assert_eq!(numbers, vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn test_unconfigured_store_numbers_cycles_globally() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        // No business hours at all.
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();
        let table = db.tables().create(&store.id, 5, 4, None).await.unwrap();
        let beer = db
            .menu()
            .create(&store.id, "生ビール", Money::from_yen(500))
            .await
            .unwrap();

        let mut numbers = Vec::new();
        // Days apart: a period-scoped counter would restart at 1.
        for instant in ["2025-06-12T10:00:00Z", "2025-06-15T10:00:00Z"] {
            db.orders()
                .place_order(&store.id, &table.id, &[NewOrderLine::plain(&beer.id, 1)])
                .await
                .unwrap();
            let archiver = db.archiver_with(Arc::new(FixedClock::at(utc(instant))));
            let result = archiver.checkout(&store.id, 5).await.unwrap();
            numbers.push(result.sales_cycle.unwrap().cycle_number);
        }

        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_table_is_an_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();

        let err = db.archiver().checkout(&store.id, 99).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::TableNotFound { table_number: 99, .. }
        ));
    }

    #[tokio::test]
    async fn test_vanished_menu_item_fails_loudly_and_mutates_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (store, table, yakitori, _) = seated_table(&db).await;

        // Normal operation cannot delete a referenced item (FK); force the
        // inconsistent state the failure path exists for.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("DELETE FROM menu_items WHERE id = ?1")
            .bind(&yakitori)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(db.pool())
            .await
            .unwrap();

        let archiver = db.archiver_with(Arc::new(FixedClock::at(utc("2025-06-12T15:20:00Z"))));
        let err = archiver.checkout(&store, 5).await.unwrap_err();
        // Load-phase failure surfaces raw, not wrapped as CheckoutFailed.
        assert!(matches!(err, DbError::MenuItemNotFound(_)));

        // Everything is exactly as it was: retry-safe.
        assert_eq!(db.orders().list_open_for_table(&table).await.unwrap().len(), 2);
        assert_eq!(db.sales_cycles().count_for_store(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rival_checkouts_archive_exactly_once() {
        // A file-backed database so two pool connections genuinely contend;
        // :memory: gives every connection its own database.
        let path = std::env::temp_dir().join(format!("kaikei-checkout-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(5))
            .await
            .unwrap();
        let (store, _, _, _) = seated_table(&db).await;

        let clock = Arc::new(FixedClock::at(utc("2025-06-12T15:20:00Z")));
        let first = db.archiver_with(clock.clone());
        let second = db.archiver_with(clock);

        let (a, b) = tokio::join!(first.checkout(&store, 5), second.checkout(&store, 5));
        let (a, b) = (a.unwrap(), b.unwrap());

        // One archived the visit, the other saw the empty table.
        assert_eq!(a.archived_orders + b.archived_orders, 2);
        assert_eq!(a.archived_orders.min(b.archived_orders), 0);
        assert_eq!(db.sales_cycles().count_for_store(&store).await.unwrap(), 1);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}

//! # Order Repository
//!
//! Database operations for the live order graph.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. PLACE                                                              │
//! │     └── place_order() → Order + items + options + toppings             │
//! │         (one transaction; prices frozen at this moment)                │
//! │                                                                         │
//! │  2. KITCHEN                                                            │
//! │     └── mark_delivered() → status: pending → delivered                 │
//! │                                                                         │
//! │  3. CHECKOUT (elsewhere: checkout.rs)                                  │
//! │     └── the whole graph is archived and these rows are deleted         │
//! │                                                                         │
//! │  An order is "open" as long as its rows exist. There is no closed      │
//! │  status - archival is what closes an order.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `item_name`, `unit_price` and `total_price` are copied from the catalog at
//! placement. A menu edit five minutes later must never rewrite what the
//! customer already agreed to pay.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kaikei_core::pricing::resolve_line;
use kaikei_core::validation::validate_quantity;
use kaikei_core::{
    CoreError, MenuItem, Money, Order, OrderItem, OrderItemOption, OrderItemTopping, OrderStatus,
    ValidationError,
};

/// One option or topping attached to an incoming line.
#[derive(Debug, Clone)]
pub struct LineModifier {
    pub name: String,
    /// Price delta in yen. Options may be negative ("no egg -50"),
    /// toppings are normally positive.
    pub price: Money,
}

impl LineModifier {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        LineModifier {
            name: name.into(),
            price,
        }
    }
}

/// One line of an incoming order, as sent by a table terminal.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub menu_item_id: String,
    pub quantity: i64,
    pub options: Vec<LineModifier>,
    pub toppings: Vec<LineModifier>,
}

impl NewOrderLine {
    /// A plain line with no modifiers.
    pub fn plain(menu_item_id: impl Into<String>, quantity: i64) -> Self {
        NewOrderLine {
            menu_item_id: menu_item_id.into(),
            quantity,
            options: Vec::new(),
            toppings: Vec::new(),
        }
    }
}

/// A line item with its persisted modifiers.
#[derive(Debug, Clone)]
pub struct OrderItemDetail {
    pub item: OrderItem,
    pub options: Vec<OrderItemOption>,
    pub toppings: Vec<OrderItemTopping>,
}

/// A live order with its full item graph, as the hall display wants it.
#[derive(Debug, Clone)]
pub struct OrderGraph {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// Repository for live-order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists one order submission from a table terminal.
    ///
    /// ## What This Does
    /// 1. Checks the table belongs to the store
    /// 2. Resolves every line against the catalog (must exist and be
    ///    available)
    /// 3. Freezes unit/total prices per line (base + options + toppings)
    /// 4. Inserts the order, its items and their modifiers in one
    ///    transaction
    ///
    /// ## Errors
    /// - `MenuItemNotFound` / `MenuItemUnavailable` for bad lines
    /// - `Core(Validation)` for an empty submission or a bad quantity
    pub async fn place_order(
        &self,
        store_id: &str,
        table_id: &str,
        lines: &[NewOrderLine],
    ) -> DbResult<Order> {
        if lines.is_empty() {
            return Err(DbError::Core(CoreError::Validation(
                ValidationError::Required {
                    field: "lines".to_string(),
                },
            )));
        }
        for line in lines {
            validate_quantity(line.quantity).map_err(CoreError::from)?;
        }

        let mut tx = self.pool.begin().await?;

        let table_exists: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM dining_tables
            WHERE id = ?1 AND store_id = ?2
            "#,
        )
        .bind(table_id)
        .bind(store_id)
        .fetch_one(&mut *tx)
        .await?;
        if table_exists == 0 {
            return Err(DbError::not_found("Table", table_id));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();
        let mut total_amount = Money::zero();
        let mut items: Vec<(OrderItem, Vec<OrderItemOption>, Vec<OrderItemTopping>)> = Vec::new();

        for line in lines {
            let menu_item = sqlx::query_as::<_, MenuItem>(
                r#"
                SELECT id, store_id, name, price, is_available, created_at, updated_at
                FROM menu_items
                WHERE id = ?1 AND store_id = ?2
                "#,
            )
            .bind(&line.menu_item_id)
            .bind(store_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::MenuItemNotFound(line.menu_item_id.clone()))?;

            if !menu_item.is_available {
                return Err(DbError::MenuItemUnavailable {
                    id: menu_item.id,
                    name: menu_item.name,
                });
            }

            let option_prices: Vec<Money> = line.options.iter().map(|m| m.price).collect();
            let topping_prices: Vec<Money> = line.toppings.iter().map(|m| m.price).collect();
            let pricing = resolve_line(
                menu_item.price,
                &option_prices,
                &topping_prices,
                line.quantity,
            )?;
            total_amount += pricing.total_price;

            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                menu_item_id: menu_item.id,
                item_name: menu_item.name,
                quantity: line.quantity,
                unit_price: pricing.unit_price,
                total_price: pricing.total_price,
                created_at: now,
            };
            let options = line
                .options
                .iter()
                .map(|m| OrderItemOption {
                    id: Uuid::new_v4().to_string(),
                    order_item_id: item.id.clone(),
                    name: m.name.clone(),
                    price: m.price,
                })
                .collect();
            let toppings = line
                .toppings
                .iter()
                .map(|m| OrderItemTopping {
                    id: Uuid::new_v4().to_string(),
                    order_item_id: item.id.clone(),
                    name: m.name.clone(),
                    price: m.price,
                })
                .collect();
            items.push((item, options, toppings));
        }

        let order = Order {
            id: order_id,
            store_id: store_id.to_string(),
            table_id: table_id.to_string(),
            status: OrderStatus::Pending,
            total_amount,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %order.id,
            table_id = %table_id,
            lines = lines.len(),
            total = %order.total_amount,
            "Placing order"
        );

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, store_id, table_id, status, total_amount, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(&order.store_id)
        .bind(&order.table_id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (item, options, toppings) in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, menu_item_id, item_name,
                    quantity, unit_price, total_price, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.menu_item_id)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            for option in options {
                sqlx::query(
                    r#"
                    INSERT INTO order_item_options (id, order_item_id, name, price)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(&option.id)
                .bind(&option.order_item_id)
                .bind(&option.name)
                .bind(option.price)
                .execute(&mut *tx)
                .await?;
            }
            for topping in toppings {
                sqlx::query(
                    r#"
                    INSERT INTO order_item_toppings (id, order_item_id, name, price)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(&topping.id)
                .bind(&topping.order_item_id)
                .bind(&topping.name)
                .bind(topping.price)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, store_id, table_id, status, total_amount, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// All open orders for a table with their full graphs, oldest first.
    pub async fn list_open_for_table(&self, table_id: &str) -> DbResult<Vec<OrderGraph>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, store_id, table_id, status, total_amount, created_at, updated_at
            FROM orders
            WHERE table_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        let mut graphs = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.get_items(&order.id).await?;
            let mut details = Vec::with_capacity(items.len());
            for item in items {
                let options = self.get_options(&item.id).await?;
                let toppings = self.get_toppings(&item.id).await?;
                details.push(OrderItemDetail {
                    item,
                    options,
                    toppings,
                });
            }
            graphs.push(OrderGraph {
                order,
                items: details,
            });
        }

        Ok(graphs)
    }

    /// Gets all items for an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, menu_item_id, item_name,
                   quantity, unit_price, total_price, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the options for an order item.
    pub async fn get_options(&self, order_item_id: &str) -> DbResult<Vec<OrderItemOption>> {
        let options = sqlx::query_as::<_, OrderItemOption>(
            r#"
            SELECT id, order_item_id, name, price
            FROM order_item_options
            WHERE order_item_id = ?1
            ORDER BY name
            "#,
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    /// Gets the toppings for an order item.
    pub async fn get_toppings(&self, order_item_id: &str) -> DbResult<Vec<OrderItemTopping>> {
        let toppings = sqlx::query_as::<_, OrderItemTopping>(
            r#"
            SELECT id, order_item_id, name, price
            FROM order_item_toppings
            WHERE order_item_id = ?1
            ORDER BY name
            "#,
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(toppings)
    }

    /// Marks an order delivered.
    ///
    /// Depending on aggregator policy a delivered order may already count
    /// toward daily sales, before the table checks out.
    pub async fn mark_delivered(&self, order_id: &str) -> DbResult<()> {
        debug!(id = %order_id, "Marking order delivered");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'delivered',
                updated_at = ?2
            WHERE id = ?1 AND status IN ('pending', 'preparing')
            "#,
        )
        .bind(order_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (undelivered)", order_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

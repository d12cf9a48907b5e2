//! # Archive Repository
//!
//! Read access to the immutable archive written at checkout.
//!
//! ## Immutability
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  live orders ──(checkout, one transaction)──▶ archived_* rows          │
//! │                                                                         │
//! │  The archive is the durable source of truth for historical reporting.  │
//! │  Nothing in normal operation updates or deletes these rows; only a     │
//! │  data-retention purge ever removes them. This repository is            │
//! │  accordingly read-only.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::DbResult;
use kaikei_core::{
    ArchivedOrder, ArchivedOrderItem, ArchivedOrderItemOption, ArchivedOrderItemTopping, Money,
};

/// Repository for archived-order reads.
#[derive(Debug, Clone)]
pub struct ArchiveRepository {
    pool: SqlitePool,
}

impl ArchiveRepository {
    /// Creates a new ArchiveRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ArchiveRepository { pool }
    }

    /// The archived orders of one visit, in original placement order.
    pub async fn orders_for_cycle(&self, sales_cycle_id: &str) -> DbResult<Vec<ArchivedOrder>> {
        let orders = sqlx::query_as::<_, ArchivedOrder>(
            r#"
            SELECT id, sales_cycle_id, store_id, table_id, original_order_id,
                   status, total_amount, created_at, archived_at
            FROM archived_orders
            WHERE sales_cycle_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(sales_cycle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Archived orders for a store with `archived_at` in `[from, to)`.
    ///
    /// This is the same slice the daily aggregator sums, exposed for
    /// reporting and reconciliation.
    pub async fn orders_between(
        &self,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ArchivedOrder>> {
        let orders = sqlx::query_as::<_, ArchivedOrder>(
            r#"
            SELECT id, sales_cycle_id, store_id, table_id, original_order_id,
                   status, total_amount, created_at, archived_at
            FROM archived_orders
            WHERE store_id = ?1 AND archived_at >= ?2 AND archived_at < ?3
            ORDER BY archived_at
            "#,
        )
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Gets all line items of an archived order.
    pub async fn items_for_order(
        &self,
        archived_order_id: &str,
    ) -> DbResult<Vec<ArchivedOrderItem>> {
        let items = sqlx::query_as::<_, ArchivedOrderItem>(
            r#"
            SELECT id, archived_order_id, menu_item_id, item_name,
                   quantity, unit_price, total_price, created_at
            FROM archived_order_items
            WHERE archived_order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(archived_order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the options of an archived line item.
    pub async fn options_for_item(
        &self,
        archived_order_item_id: &str,
    ) -> DbResult<Vec<ArchivedOrderItemOption>> {
        let options = sqlx::query_as::<_, ArchivedOrderItemOption>(
            r#"
            SELECT id, archived_order_item_id, name, price
            FROM archived_order_item_options
            WHERE archived_order_item_id = ?1
            ORDER BY name
            "#,
        )
        .bind(archived_order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    /// Gets the toppings of an archived line item.
    pub async fn toppings_for_item(
        &self,
        archived_order_item_id: &str,
    ) -> DbResult<Vec<ArchivedOrderItemTopping>> {
        let toppings = sqlx::query_as::<_, ArchivedOrderItemTopping>(
            r#"
            SELECT id, archived_order_item_id, name, price
            FROM archived_order_item_toppings
            WHERE archived_order_item_id = ?1
            ORDER BY name
            "#,
        )
        .bind(archived_order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(toppings)
    }

    /// Sum of archived line totals for a cycle.
    ///
    /// Must always equal the cycle's own `total_amount` (both are written by
    /// the one checkout transaction); reconciliation jobs compare the two.
    pub async fn total_for_cycle(&self, sales_cycle_id: &str) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(i.total_price), 0)
            FROM archived_order_items i
            JOIN archived_orders o ON o.id = i.archived_order_id
            WHERE o.sales_cycle_id = ?1
            "#,
        )
        .bind(sales_cycle_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_yen(total))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

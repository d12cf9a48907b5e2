//! # Menu Repository
//!
//! Database operations for the catalog - the price source for checkout
//! repricing.
//!
//! ## Deletion Policy
//! A menu item referenced by a live order line cannot be hard-deleted: the
//! FK on order_items blocks it, and the attempt surfaces as
//! `ForeignKeyViolation`. Take the item off sale with `set_available(false)`
//! instead; hard-delete only works once every referencing order has been
//! archived (archive rows carry no FK).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kaikei_core::validation::{validate_menu_item_name, validate_price};
use kaikei_core::{CoreError, MenuItem, Money};

/// Repository for menu-item database operations.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Creates a menu item.
    pub async fn create(&self, store_id: &str, name: &str, price: Money) -> DbResult<MenuItem> {
        validate_menu_item_name(name).map_err(CoreError::from)?;
        validate_price(price).map_err(CoreError::from)?;

        let now = Utc::now();
        let item = MenuItem {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            name: name.trim().to_string(),
            price,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, name = %item.name, price = %item.price, "Creating menu item");

        sqlx::query(
            r#"
            INSERT INTO menu_items (id, store_id, name, price, is_available, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.store_id)
        .bind(&item.name)
        .bind(item.price)
        .bind(item.is_available)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a menu item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT id, store_id, name, price, is_available, created_at, updated_at
            FROM menu_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists a store's catalog, name order. Set `available_only` to hide
    /// items taken off sale.
    pub async fn list_for_store(
        &self,
        store_id: &str,
        available_only: bool,
    ) -> DbResult<Vec<MenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT id, store_id, name, price, is_available, created_at, updated_at
            FROM menu_items
            WHERE store_id = ?1 AND (?2 = 0 OR is_available = 1)
            ORDER BY name
            "#,
        )
        .bind(store_id)
        .bind(available_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Changes an item's base price.
    ///
    /// Existing order lines keep their snapshots; checkout reprices against
    /// this new value.
    pub async fn update_price(&self, id: &str, price: Money) -> DbResult<()> {
        validate_price(price).map_err(CoreError::from)?;

        debug!(id = %id, price = %price, "Updating menu price");

        let result = sqlx::query(
            r#"
            UPDATE menu_items SET price = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        Ok(())
    }

    /// Puts an item on or off sale.
    pub async fn set_available(&self, id: &str, available: bool) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE menu_items SET is_available = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(available)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        Ok(())
    }

    /// Hard-deletes an item.
    ///
    /// Fails with `ForeignKeyViolation` while any live order line references
    /// it - that refusal is what keeps checkout from ever meeting a line it
    /// cannot price.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        Ok(())
    }

    /// Counts a store's menu items.
    pub async fn count_for_store(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM menu_items WHERE store_id = ?1")
                .bind(store_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

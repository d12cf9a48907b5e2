//! # Store Repository
//!
//! Database operations for stores.
//!
//! A store is the tenant boundary: every table, menu item, order, and daily
//! sales row hangs off a store id, and every accounting-day boundary is
//! computed in the store's timezone.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kaikei_core::validation::{validate_store_name, validate_timezone};
use kaikei_core::{CoreError, Store};

/// Repository for store database operations.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Creates a store.
    ///
    /// ## Arguments
    /// * `name` - Display name
    /// * `timezone` - IANA timezone name ("Asia/Tokyo")
    pub async fn create(&self, name: &str, timezone: &str) -> DbResult<Store> {
        validate_store_name(name).map_err(CoreError::from)?;
        validate_timezone(timezone).map_err(CoreError::from)?;

        let store = Store {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            timezone: timezone.to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %store.id, name = %store.name, "Creating store");

        sqlx::query(
            r#"
            INSERT INTO stores (id, name, timezone, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.timezone)
        .bind(store.created_at)
        .execute(&self.pool)
        .await?;

        Ok(store)
    }

    /// Gets a store by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, timezone, created_at
            FROM stores
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(store)
    }

    /// Gets a store by ID, erroring when it does not exist.
    pub async fn get_required(&self, id: &str) -> DbResult<Store> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Store", id))
    }

    /// Lists all stores, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, timezone, created_at
            FROM stores
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    /// Counts stores.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

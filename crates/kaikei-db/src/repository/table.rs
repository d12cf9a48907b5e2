//! # Table Repository
//!
//! Database operations for dining tables.
//!
//! ## The Checkout-Request Flag
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Customer taps "お会計" on the table terminal                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  request_checkout() → checkout_requested = 1, timestamp set            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Staff sees the raised flag, walks over, runs checkout                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutArchiver clears the flag in the SAME transaction that         │
//! │  archives the orders - the flag can never point at an already-         │
//! │  archived table.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kaikei_core::validation::validate_table_number;
use kaikei_core::{CoreError, DiningTable};

/// Repository for dining-table database operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    /// Creates a new TableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Creates a table.
    ///
    /// ## Arguments
    /// * `table_number` - Business identifier printed on the table tent,
    ///   unique per store
    pub async fn create(
        &self,
        store_id: &str,
        table_number: i64,
        capacity: i64,
        area: Option<&str>,
    ) -> DbResult<DiningTable> {
        validate_table_number(table_number).map_err(CoreError::from)?;

        let table = DiningTable {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            table_number,
            capacity,
            area: area.map(str::to_string),
            checkout_requested: false,
            checkout_requested_at: None,
            created_at: Utc::now(),
        };

        debug!(id = %table.id, table_number, "Creating table");

        sqlx::query(
            r#"
            INSERT INTO dining_tables (
                id, store_id, table_number, capacity, area,
                checkout_requested, checkout_requested_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&table.id)
        .bind(&table.store_id)
        .bind(table.table_number)
        .bind(table.capacity)
        .bind(&table.area)
        .bind(table.checkout_requested)
        .bind(table.checkout_requested_at)
        .bind(table.created_at)
        .execute(&self.pool)
        .await?;

        Ok(table)
    }

    /// Gets a table by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiningTable>> {
        let table = sqlx::query_as::<_, DiningTable>(
            r#"
            SELECT id, store_id, table_number, capacity, area,
                   checkout_requested, checkout_requested_at, created_at
            FROM dining_tables
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    /// Gets a table by its business identifier.
    pub async fn get_by_number(
        &self,
        store_id: &str,
        table_number: i64,
    ) -> DbResult<Option<DiningTable>> {
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
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    /// Lists a store's tables in table-number order.
    pub async fn list_for_store(&self, store_id: &str) -> DbResult<Vec<DiningTable>> {
        let tables = sqlx::query_as::<_, DiningTable>(
            r#"
            SELECT id, store_id, table_number, capacity, area,
                   checkout_requested, checkout_requested_at, created_at
            FROM dining_tables
            WHERE store_id = ?1
            ORDER BY table_number
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// Raises the checkout-request flag on a table.
    ///
    /// Idempotent: a second tap just refreshes the timestamp.
    pub async fn request_checkout(&self, store_id: &str, table_number: i64) -> DbResult<()> {
        debug!(store_id = %store_id, table_number, "Checkout requested");

        let result = sqlx::query(
            r#"
            UPDATE dining_tables SET
                checkout_requested = 1,
                checkout_requested_at = ?3
            WHERE store_id = ?1 AND table_number = ?2
            "#,
        )
        .bind(store_id)
        .bind(table_number)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::table_not_found(store_id, table_number));
        }

        Ok(())
    }

    /// Tables with the checkout flag raised, oldest request first.
    pub async fn list_checkout_requested(&self, store_id: &str) -> DbResult<Vec<DiningTable>> {
        let tables = sqlx::query_as::<_, DiningTable>(
            r#"
            SELECT id, store_id, table_number, capacity, area,
                   checkout_requested, checkout_requested_at, created_at
            FROM dining_tables
            WHERE store_id = ?1 AND checkout_requested = 1
            ORDER BY checkout_requested_at
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.stores().create("店", "Asia/Tokyo").await.unwrap();
        (db, store.id)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (db, store) = setup().await;

        let created = db
            .tables()
            .create(&store, 5, 4, Some("tatami"))
            .await
            .unwrap();

        let by_number = db.tables().get_by_number(&store, 5).await.unwrap().unwrap();
        assert_eq!(by_number.id, created.id);
        assert_eq!(by_number.area.as_deref(), Some("tatami"));
        assert!(!by_number.checkout_requested);
    }

    #[tokio::test]
    async fn test_duplicate_table_number_rejected() {
        let (db, store) = setup().await;

        db.tables().create(&store, 5, 4, None).await.unwrap();
        let err = db.tables().create(&store, 5, 2, None).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_same_number_allowed_across_stores() {
        let (db, store_a) = setup().await;
        let store_b = db.stores().create("支店", "Asia/Tokyo").await.unwrap().id;

        db.tables().create(&store_a, 5, 4, None).await.unwrap();
        db.tables().create(&store_b, 5, 4, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_checkout_sets_flag() {
        let (db, store) = setup().await;

        db.tables().create(&store, 5, 4, None).await.unwrap();
        db.tables().request_checkout(&store, 5).await.unwrap();

        let table = db.tables().get_by_number(&store, 5).await.unwrap().unwrap();
        assert!(table.checkout_requested);
        assert!(table.checkout_requested_at.is_some());

        let flagged = db.tables().list_checkout_requested(&store).await.unwrap();
        assert_eq!(flagged.len(), 1);
    }

    #[tokio::test]
    async fn test_request_checkout_unknown_table() {
        let (db, store) = setup().await;

        let err = db.tables().request_checkout(&store, 99).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::TableNotFound { table_number: 99, .. }
        ));
    }
}

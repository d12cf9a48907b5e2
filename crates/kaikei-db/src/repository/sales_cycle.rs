//! # Sales Cycle Repository
//!
//! Read access to sales cycles (one row per visit to a table).
//!
//! ## Who Writes These Rows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cycles are created and completed by the checkout transaction          │
//! │  (checkout.rs), never through this repository:                         │
//! │                                                                         │
//! │    checkout ──▶ INSERT active cycle ──▶ archive orders ──▶ UPDATE      │
//! │                 (same transaction)                    completed        │
//! │                                                                         │
//! │  The `cancelled` status exists for manual correction tooling; normal   │
//! │  operation only ever produces active → completed, exactly once.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::DbResult;
use kaikei_core::SalesCycle;

/// Repository for sales-cycle reads.
#[derive(Debug, Clone)]
pub struct SalesCycleRepository {
    pool: SqlitePool,
}

impl SalesCycleRepository {
    /// Creates a new SalesCycleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SalesCycleRepository { pool }
    }

    /// Gets a cycle by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SalesCycle>> {
        let cycle = sqlx::query_as::<_, SalesCycle>(
            r#"
            SELECT id, store_id, table_id, cycle_number, total_amount,
                   total_items, status, started_at, completed_at
            FROM sales_cycles
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cycle)
    }

    /// The visit history of one table, most recent first.
    pub async fn list_for_table(&self, table_id: &str) -> DbResult<Vec<SalesCycle>> {
        let cycles = sqlx::query_as::<_, SalesCycle>(
            r#"
            SELECT id, store_id, table_id, cycle_number, total_amount,
                   total_items, status, started_at, completed_at
            FROM sales_cycles
            WHERE table_id = ?1
            ORDER BY started_at DESC
            "#,
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cycles)
    }

    /// The still-active cycle for a table, if one exists.
    ///
    /// Normally `None`: checkout completes the cycle in the transaction that
    /// creates it. A lingering active row means an interrupted flow.
    pub async fn active_for_table(&self, table_id: &str) -> DbResult<Option<SalesCycle>> {
        let cycle = sqlx::query_as::<_, SalesCycle>(
            r#"
            SELECT id, store_id, table_id, cycle_number, total_amount,
                   total_items, status, started_at, completed_at
            FROM sales_cycles
            WHERE table_id = ?1 AND status = 'active'
            "#,
        )
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cycle)
    }

    /// Completed cycles for a store in `[from, to)`, by completion time.
    pub async fn list_completed_between(
        &self,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<SalesCycle>> {
        let cycles = sqlx::query_as::<_, SalesCycle>(
            r#"
            SELECT id, store_id, table_id, cycle_number, total_amount,
                   total_items, status, started_at, completed_at
            FROM sales_cycles
            WHERE store_id = ?1
              AND completed_at IS NOT NULL
              AND completed_at >= ?2
              AND completed_at < ?3
            ORDER BY completed_at
            "#,
        )
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(cycles)
    }

    /// Number of cycles recorded for a store.
    pub async fn count_for_store(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales_cycles WHERE store_id = ?1")
                .bind(store_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

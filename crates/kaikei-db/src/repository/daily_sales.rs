//! # Daily Sales Repository
//!
//! Read access to per-business-day sales aggregates.
//!
//! Rows are written by `DailySalesAggregator` (aggregate.rs) and unique per
//! `(store_id, business_date)`. A date with no row simply hasn't been
//! recomputed yet - absence is not zero sales.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::DbResult;
use kaikei_core::DailySales;

/// Repository for daily-sales reads.
#[derive(Debug, Clone)]
pub struct DailySalesRepository {
    pool: SqlitePool,
}

impl DailySalesRepository {
    /// Creates a new DailySalesRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DailySalesRepository { pool }
    }

    /// The aggregate for one business date, if it has been computed.
    pub async fn get(&self, store_id: &str, business_date: NaiveDate) -> DbResult<Option<DailySales>> {
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
        .bind(business_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Aggregates for business dates in `[from, to]`, oldest first.
    pub async fn list_range(
        &self,
        store_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<DailySales>> {
        let rows = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT id, store_id, business_date, total_orders, total_items,
                   total_amount, tax_amount, period_start, period_end,
                   is_finalized, created_at, updated_at
            FROM daily_sales
            WHERE store_id = ?1 AND business_date >= ?2 AND business_date <= ?3
            ORDER BY business_date
            "#,
        )
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

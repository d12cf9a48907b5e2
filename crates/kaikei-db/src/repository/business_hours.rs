//! # Business Hours Repository
//!
//! Database operations for store operating schedules.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  business_hours                                                         │
//! │                                                                         │
//! │  store_id  day_of_week  open_time  close_time  crosses_midnight        │
//! │  ────────  ───────────  ─────────  ──────────  ────────────────        │
//! │  S1        NULL         17:00      02:00       1     ← default         │
//! │  S1        5 (Fri)      17:00      04:00       1     ← override        │
//! │                                                                         │
//! │  Input may use staff notation ("26:00"); rows are stored normalized    │
//! │  and the notation is reconstructed at the display edge.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Which Row Applies?
//! The weekday override is keyed by the *business date's* weekday, not the
//! civil weekday of the instant: at 00:20 on Saturday night the store is
//! still running Friday's schedule.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::store::StoreRepository;
use kaikei_core::hours::{format_overflow_time, BusinessHours};
use kaikei_core::validation::validate_day_of_week;
use kaikei_core::{civil_date, CoreError, StoreHours};

/// Repository for business-hours database operations.
#[derive(Debug, Clone)]
pub struct BusinessHoursRepository {
    pool: SqlitePool,
}

impl BusinessHoursRepository {
    /// Creates a new BusinessHoursRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessHoursRepository { pool }
    }

    /// Creates or replaces the schedule row for (store, weekday).
    ///
    /// ## Arguments
    /// * `day_of_week` - None for the store default, or 0 (Sunday) - 6 (Saturday)
    /// * `open` - "HH:MM", must be a plain 00:00-23:59 time
    /// * `close` - "HH:MM", may use overflow notation up to "29:59"
    pub async fn upsert(
        &self,
        store_id: &str,
        day_of_week: Option<i64>,
        open: &str,
        close: &str,
    ) -> DbResult<StoreHours> {
        validate_day_of_week(day_of_week).map_err(CoreError::from)?;

        // Load the store first: validates existence and gives the timezone
        // needed to parse hours.
        let store = StoreRepository::new(self.pool.clone())
            .get_required(store_id)
            .await?;
        let hours = BusinessHours::from_strings(open, close, store.tz()?)?;

        let open_time = hours.open_display();
        let close_time = format_overflow_time(hours.close, false);
        let now = Utc::now();

        debug!(
            store_id = %store_id,
            day_of_week = ?day_of_week,
            open = %open_time,
            close = %close_time,
            crosses_midnight = hours.crosses_midnight,
            "Upserting business hours"
        );

        // UPDATE first, INSERT when no row matched. `IS` compares NULL as a
        // value, which ON CONFLICT cannot do against the expression index.
        let updated = sqlx::query(
            r#"
            UPDATE business_hours SET
                open_time = ?3,
                close_time = ?4,
                crosses_midnight = ?5,
                updated_at = ?6
            WHERE store_id = ?1 AND day_of_week IS ?2
            "#,
        )
        .bind(store_id)
        .bind(day_of_week)
        .bind(&open_time)
        .bind(&close_time)
        .bind(hours.crosses_midnight)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO business_hours (
                    id, store_id, day_of_week,
                    open_time, close_time, crosses_midnight,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(store_id)
            .bind(day_of_week)
            .bind(&open_time)
            .bind(&close_time)
            .bind(hours.crosses_midnight)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }

        let row = sqlx::query_as::<_, StoreHours>(
            r#"
            SELECT id, store_id, day_of_week, open_time, close_time,
                   crosses_midnight, created_at, updated_at
            FROM business_hours
            WHERE store_id = ?1 AND day_of_week IS ?2
            "#,
        )
        .bind(store_id)
        .bind(day_of_week)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists a store's schedule rows, default row first.
    pub async fn list_for_store(&self, store_id: &str) -> DbResult<Vec<StoreHours>> {
        let rows = sqlx::query_as::<_, StoreHours>(
            r#"
            SELECT id, store_id, day_of_week, open_time, close_time,
                   crosses_midnight, created_at, updated_at
            FROM business_hours
            WHERE store_id = ?1
            ORDER BY COALESCE(day_of_week, -1)
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Removes a schedule row.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM business_hours WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StoreHours", id));
        }

        Ok(())
    }

    /// The schedule in force on a known business date.
    ///
    /// Prefers the weekday override, falls back to the default row, and
    /// returns None when the store has no schedule configured at all.
    pub async fn effective_for_date(
        &self,
        store_id: &str,
        tz: Tz,
        date: NaiveDate,
    ) -> DbResult<Option<BusinessHours>> {
        let mut conn = self.pool.acquire().await?;
        effective_for_date_on(&mut conn, store_id, tz, date).await
    }

    /// The schedule in force at an instant.
    pub async fn effective_at(
        &self,
        store_id: &str,
        tz: Tz,
        instant: DateTime<Utc>,
    ) -> DbResult<Option<BusinessHours>> {
        let mut conn = self.pool.acquire().await?;
        effective_at_on(&mut conn, store_id, tz, instant).await
    }

    /// The business date an instant belongs to.
    ///
    /// A 25:30 sale lands on the previous calendar date. Stores with no
    /// configured hours degrade to the plain calendar date in their
    /// timezone (midnight boundary).
    pub async fn accounting_date(
        &self,
        store_id: &str,
        instant: DateTime<Utc>,
    ) -> DbResult<NaiveDate> {
        let store = StoreRepository::new(self.pool.clone())
            .get_required(store_id)
            .await?;
        let tz = store.tz()?;

        let mut conn = self.pool.acquire().await?;
        match effective_at_on(&mut conn, store_id, tz, instant).await? {
            Some(hours) => Ok(hours.accounting_date(instant)),
            None => Ok(civil_date(tz, instant)),
        }
    }
}

// =============================================================================
// Connection-Scoped Resolution
// =============================================================================
// The checkout transaction resolves the schedule on its own connection so the
// decision rides the transaction snapshot; the repository methods above reuse
// these with a pooled connection.

/// [`BusinessHoursRepository::effective_for_date`] against one connection.
pub(crate) async fn effective_for_date_on(
    conn: &mut SqliteConnection,
    store_id: &str,
    tz: Tz,
    date: NaiveDate,
) -> DbResult<Option<BusinessHours>> {
    let weekday = date.weekday().num_days_from_sunday() as i64;

    let row = sqlx::query_as::<_, StoreHours>(
        r#"
        SELECT id, store_id, day_of_week, open_time, close_time,
               crosses_midnight, created_at, updated_at
        FROM business_hours
        WHERE store_id = ?1 AND (day_of_week = ?2 OR day_of_week IS NULL)
        ORDER BY day_of_week IS NULL
        LIMIT 1
        "#,
    )
    .bind(store_id)
    .bind(weekday)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(row.to_business_hours(tz)?)),
        None => Ok(None),
    }
}

/// [`BusinessHoursRepository::effective_at`] against one connection.
///
/// The business date must be known before the override can be picked, so the
/// candidate date is computed from the default schedule (or the civil date
/// when no default exists), then resolved against overrides.
pub(crate) async fn effective_at_on(
    conn: &mut SqliteConnection,
    store_id: &str,
    tz: Tz,
    instant: DateTime<Utc>,
) -> DbResult<Option<BusinessHours>> {
    let default_row = sqlx::query_as::<_, StoreHours>(
        r#"
        SELECT id, store_id, day_of_week, open_time, close_time,
               crosses_midnight, created_at, updated_at
        FROM business_hours
        WHERE store_id = ?1 AND day_of_week IS NULL
        "#,
    )
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    let candidate_date = match &default_row {
        Some(row) => row.to_business_hours(tz)?.accounting_date(instant),
        None => civil_date(tz, instant),
    };

    effective_for_date_on(conn, store_id, tz, candidate_date).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono_tz::Asia::Tokyo;

    async fn store_id(db: &Database) -> String {
        db.stores().create("店", "Asia/Tokyo").await.unwrap().id
    }

    #[tokio::test]
    async fn test_upsert_normalizes_overflow_close() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        let row = db
            .business_hours()
            .upsert(&store, None, "17:00", "26:00")
            .await
            .unwrap();

        assert_eq!(row.open_time, "17:00");
        assert_eq!(row.close_time, "02:00");
        assert!(row.crosses_midnight);
        assert_eq!(row.close_display().unwrap(), "26:00");
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        let first = db
            .business_hours()
            .upsert(&store, None, "17:00", "23:00")
            .await
            .unwrap();
        let second = db
            .business_hours()
            .upsert(&store, None, "17:00", "26:00")
            .await
            .unwrap();

        // Same row, new schedule.
        assert_eq!(first.id, second.id);
        assert!(second.crosses_midnight);
        assert_eq!(db.business_hours().list_for_store(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        // Overflow notation is for closes only.
        assert!(db
            .business_hours()
            .upsert(&store, None, "25:00", "29:00")
            .await
            .is_err());

        // Weekday out of range.
        assert!(db
            .business_hours()
            .upsert(&store, Some(7), "17:00", "23:00")
            .await
            .is_err());

        // Unknown store.
        assert!(db
            .business_hours()
            .upsert("nope", None, "17:00", "23:00")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_weekday_override_beats_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        db.business_hours()
            .upsert(&store, None, "17:00", "23:00")
            .await
            .unwrap();
        // Friday runs late.
        db.business_hours()
            .upsert(&store, Some(5), "17:00", "26:00")
            .await
            .unwrap();

        // 2025-06-13 is a Friday, 2025-06-16 is a Monday.
        let friday = db
            .business_hours()
            .effective_for_date(&store, Tokyo, "2025-06-13".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(friday.crosses_midnight);

        let monday = db
            .business_hours()
            .effective_for_date(&store, Tokyo, "2025-06-16".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!monday.crosses_midnight);
    }

    #[tokio::test]
    async fn test_effective_at_uses_business_date_weekday() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        db.business_hours()
            .upsert(&store, None, "17:00", "23:00")
            .await
            .unwrap();
        db.business_hours()
            .upsert(&store, Some(5), "17:00", "26:00")
            .await
            .unwrap();

        // 00:20 JST Saturday Jun 14 = 15:20 UTC Friday Jun 13. The civil
        // weekday is Saturday, but the operating night is still Friday's.
        let instant = "2025-06-13T15:20:00Z".parse().unwrap();
        let hours = db
            .business_hours()
            .effective_at(&store, Tokyo, instant)
            .await
            .unwrap()
            .unwrap();

        assert!(hours.crosses_midnight);
        assert_eq!(hours.close_display(), "26:00");
    }

    #[tokio::test]
    async fn test_no_schedule_returns_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        let hours = db
            .business_hours()
            .effective_at(&store, Tokyo, Utc::now())
            .await
            .unwrap();
        assert!(hours.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        let row = db
            .business_hours()
            .upsert(&store, None, "17:00", "23:00")
            .await
            .unwrap();

        db.business_hours().remove(&row.id).await.unwrap();
        assert!(db.business_hours().remove(&row.id).await.is_err());
    }

    #[tokio::test]
    async fn test_accounting_date_late_night_and_degraded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_id(&db).await;

        // 00:20 JST on civil Jun 13.
        let instant: DateTime<Utc> = "2025-06-12T15:20:00Z".parse().unwrap();

        // No schedule yet: plain calendar date.
        let degraded = db
            .business_hours()
            .accounting_date(&store, instant)
            .await
            .unwrap();
        assert_eq!(degraded, "2025-06-13".parse::<NaiveDate>().unwrap());

        // With a 17:00-26:00 night, the same instant belongs to Jun 12.
        db.business_hours()
            .upsert(&store, None, "17:00", "26:00")
            .await
            .unwrap();
        let business = db
            .business_hours()
            .accounting_date(&store, instant)
            .await
            .unwrap();
        assert_eq!(business, "2025-06-12".parse::<NaiveDate>().unwrap());
    }
}

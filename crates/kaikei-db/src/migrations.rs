//! # Database Migrations
//!
//! The schema ships inside the binary: `sqlx::migrate!` embeds every file
//! under `migrations/sqlite/` at compile time, and [`run_migrations`] applies
//! whatever is still pending against the `_sqlx_migrations` ledger table.
//! [`Database::new`](crate::pool::Database::new) calls it on every connect, so
//! a fresh database file becomes a fully-formed Kaikei schema (stores and
//! hours, the live order graph, the archive graph, daily sales) before the
//! first repository call.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `002_add_payment_methods.sql`)
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones
//!
//! Checksums of applied files are recorded; editing `001_initial_schema.sql`
//! after a database has been created makes every subsequent startup fail
//! verification.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded from `migrations/sqlite/` at the workspace root.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations, creating the ledger table if needed.
///
/// Idempotent and ordered: each migration runs once, in filename order,
/// inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Reports `(embedded, applied)` migration counts for diagnostics.
///
/// The two are equal on a healthy database. A missing ledger table reads as
/// zero applied, not as an error.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}

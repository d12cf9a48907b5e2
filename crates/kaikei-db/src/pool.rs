//! # Database Handle and Pool
//!
//! One [`Database`] per process: it owns the SQLite pool, applies migrations
//! on connect, and hands out the narrow views everything else works through.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path) ──► Database::new(config).await                    │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                    ┌─────────────────────┐                              │
//! │                    │     SqlitePool      │  WAL, NORMAL sync,           │
//! │                    │  Conn1 Conn2 Conn3… │  foreign keys ON,            │
//! │                    └─────────────────────┘  busy_timeout                │
//! │                               │                                         │
//! │          concurrent access from hall terminals                          │
//! │                               ▼                                         │
//! │  Order intake ──► db.orders()                                           │
//! │  Checkout     ──► db.archiver()    (two checkouts of the same table     │
//! │  Daily close  ──► db.aggregator()   serialize on the row write lock)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL journaling lets waiters keep browsing order history while a checkout
//! transaction writes; `busy_timeout` makes a second simultaneous writer wait
//! its turn instead of erroring.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use kaikei_core::Clock;

use crate::aggregate::{AggregatorConfig, DailySalesAggregator};
use crate::checkout::CheckoutArchiver;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::archive::ArchiveRepository;
use crate::repository::business_hours::BusinessHoursRepository;
use crate::repository::daily_sales::DailySalesRepository;
use crate::repository::menu::MenuRepository;
use crate::repository::order::OrderRepository;
use crate::repository::sales_cycle::SalesCycleRepository;
use crate::repository::store::StoreRepository;
use crate::repository::table::TableRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings, built fluently.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/kaikei/kaikei.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file (created on first connect).
    pub database_path: PathBuf,

    /// Pool ceiling. Default 5, plenty for one store's worth of terminals.
    pub max_connections: u32,

    /// Connections kept warm. Default 1.
    pub min_connections: u32,

    /// How long `acquire` waits for a free connection. Default 30s.
    pub connect_timeout: Duration,

    /// Idle time before a pooled connection is dropped. Default 10 minutes.
    pub idle_timeout: Duration,

    /// How long a connection waits on SQLite's write lock before giving up.
    /// Simultaneous checkouts of the same table ride on this.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to apply pending migrations on connect. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Settings for a database file at `path`, with production defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// An isolated in-memory database, the default fixture in tests.
    ///
    /// Every `:memory:` connection is its own database, so the pool is
    /// pinned to a single connection to keep all queries on the same one.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and service access.
///
/// ## Design: One Handle, Narrow Views
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Callers hold one Database and take the narrow view they need:          │
/// │                                                                         │
/// │  db.orders()       ← order intake                                      │
/// │  db.tables()       ← seating + checkout-request flag                   │
/// │  db.archiver()     ← the checkout transaction                          │
/// │  db.aggregator(…)  ← daily sales recompute / finalize                  │
/// │                                                                         │
/// │  Benefits:                                                              │
/// │  • Call sites read as intent, not SQL                                  │
/// │  • Each view is cheap (pool handle clone)                              │
/// │  • Tests construct only what they exercise                             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Connects, configures SQLite, and applies pending migrations.
    ///
    /// The file is created if absent. Journal mode is WAL with NORMAL
    /// synchronous, foreign keys are switched on (SQLite defaults them off),
    /// and `busy_timeout` is installed on every connection so competing
    /// writers queue instead of erroring.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::new("./kaikei.db")).await?;
    /// ```
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL is durable against corruption; a crash may lose the
            // final transaction, which a recompute repairs
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly; `new()` already
    /// does so unless `run_migrations(false)` was configured.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// The raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the store repository.
    pub fn stores(&self) -> StoreRepository {
        StoreRepository::new(self.pool.clone())
    }

    /// Returns the business-hours repository.
    pub fn business_hours(&self) -> BusinessHoursRepository {
        BusinessHoursRepository::new(self.pool.clone())
    }

    /// Returns the menu repository.
    pub fn menu(&self) -> MenuRepository {
        MenuRepository::new(self.pool.clone())
    }

    /// Returns the dining-table repository.
    pub fn tables(&self) -> TableRepository {
        TableRepository::new(self.pool.clone())
    }

    /// Returns the order repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let order = db.orders().place_order(&store_id, &table_id, &lines).await?;
    /// ```
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Returns the sales-cycle repository.
    pub fn sales_cycles(&self) -> SalesCycleRepository {
        SalesCycleRepository::new(self.pool.clone())
    }

    /// Returns the archive repository (read-only history views).
    pub fn archive(&self) -> ArchiveRepository {
        ArchiveRepository::new(self.pool.clone())
    }

    /// Returns the daily-sales repository (read side of aggregates).
    pub fn daily_sales(&self) -> DailySalesRepository {
        DailySalesRepository::new(self.pool.clone())
    }

    /// Returns the checkout archiver on the system clock.
    pub fn archiver(&self) -> CheckoutArchiver {
        CheckoutArchiver::new(self.pool.clone())
    }

    /// Returns a checkout archiver on an injected clock (tests pin time).
    pub fn archiver_with(&self, clock: Arc<dyn Clock>) -> CheckoutArchiver {
        CheckoutArchiver::with_clock(self.pool.clone(), clock)
    }

    /// Returns the daily-sales aggregator on the system clock.
    pub fn aggregator(&self, config: AggregatorConfig) -> DailySalesAggregator {
        DailySalesAggregator::new(self.pool.clone(), config)
    }

    /// Returns a daily-sales aggregator on an injected clock.
    pub fn aggregator_with(
        &self,
        clock: Arc<dyn Clock>,
        config: AggregatorConfig,
    ) -> DailySalesAggregator {
        DailySalesAggregator::with_clock(self.pool.clone(), clock, config)
    }

    /// Closes the pool on shutdown. Every view handed out earlier fails
    /// after this.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// True when the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Returns `(total, applied)` migration counts for diagnostics.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

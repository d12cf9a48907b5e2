//! # kaikei-db: Database Layer for Kaikei
//!
//! This crate provides database access for the Kaikei accounting engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kaikei Data Flow                                 │
//! │                                                                         │
//! │  Caller (API route / seed binary / test)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kaikei-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │   Engines    │  │   │
//! │  │   │   (pool.rs)   │    │ (repository/) │    │              │  │   │
//! │  │   │               │    │               │    │ checkout.rs  │  │   │
//! │  │   │ SqlitePool    │◄───│ StoreRepo     │    │ aggregate.rs │  │   │
//! │  │   │ WAL + busy_   │    │ OrderRepo     │◄───│              │  │   │
//! │  │   │ timeout       │    │ ArchiveRepo   │    │ one-tx each  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   Pure date/money/pricing rules come from kaikei-core; this    │   │
//! │  │   crate only adds persistence and transactions around them.    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   live graph │ sales_cycles │ archive │ daily_sales            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (store, menu, order, etc.)
//! - [`checkout`] - The checkout archival transaction
//! - [`aggregate`] - Daily sales recomputation and finalization
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kaikei_db::{AggregatorConfig, Database, DbConfig};
//!
//! // Create database with default config (runs migrations)
//! let db = Database::new(DbConfig::new("path/to/kaikei.db")).await?;
//!
//! // Seed a store and close out a table
//! let store = db.stores().create("炉ばた 甚八", "Asia/Tokyo").await?;
//! db.business_hours().upsert(&store.id, None, "17:00", "26:00").await?;
//! // ... tables, menu, orders ...
//! let result = db.archiver().checkout(&store.id, 5).await?;
//!
//! // Roll the night into daily sales
//! let aggregator = db.aggregator(AggregatorConfig::default());
//! let sales = aggregator.recompute_current(&store.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Engine re-exports for convenience
pub use aggregate::{AggregatorConfig, DailySalesAggregator};
pub use checkout::CheckoutArchiver;

// Repository re-exports for convenience
pub use repository::archive::ArchiveRepository;
pub use repository::business_hours::BusinessHoursRepository;
pub use repository::daily_sales::DailySalesRepository;
pub use repository::menu::MenuRepository;
pub use repository::order::{LineModifier, NewOrderLine, OrderRepository};
pub use repository::sales_cycle::SalesCycleRepository;
pub use repository::store::StoreRepository;
pub use repository::table::TableRepository;

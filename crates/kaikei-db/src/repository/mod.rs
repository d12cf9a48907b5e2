//! # Repository Module
//!
//! Database repository implementations for Kaikei.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.orders().place_order(&store_id, &table_id, &lines)         │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── place_order(&self, store_id, table_id, lines)                     │
//! │  ├── mark_delivered(&self, order_id)                                   │
//! │  └── list_open_for_table(&self, table_id)                              │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Multi-step flows that must commit or abort as one - the checkout      │
//! │  archival, the daily-sales recompute - live above the repositories     │
//! │  in checkout.rs / aggregate.rs and drive a single transaction.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`store::StoreRepository`] - Store CRUD
//! - [`business_hours::BusinessHoursRepository`] - Operating schedules
//! - [`menu::MenuRepository`] - Catalog reads/writes for the pricing resolver
//! - [`table::TableRepository`] - Seating and the checkout-request flag
//! - [`order::OrderRepository`] - Live order graph intake
//! - [`sales_cycle::SalesCycleRepository`] - Visit history reads
//! - [`archive::ArchiveRepository`] - Immutable checkout history
//! - [`daily_sales::DailySalesRepository`] - Aggregate rows (read side)

pub mod archive;
pub mod business_hours;
pub mod daily_sales;
pub mod menu;
pub mod order;
pub mod sales_cycle;
pub mod store;
pub mod table;

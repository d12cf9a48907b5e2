//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── Inside the checkout transaction, mutation-phase errors       │
//! │       │   are wrapped once more as CheckoutFailed { source }           │
//! │       ▼                                                                 │
//! │  Caller (hall terminal / daily close screen)                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use kaikei_core::CoreError;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// No table with that number exists in the store.
    #[error("Table {table_number} not found in store {store_id}")]
    TableNotFound {
        store_id: String,
        table_number: i64,
    },

    /// An open order references a menu item that no longer exists.
    ///
    /// ## When This Occurs
    /// The catalog refuses to hard-delete a referenced item (FK on
    /// order_items), so this should never fire. If it does anyway, checkout
    /// fails loudly instead of silently pricing the line at zero.
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    /// The item exists but is flagged sold out / off menu.
    ///
    /// Order intake enforces the availability flag server-side; the terminal
    /// UI filtering its menu list is not enough.
    #[error("Menu item '{name}' is not currently available")]
    MenuItemUnavailable { id: String, name: String },

    /// The daily sales row is finalized and refuses recomputation.
    #[error("Daily sales for store {store_id} on {business_date} are already finalized")]
    AlreadyFinalized {
        store_id: String,
        business_date: NaiveDate,
    },

    /// The checkout transaction aborted; nothing was mutated.
    ///
    /// ## When This Occurs
    /// Any failure after checkout starts mutating (cycle writes, archive
    /// inserts, deletes, table reset, commit). The original cause rides
    /// along for diagnostics. The table is left exactly as it was - safe to
    /// show "retry" to staff.
    #[error("Checkout failed: {source}")]
    CheckoutFailed {
        #[source]
        source: Box<DbError>,
    },

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Creating a duplicate table number in a store
    /// - Second schedule row for the same (store, weekday)
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent store_id / table_id
    /// - Deleting a menu item an open order still references
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Domain-rule failure surfaced from kaikei-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a TableNotFound error.
    pub fn table_not_found(store_id: impl Into<String>, table_number: i64) -> Self {
        DbError::TableNotFound {
            store_id: store_id.into(),
            table_number,
        }
    }

    /// Wraps a mutation-phase failure of the checkout transaction.
    pub fn checkout_failed(source: DbError) -> Self {
        DbError::CheckoutFailed {
            source: Box::new(source),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error codes for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

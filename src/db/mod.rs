//! Database layer
//!
//! SQLite (default) and MySQL are both supported behind the `DatabasePool`
//! trait; the driver is selected from configuration.
//!
//! # Usage
//!
//! ```ignore
//! use planetarium::config::DatabaseConfig;
//! use planetarium::db::{create_pool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Whether an error (anywhere in its context chain) is a unique-constraint
/// violation reported by the database.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}

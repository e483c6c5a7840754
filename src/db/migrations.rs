//! Database migrations module
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! backend, and applied in version order at startup.
//!
//! # Usage
//!
//! ```ignore
//! use planetarium::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Applied versions are recorded in the `_migrations` table, so running the
//! migrations twice is a no-op.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations of the planetarium schema.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'visitor',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'visitor',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_email ON users(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_show_themes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS show_themes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS show_themes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_astronomy_shows",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS astronomy_shows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                title_lower TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT ''
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS astronomy_shows (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                title_lower TEXT NOT NULL,
                description TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_astronomy_show_themes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS astronomy_show_themes (
                astronomy_show_id INTEGER NOT NULL,
                show_theme_id INTEGER NOT NULL,
                PRIMARY KEY (astronomy_show_id, show_theme_id),
                FOREIGN KEY (astronomy_show_id) REFERENCES astronomy_shows(id) ON DELETE CASCADE,
                FOREIGN KEY (show_theme_id) REFERENCES show_themes(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_astronomy_show_themes_theme ON astronomy_show_themes(show_theme_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS astronomy_show_themes (
                astronomy_show_id BIGINT NOT NULL,
                show_theme_id BIGINT NOT NULL,
                PRIMARY KEY (astronomy_show_id, show_theme_id),
                FOREIGN KEY (astronomy_show_id) REFERENCES astronomy_shows(id) ON DELETE CASCADE,
                FOREIGN KEY (show_theme_id) REFERENCES show_themes(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_astronomy_show_themes_theme ON astronomy_show_themes(show_theme_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_planetarium_domes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS planetarium_domes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL UNIQUE,
                rows_count INTEGER NOT NULL CHECK (rows_count > 0),
                seats_in_row INTEGER NOT NULL CHECK (seats_in_row > 0)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS planetarium_domes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL UNIQUE,
                rows_count INT NOT NULL CHECK (rows_count > 0),
                seats_in_row INT NOT NULL CHECK (seats_in_row > 0)
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_show_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS show_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                astronomy_show_id INTEGER NOT NULL,
                planetarium_dome_id INTEGER NOT NULL,
                show_time TIMESTAMP NOT NULL,
                FOREIGN KEY (astronomy_show_id) REFERENCES astronomy_shows(id) ON DELETE CASCADE,
                FOREIGN KEY (planetarium_dome_id) REFERENCES planetarium_domes(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_show_sessions_show ON show_sessions(astronomy_show_id);
            CREATE INDEX IF NOT EXISTS idx_show_sessions_time ON show_sessions(show_time);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS show_sessions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                astronomy_show_id BIGINT NOT NULL,
                planetarium_dome_id BIGINT NOT NULL,
                show_time DATETIME NOT NULL,
                FOREIGN KEY (astronomy_show_id) REFERENCES astronomy_shows(id) ON DELETE CASCADE,
                FOREIGN KEY (planetarium_dome_id) REFERENCES planetarium_domes(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_show_sessions_show ON show_sessions(astronomy_show_id);
            CREATE INDEX idx_show_sessions_time ON show_sessions(show_time);
        "#,
    },
    Migration {
        version: 8,
        name: "create_reservations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS reservations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reservations_user_id ON reservations(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS reservations (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_reservations_user_id ON reservations(user_id);
        "#,
    },
    // `row` is reserved in MySQL, hence row_no / seat_no.
    Migration {
        version: 9,
        name: "create_tickets",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                row_no INTEGER NOT NULL,
                seat_no INTEGER NOT NULL,
                show_session_id INTEGER NOT NULL,
                reservation_id INTEGER NOT NULL,
                FOREIGN KEY (show_session_id) REFERENCES show_sessions(id) ON DELETE CASCADE,
                FOREIGN KEY (reservation_id) REFERENCES reservations(id) ON DELETE CASCADE,
                UNIQUE (show_session_id, row_no, seat_no)
            );
            CREATE INDEX IF NOT EXISTS idx_tickets_reservation ON tickets(reservation_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                row_no INT NOT NULL,
                seat_no INT NOT NULL,
                show_session_id BIGINT NOT NULL,
                reservation_id BIGINT NOT NULL,
                FOREIGN KEY (show_session_id) REFERENCES show_sessions(id) ON DELETE CASCADE,
                FOREIGN KEY (reservation_id) REFERENCES reservations(id) ON DELETE CASCADE,
                UNIQUE KEY uq_tickets_seat (show_session_id, row_no, seat_no)
            );
            CREATE INDEX idx_tickets_reservation ON tickets(reservation_id);
        "#,
    },
];

/// Run all pending migrations.
///
/// Returns the number of migrations applied.
///
/// # Errors
///
/// Returns an error if any migration fails to apply
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Already applied migrations, ordered by version
pub async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual trimmed statements, skipping comment-only chunks
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let row = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
            .bind(name)
            .fetch_optional(pool)
            .await
            .expect("Failed to query sqlite_master");
        row.is_some()
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Second run applies nothing
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert!(!is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.unwrap();

        assert!(is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);

        let applied = get_applied_migrations(&pool).await.unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
        assert_eq!(applied[0].name, "create_users");
    }

    #[tokio::test]
    async fn test_all_tables_created() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        for table in [
            "users",
            "sessions",
            "show_themes",
            "astronomy_shows",
            "astronomy_show_themes",
            "planetarium_domes",
            "show_sessions",
            "reservations",
            "tickets",
        ] {
            assert!(table_exists(sqlite_pool, table).await, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_foreign_key_constraints() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        let result = sqlx::query(
            "INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time) VALUES (?, ?, ?)",
        )
        .bind(999i64)
        .bind(999i64)
        .bind(Utc::now())
        .execute(sqlite_pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_show_theme_link_is_unique_and_cascades() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        let show_id = sqlx::query("INSERT INTO astronomy_shows (title, description) VALUES ('Orion', '')")
            .execute(sqlite_pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let theme_id = sqlx::query("INSERT INTO show_themes (name) VALUES ('Stars')")
            .execute(sqlite_pool)
            .await
            .unwrap()
            .last_insert_rowid();

        let link = "INSERT INTO astronomy_show_themes (astronomy_show_id, show_theme_id) VALUES (?, ?)";
        sqlx::query(link)
            .bind(show_id)
            .bind(theme_id)
            .execute(sqlite_pool)
            .await
            .unwrap();
        let duplicate = sqlx::query(link)
            .bind(show_id)
            .bind(theme_id)
            .execute(sqlite_pool)
            .await;
        assert!(duplicate.is_err());

        sqlx::query("DELETE FROM astronomy_shows WHERE id = ?")
            .bind(show_id)
            .execute(sqlite_pool)
            .await
            .unwrap();
        let remaining: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM astronomy_show_themes")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("cnt");
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_ticket_seat_unique_per_session() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        sqlx::query("INSERT INTO users (email, password_hash) VALUES ('a@b.c', 'x')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO astronomy_shows (title, description) VALUES ('Orion', '')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO planetarium_domes (name, rows_count, seats_in_row) VALUES ('Blue', 5, 5)")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time) VALUES (1, 1, ?)")
            .bind(Utc::now())
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO reservations (user_id) VALUES (1)")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let ticket = "INSERT INTO tickets (row_no, seat_no, show_session_id, reservation_id) VALUES (2, 3, 1, 1)";
        sqlx::query(ticket).execute(sqlite_pool).await.unwrap();
        assert!(sqlx::query(ticket).execute(sqlite_pool).await.is_err());
    }

    #[tokio::test]
    async fn test_dome_dimensions_must_be_positive() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        let result = sqlx::query("INSERT INTO planetarium_domes (name, rows_count, seats_in_row) VALUES ('Flat', 0, 10)")
            .execute(sqlite_pool)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_get_migration() {
        assert_eq!(get_migration(1).map(|m| m.name), Some("create_users"));
        assert_eq!(get_migration(9).map(|m| m.name), Some("create_tickets"));
        assert!(get_migration(999).is_none());
    }

    #[test]
    fn test_versions_are_sequential() {
        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, idx + 1);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}

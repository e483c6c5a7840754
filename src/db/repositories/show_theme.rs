//! Show theme repository
//!
//! This module provides:
//! - `ShowThemeRepository` trait defining the interface for theme data access
//! - `SqlxShowThemeRepository` implementing the trait for SQLite and MySQL

use super::placeholders;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::ShowTheme;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Show theme repository trait
#[async_trait]
pub trait ShowThemeRepository: Send + Sync {
    /// Create a new theme
    async fn create(&self, theme: &ShowTheme) -> Result<ShowTheme>;

    /// Get theme by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<ShowTheme>>;

    /// Get theme by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<ShowTheme>>;

    /// List all themes ordered by ID
    async fn list(&self) -> Result<Vec<ShowTheme>>;

    /// Themes whose ID is in `ids`, ordered by ID. Unknown IDs are skipped.
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<ShowTheme>>;
}

/// SQLx-based show theme repository implementation
pub struct SqlxShowThemeRepository {
    pool: DynDatabasePool,
}

impl SqlxShowThemeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShowThemeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ShowThemeRepository for SqlxShowThemeRepository {
    async fn create(&self, theme: &ShowTheme) -> Result<ShowTheme> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_theme_sqlite(self.pool.sqlite()?, theme).await,
            DatabaseDriver::Mysql => create_theme_mysql(self.pool.mysql()?, theme).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShowTheme>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_theme_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_theme_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<ShowTheme>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_theme_by_name_sqlite(self.pool.sqlite()?, name).await,
            DatabaseDriver::Mysql => get_theme_by_name_mysql(self.pool.mysql()?, name).await,
        }
    }

    async fn list(&self) -> Result<Vec<ShowTheme>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_themes_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_themes_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<ShowTheme>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_themes_by_ids_sqlite(self.pool.sqlite()?, ids).await,
            DatabaseDriver::Mysql => get_themes_by_ids_mysql(self.pool.mysql()?, ids).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_theme_sqlite(pool: &SqlitePool, theme: &ShowTheme) -> Result<ShowTheme> {
    let result = sqlx::query("INSERT INTO show_themes (name) VALUES (?)")
        .bind(&theme.name)
        .execute(pool)
        .await
        .context("Failed to create show theme")?;

    Ok(ShowTheme {
        id: result.last_insert_rowid(),
        name: theme.name.clone(),
    })
}

async fn get_theme_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ShowTheme>> {
    let row = sqlx::query("SELECT id, name FROM show_themes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get show theme by ID")?;

    Ok(row.as_ref().map(row_to_theme_sqlite))
}

async fn get_theme_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<ShowTheme>> {
    let row = sqlx::query("SELECT id, name FROM show_themes WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get show theme by name")?;

    Ok(row.as_ref().map(row_to_theme_sqlite))
}

async fn list_themes_sqlite(pool: &SqlitePool) -> Result<Vec<ShowTheme>> {
    let rows = sqlx::query("SELECT id, name FROM show_themes ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list show themes")?;

    Ok(rows.iter().map(row_to_theme_sqlite).collect())
}

async fn get_themes_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<ShowTheme>> {
    let sql = format!(
        "SELECT id, name FROM show_themes WHERE id IN ({}) ORDER BY id",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get show themes by IDs")?;

    Ok(rows.iter().map(row_to_theme_sqlite).collect())
}

fn row_to_theme_sqlite(row: &sqlx::sqlite::SqliteRow) -> ShowTheme {
    ShowTheme {
        id: row.get("id"),
        name: row.get("name"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_theme_mysql(pool: &MySqlPool, theme: &ShowTheme) -> Result<ShowTheme> {
    let result = sqlx::query("INSERT INTO show_themes (name) VALUES (?)")
        .bind(&theme.name)
        .execute(pool)
        .await
        .context("Failed to create show theme")?;

    Ok(ShowTheme {
        id: result.last_insert_id() as i64,
        name: theme.name.clone(),
    })
}

async fn get_theme_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ShowTheme>> {
    let row = sqlx::query("SELECT id, name FROM show_themes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get show theme by ID")?;

    Ok(row.as_ref().map(row_to_theme_mysql))
}

async fn get_theme_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<ShowTheme>> {
    let row = sqlx::query("SELECT id, name FROM show_themes WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get show theme by name")?;

    Ok(row.as_ref().map(row_to_theme_mysql))
}

async fn list_themes_mysql(pool: &MySqlPool) -> Result<Vec<ShowTheme>> {
    let rows = sqlx::query("SELECT id, name FROM show_themes ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list show themes")?;

    Ok(rows.iter().map(row_to_theme_mysql).collect())
}

async fn get_themes_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<ShowTheme>> {
    let sql = format!(
        "SELECT id, name FROM show_themes WHERE id IN ({}) ORDER BY id",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get show themes by IDs")?;

    Ok(rows.iter().map(row_to_theme_mysql).collect())
}

fn row_to_theme_mysql(row: &sqlx::mysql::MySqlRow) -> ShowTheme {
    ShowTheme {
        id: row.get("id"),
        name: row.get("name"),
    }
}

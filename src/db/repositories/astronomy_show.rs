//! Astronomy show repository
//!
//! Shows are stored in `astronomy_shows`, their theme set in the
//! `astronomy_show_themes` link table. Every read returns shows with their
//! themes loaded (ordered by theme id).
//!
//! Listing accepts an `AstronomyShowFilter`:
//! - `title`: case-insensitive substring, `%` and `_` match literally.
//!   Matched against `title_lower`, written with Unicode lowercasing on
//!   insert, since SQLite's `LOWER` only folds ASCII.
//! - `theme_ids`: shows linked to any of the ids, plus shows with no theme

use super::placeholders;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AstronomyShow, AstronomyShowFilter, ShowTheme};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Astronomy show repository trait
#[async_trait]
pub trait AstronomyShowRepository: Send + Sync {
    /// Insert a show and link it to `theme_ids` in one transaction.
    ///
    /// `theme_ids` must reference existing themes and be free of duplicates.
    async fn create(&self, show: &AstronomyShow, theme_ids: &[i64]) -> Result<AstronomyShow>;

    /// Get show by ID, with themes
    async fn get_by_id(&self, id: i64) -> Result<Option<AstronomyShow>>;

    /// List shows matching `filter`, in ID order
    async fn list(&self, filter: &AstronomyShowFilter) -> Result<Vec<AstronomyShow>>;

    /// Link an existing theme to a show. Linking twice is a no-op.
    async fn add_theme(&self, show_id: i64, theme_id: i64) -> Result<()>;
}

/// SQLx-based astronomy show repository implementation
pub struct SqlxAstronomyShowRepository {
    pool: DynDatabasePool,
}

impl SqlxAstronomyShowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AstronomyShowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AstronomyShowRepository for SqlxAstronomyShowRepository {
    async fn create(&self, show: &AstronomyShow, theme_ids: &[i64]) -> Result<AstronomyShow> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_show_sqlite(self.pool.sqlite()?, show, theme_ids).await?,
            DatabaseDriver::Mysql => create_show_mysql(self.pool.mysql()?, show, theme_ids).await?,
        };

        self.get_by_id(id)
            .await?
            .with_context(|| format!("Astronomy show {} vanished after insert", id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AstronomyShow>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_show_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_show_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self, filter: &AstronomyShowFilter) -> Result<Vec<AstronomyShow>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_shows_sqlite(self.pool.sqlite()?, filter).await,
            DatabaseDriver::Mysql => list_shows_mysql(self.pool.mysql()?, filter).await,
        }
    }

    async fn add_theme(&self, show_id: i64, theme_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    "INSERT OR IGNORE INTO astronomy_show_themes (astronomy_show_id, show_theme_id) VALUES (?, ?)",
                )
                .bind(show_id)
                .bind(theme_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to add theme to astronomy show")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    "INSERT IGNORE INTO astronomy_show_themes (astronomy_show_id, show_theme_id) VALUES (?, ?)",
                )
                .bind(show_id)
                .bind(theme_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to add theme to astronomy show")?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// Query building
// ============================================================================

const THEMES_OF_SHOW_SQL: &str = r#"
    SELECT t.id, t.name
    FROM show_themes t
    INNER JOIN astronomy_show_themes st ON st.show_theme_id = t.id
    WHERE st.astronomy_show_id = ?
    ORDER BY t.id
"#;

/// A value bound to a `?` placeholder of a dynamically built query
#[derive(Debug, Clone, PartialEq, Eq)]
enum BindValue {
    Text(String),
    Int(i64),
}

/// Build the listing SQL and its bind values for `filter`.
///
/// The placeholders are `?`, which both SQLite and MySQL accept.
fn build_list_query(filter: &AstronomyShowFilter) -> (String, Vec<BindValue>) {
    let mut sql = String::from("SELECT s.id, s.title, s.description FROM astronomy_shows s");
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(title) = &filter.title {
        conditions.push("s.title_lower LIKE ? ESCAPE '!'".to_string());
        binds.push(BindValue::Text(format!("%{}%", escape_like(&title.to_lowercase()))));
    }

    if let Some(ids) = filter.theme_ids.as_ref().filter(|ids| !ids.is_empty()) {
        conditions.push(format!(
            "(EXISTS (SELECT 1 FROM astronomy_show_themes st \
              WHERE st.astronomy_show_id = s.id AND st.show_theme_id IN ({})) \
             OR NOT EXISTS (SELECT 1 FROM astronomy_show_themes st \
              WHERE st.astronomy_show_id = s.id))",
            placeholders(ids.len())
        ));
        binds.extend(ids.iter().copied().map(BindValue::Int));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY s.id");

    (sql, binds)
}

/// Escape LIKE wildcards so user input matches literally (escape char `!`)
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_show_sqlite(pool: &SqlitePool, show: &AstronomyShow, theme_ids: &[i64]) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query("INSERT INTO astronomy_shows (title, title_lower, description) VALUES (?, ?, ?)")
        .bind(&show.title)
        .bind(show.title.to_lowercase())
        .bind(&show.description)
        .execute(&mut *tx)
        .await
        .context("Failed to create astronomy show")?
        .last_insert_rowid();

    for theme_id in theme_ids {
        sqlx::query("INSERT INTO astronomy_show_themes (astronomy_show_id, show_theme_id) VALUES (?, ?)")
            .bind(id)
            .bind(theme_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to link theme {} to astronomy show", theme_id))?;
    }

    tx.commit().await.context("Failed to commit astronomy show")?;

    Ok(id)
}

async fn get_show_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<AstronomyShow>> {
    let row = sqlx::query("SELECT id, title, description FROM astronomy_shows WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get astronomy show by ID")?;

    match row {
        Some(row) => {
            let mut show = row_to_show_sqlite(&row);
            show.show_themes = get_themes_of_show_sqlite(pool, show.id).await?;
            Ok(Some(show))
        }
        None => Ok(None),
    }
}

async fn list_shows_sqlite(pool: &SqlitePool, filter: &AstronomyShowFilter) -> Result<Vec<AstronomyShow>> {
    let (sql, binds) = build_list_query(filter);
    let mut query = sqlx::query(&sql);
    for value in binds {
        query = match value {
            BindValue::Text(text) => query.bind(text),
            BindValue::Int(int) => query.bind(int),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list astronomy shows")?;

    let mut shows = Vec::with_capacity(rows.len());
    for row in rows {
        let mut show = row_to_show_sqlite(&row);
        show.show_themes = get_themes_of_show_sqlite(pool, show.id).await?;
        shows.push(show);
    }

    Ok(shows)
}

async fn get_themes_of_show_sqlite(pool: &SqlitePool, show_id: i64) -> Result<Vec<ShowTheme>> {
    let rows = sqlx::query(THEMES_OF_SHOW_SQL)
        .bind(show_id)
        .fetch_all(pool)
        .await
        .context("Failed to load astronomy show themes")?;

    Ok(rows
        .iter()
        .map(|row| ShowTheme {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

fn row_to_show_sqlite(row: &sqlx::sqlite::SqliteRow) -> AstronomyShow {
    AstronomyShow {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        show_themes: Vec::new(),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_show_mysql(pool: &MySqlPool, show: &AstronomyShow, theme_ids: &[i64]) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query("INSERT INTO astronomy_shows (title, title_lower, description) VALUES (?, ?, ?)")
        .bind(&show.title)
        .bind(show.title.to_lowercase())
        .bind(&show.description)
        .execute(&mut *tx)
        .await
        .context("Failed to create astronomy show")?
        .last_insert_id() as i64;

    for theme_id in theme_ids {
        sqlx::query("INSERT INTO astronomy_show_themes (astronomy_show_id, show_theme_id) VALUES (?, ?)")
            .bind(id)
            .bind(theme_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to link theme {} to astronomy show", theme_id))?;
    }

    tx.commit().await.context("Failed to commit astronomy show")?;

    Ok(id)
}

async fn get_show_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<AstronomyShow>> {
    let row = sqlx::query("SELECT id, title, description FROM astronomy_shows WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get astronomy show by ID")?;

    match row {
        Some(row) => {
            let mut show = row_to_show_mysql(&row);
            show.show_themes = get_themes_of_show_mysql(pool, show.id).await?;
            Ok(Some(show))
        }
        None => Ok(None),
    }
}

async fn list_shows_mysql(pool: &MySqlPool, filter: &AstronomyShowFilter) -> Result<Vec<AstronomyShow>> {
    let (sql, binds) = build_list_query(filter);
    let mut query = sqlx::query(&sql);
    for value in binds {
        query = match value {
            BindValue::Text(text) => query.bind(text),
            BindValue::Int(int) => query.bind(int),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list astronomy shows")?;

    let mut shows = Vec::with_capacity(rows.len());
    for row in rows {
        let mut show = row_to_show_mysql(&row);
        show.show_themes = get_themes_of_show_mysql(pool, show.id).await?;
        shows.push(show);
    }

    Ok(shows)
}

async fn get_themes_of_show_mysql(pool: &MySqlPool, show_id: i64) -> Result<Vec<ShowTheme>> {
    let rows = sqlx::query(THEMES_OF_SHOW_SQL)
        .bind(show_id)
        .fetch_all(pool)
        .await
        .context("Failed to load astronomy show themes")?;

    Ok(rows
        .iter()
        .map(|row| ShowTheme {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

fn row_to_show_mysql(row: &sqlx::mysql::MySqlRow) -> AstronomyShow {
    AstronomyShow {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        show_themes: Vec::new(),
    }
}

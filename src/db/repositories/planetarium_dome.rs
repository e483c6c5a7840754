//! Planetarium dome repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::PlanetariumDome;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Planetarium dome repository trait
#[async_trait]
pub trait PlanetariumDomeRepository: Send + Sync {
    async fn create(&self, dome: &PlanetariumDome) -> Result<PlanetariumDome>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PlanetariumDome>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<PlanetariumDome>>;

    /// List all domes ordered by ID
    async fn list(&self) -> Result<Vec<PlanetariumDome>>;
}

/// SQLx-based dome repository implementation
pub struct SqlxPlanetariumDomeRepository {
    pool: DynDatabasePool,
}

impl SqlxPlanetariumDomeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PlanetariumDomeRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_DOME: &str = "SELECT id, name, rows_count, seats_in_row FROM planetarium_domes";

#[async_trait]
impl PlanetariumDomeRepository for SqlxPlanetariumDomeRepository {
    async fn create(&self, dome: &PlanetariumDome) -> Result<PlanetariumDome> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_dome_sqlite(self.pool.sqlite()?, dome).await,
            DatabaseDriver::Mysql => create_dome_mysql(self.pool.mysql()?, dome).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PlanetariumDome>> {
        let sql = format!("{} WHERE id = ?", SELECT_DOME);
        let dome = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .map(|row| row.as_ref().map(row_to_dome_sqlite)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .map(|row| row.as_ref().map(row_to_dome_mysql)),
        }
        .context("Failed to get planetarium dome by ID")?;

        Ok(dome)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<PlanetariumDome>> {
        let sql = format!("{} WHERE name = ?", SELECT_DOME);
        let dome = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(name)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .map(|row| row.as_ref().map(row_to_dome_sqlite)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(name)
                .fetch_optional(self.pool.mysql()?)
                .await
                .map(|row| row.as_ref().map(row_to_dome_mysql)),
        }
        .context("Failed to get planetarium dome by name")?;

        Ok(dome)
    }

    async fn list(&self) -> Result<Vec<PlanetariumDome>> {
        let sql = format!("{} ORDER BY id", SELECT_DOME);
        let domes = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.sqlite()?)
                .await
                .map(|rows| rows.iter().map(row_to_dome_sqlite).collect::<Vec<_>>()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.mysql()?)
                .await
                .map(|rows| rows.iter().map(row_to_dome_mysql).collect::<Vec<_>>()),
        }
        .context("Failed to list planetarium domes")?;

        Ok(domes)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_dome_sqlite(pool: &SqlitePool, dome: &PlanetariumDome) -> Result<PlanetariumDome> {
    let result = sqlx::query(
        "INSERT INTO planetarium_domes (name, rows_count, seats_in_row) VALUES (?, ?, ?)",
    )
    .bind(&dome.name)
    .bind(dome.rows)
    .bind(dome.seats_in_row)
    .execute(pool)
    .await
    .context("Failed to create planetarium dome")?;

    Ok(PlanetariumDome {
        id: result.last_insert_rowid(),
        ..dome.clone()
    })
}

fn row_to_dome_sqlite(row: &sqlx::sqlite::SqliteRow) -> PlanetariumDome {
    PlanetariumDome {
        id: row.get("id"),
        name: row.get("name"),
        rows: row.get("rows_count"),
        seats_in_row: row.get("seats_in_row"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_dome_mysql(pool: &MySqlPool, dome: &PlanetariumDome) -> Result<PlanetariumDome> {
    let result = sqlx::query(
        "INSERT INTO planetarium_domes (name, rows_count, seats_in_row) VALUES (?, ?, ?)",
    )
    .bind(&dome.name)
    .bind(dome.rows)
    .bind(dome.seats_in_row)
    .execute(pool)
    .await
    .context("Failed to create planetarium dome")?;

    Ok(PlanetariumDome {
        id: result.last_insert_id() as i64,
        ..dome.clone()
    })
}

fn row_to_dome_mysql(row: &sqlx::mysql::MySqlRow) -> PlanetariumDome {
    PlanetariumDome {
        id: row.get("id"),
        name: row.get("name"),
        rows: row.get("rows_count"),
        seats_in_row: row.get("seats_in_row"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};

    async fn setup_test_repo() -> SqlxPlanetariumDomeRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxPlanetariumDomeRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_dome() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&PlanetariumDome::new("Blue".to_string(), 10, 12))
            .await
            .expect("Failed to create dome");
        assert!(created.id > 0);

        let loaded = repo.get_by_id(created.id).await.unwrap().expect("Dome not found");
        assert_eq!(loaded, created);
        assert_eq!(loaded.capacity(), 120);

        assert_eq!(repo.get_by_name("Blue").await.unwrap(), Some(created));
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_domes() {
        let repo = setup_test_repo().await;
        repo.create(&PlanetariumDome::new("Blue".to_string(), 5, 5)).await.unwrap();
        repo.create(&PlanetariumDome::new("Red".to_string(), 8, 4)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Blue", "Red"]);
    }

    #[tokio::test]
    async fn test_unique_name_constraint() {
        let repo = setup_test_repo().await;
        repo.create(&PlanetariumDome::new("Blue".to_string(), 5, 5)).await.unwrap();

        let err = repo
            .create(&PlanetariumDome::new("Blue".to_string(), 3, 3))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}

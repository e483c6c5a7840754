//! Show session repository
//!
//! Listings are returned as `ShowSessionSummary`: the session joined with
//! its show title, dome name and capacity, and the number of tickets sold.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{SeatPosition, ShowSession, ShowSessionFilter, ShowSessionInput, ShowSessionSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Show session repository trait
#[async_trait]
pub trait ShowSessionRepository: Send + Sync {
    async fn create(&self, input: &ShowSessionInput) -> Result<ShowSession>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ShowSession>>;

    /// Session joined with show, dome and sold ticket count
    async fn get_summary(&self, id: i64) -> Result<Option<ShowSessionSummary>>;

    /// List summaries matching `filter`, ordered by show time then ID
    async fn list(&self, filter: &ShowSessionFilter) -> Result<Vec<ShowSessionSummary>>;

    /// Replace a session's fields. Returns `false` when the session does not exist.
    async fn update(&self, id: i64, input: &ShowSessionInput) -> Result<bool>;

    /// Delete a session and its tickets. Returns `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Seats already sold for a session, ordered by row then seat
    async fn taken_places(&self, id: i64) -> Result<Vec<SeatPosition>>;
}

/// SQLx-based show session repository implementation
pub struct SqlxShowSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxShowSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShowSessionRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Summary columns; shared with the reservation repository
pub(crate) const SESSION_SUMMARY_SELECT: &str = r#"
    SELECT ss.id, ss.show_time,
           ss.astronomy_show_id, a.title AS astronomy_show_title,
           ss.planetarium_dome_id, d.name AS planetarium_dome_name,
           d.rows_count * d.seats_in_row AS planetarium_dome_capacity,
           (SELECT COUNT(*) FROM tickets t WHERE t.show_session_id = ss.id) AS tickets_sold
    FROM show_sessions ss
    INNER JOIN astronomy_shows a ON a.id = ss.astronomy_show_id
    INNER JOIN planetarium_domes d ON d.id = ss.planetarium_dome_id
"#;

/// A value bound to a `?` placeholder of a dynamically built query
#[derive(Debug, Clone, PartialEq, Eq)]
enum BindValue {
    Time(DateTime<Utc>),
    Int(i64),
}

fn build_list_query(filter: &ShowSessionFilter) -> (String, Vec<BindValue>) {
    let mut sql = String::from(SESSION_SUMMARY_SELECT);
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some((start, end)) = filter.day_range() {
        conditions.push("ss.show_time >= ? AND ss.show_time < ?");
        binds.push(BindValue::Time(start));
        binds.push(BindValue::Time(end));
    }

    if let Some(show_id) = filter.astronomy_show_id {
        conditions.push("ss.astronomy_show_id = ?");
        binds.push(BindValue::Int(show_id));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY ss.show_time, ss.id");

    (sql, binds)
}

#[async_trait]
impl ShowSessionRepository for SqlxShowSessionRepository {
    async fn create(&self, input: &ShowSessionInput) -> Result<ShowSession> {
        let sql = "INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(input.astronomy_show_id)
                .bind(input.planetarium_dome_id)
                .bind(input.show_time)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(input.astronomy_show_id)
                .bind(input.planetarium_dome_id)
                .bind(input.show_time)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to create show session")?;

        Ok(ShowSession {
            id,
            astronomy_show_id: input.astronomy_show_id,
            planetarium_dome_id: input.planetarium_dome_id,
            show_time: input.show_time,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShowSession>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_summary(&self, id: i64) -> Result<Option<ShowSessionSummary>> {
        let sql = format!("{} WHERE ss.id = ?", SESSION_SUMMARY_SELECT);
        let summary = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .map(|row| row.as_ref().map(row_to_summary_sqlite)),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .map(|row| row.as_ref().map(row_to_summary_mysql)),
        }
        .context("Failed to get show session summary")?;

        Ok(summary)
    }

    async fn list(&self, filter: &ShowSessionFilter) -> Result<Vec<ShowSessionSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sessions_sqlite(self.pool.sqlite()?, filter).await,
            DatabaseDriver::Mysql => list_sessions_mysql(self.pool.mysql()?, filter).await,
        }
    }

    async fn update(&self, id: i64, input: &ShowSessionInput) -> Result<bool> {
        let sql = r#"
            UPDATE show_sessions
            SET astronomy_show_id = ?, planetarium_dome_id = ?, show_time = ?
            WHERE id = ?
        "#;
        let exists = self.get_by_id(id).await?.is_some();
        if !exists {
            return Ok(false);
        }

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(input.astronomy_show_id)
                .bind(input.planetarium_dome_id)
                .bind(input.show_time)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(input.astronomy_show_id)
                .bind(input.planetarium_dome_id)
                .bind(input.show_time)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        }
        .context("Failed to update show session")?;

        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM show_sessions WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete show session")?;

        Ok(affected > 0)
    }

    async fn taken_places(&self, id: i64) -> Result<Vec<SeatPosition>> {
        let sql = "SELECT row_no, seat_no FROM tickets WHERE show_session_id = ? ORDER BY row_no, seat_no";
        let places = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .fetch_all(self.pool.sqlite()?)
                .await
                .map(|rows| {
                    rows.iter()
                        .map(|row| SeatPosition {
                            row: row.get("row_no"),
                            seat: row.get("seat_no"),
                        })
                        .collect::<Vec<_>>()
                }),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .fetch_all(self.pool.mysql()?)
                .await
                .map(|rows| {
                    rows.iter()
                        .map(|row| SeatPosition {
                            row: row.get("row_no"),
                            seat: row.get("seat_no"),
                        })
                        .collect::<Vec<_>>()
                }),
        }
        .context("Failed to load taken places")?;

        Ok(places)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ShowSession>> {
    let row = sqlx::query(
        "SELECT id, astronomy_show_id, planetarium_dome_id, show_time FROM show_sessions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get show session by ID")?;

    Ok(row.map(|row| ShowSession {
        id: row.get("id"),
        astronomy_show_id: row.get("astronomy_show_id"),
        planetarium_dome_id: row.get("planetarium_dome_id"),
        show_time: row.get("show_time"),
    }))
}

async fn list_sessions_sqlite(pool: &SqlitePool, filter: &ShowSessionFilter) -> Result<Vec<ShowSessionSummary>> {
    let (sql, binds) = build_list_query(filter);
    let mut query = sqlx::query(&sql);
    for value in binds {
        query = match value {
            BindValue::Time(time) => query.bind(time),
            BindValue::Int(int) => query.bind(int),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list show sessions")?;

    Ok(rows.iter().map(row_to_summary_sqlite).collect())
}

pub(crate) fn row_to_summary_sqlite(row: &sqlx::sqlite::SqliteRow) -> ShowSessionSummary {
    ShowSessionSummary {
        id: row.get("id"),
        show_time: row.get("show_time"),
        astronomy_show_id: row.get("astronomy_show_id"),
        astronomy_show_title: row.get("astronomy_show_title"),
        planetarium_dome_id: row.get("planetarium_dome_id"),
        planetarium_dome_name: row.get("planetarium_dome_name"),
        planetarium_dome_capacity: row.get("planetarium_dome_capacity"),
        tickets_sold: row.get("tickets_sold"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_session_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ShowSession>> {
    let row = sqlx::query(
        "SELECT id, astronomy_show_id, planetarium_dome_id, show_time FROM show_sessions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get show session by ID")?;

    Ok(row.map(|row| ShowSession {
        id: row.get("id"),
        astronomy_show_id: row.get("astronomy_show_id"),
        planetarium_dome_id: row.get("planetarium_dome_id"),
        show_time: row.get("show_time"),
    }))
}

async fn list_sessions_mysql(pool: &MySqlPool, filter: &ShowSessionFilter) -> Result<Vec<ShowSessionSummary>> {
    let (sql, binds) = build_list_query(filter);
    let mut query = sqlx::query(&sql);
    for value in binds {
        query = match value {
            BindValue::Time(time) => query.bind(time),
            BindValue::Int(int) => query.bind(int),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list show sessions")?;

    Ok(rows.iter().map(row_to_summary_mysql).collect())
}

pub(crate) fn row_to_summary_mysql(row: &sqlx::mysql::MySqlRow) -> ShowSessionSummary {
    ShowSessionSummary {
        id: row.get("id"),
        show_time: row.get("show_time"),
        astronomy_show_id: row.get("astronomy_show_id"),
        astronomy_show_title: row.get("astronomy_show_title"),
        planetarium_dome_id: row.get("planetarium_dome_id"),
        planetarium_dome_name: row.get("planetarium_dome_name"),
        planetarium_dome_capacity: row.get("planetarium_dome_capacity"),
        tickets_sold: row.get("tickets_sold"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{NaiveDate, TimeZone};

    struct Fixture {
        pool: DynDatabasePool,
        repo: SqlxShowSessionRepository,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite = pool.sqlite().unwrap();
        for title in ["Orion", "Andromeda"] {
            sqlx::query("INSERT INTO astronomy_shows (title, description) VALUES (?, '')")
                .bind(title)
                .execute(sqlite)
                .await
                .unwrap();
        }
        sqlx::query("INSERT INTO planetarium_domes (name, rows_count, seats_in_row) VALUES ('Blue', 4, 5)")
            .execute(sqlite)
            .await
            .unwrap();

        Fixture {
            repo: SqlxShowSessionRepository::new(pool.clone()),
            pool,
        }
    }

    fn input(show_id: i64, time: DateTime<Utc>) -> ShowSessionInput {
        ShowSessionInput {
            astronomy_show_id: show_id,
            planetarium_dome_id: 1,
            show_time: time,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    async fn sell_ticket(pool: &DynDatabasePool, session_id: i64, row: i32, seat: i32) {
        let sqlite = pool.sqlite().unwrap();
        sqlx::query("INSERT OR IGNORE INTO users (id, email, password_hash) VALUES (1, 'u@test.com', 'x')")
            .execute(sqlite)
            .await
            .unwrap();
        let reservation = sqlx::query("INSERT INTO reservations (user_id, created_at) VALUES (1, ?)")
            .bind(Utc::now())
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO tickets (row_no, seat_no, show_session_id, reservation_id) VALUES (?, ?, ?, ?)")
            .bind(row)
            .bind(seat)
            .bind(session_id)
            .bind(reservation)
            .execute(sqlite)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let fx = setup().await;

        let created = fx.repo.create(&input(1, at(1, 18))).await.expect("Failed to create");
        let loaded = fx.repo.get_by_id(created.id).await.unwrap().expect("Session not found");

        assert_eq!(loaded, created);
        assert_eq!(loaded.show_time, at(1, 18));
    }

    #[tokio::test]
    async fn test_summary_counts_tickets() {
        let fx = setup().await;
        let session = fx.repo.create(&input(1, at(1, 18))).await.unwrap();
        sell_ticket(&fx.pool, session.id, 1, 1).await;
        sell_ticket(&fx.pool, session.id, 2, 3).await;

        let summary = fx.repo.get_summary(session.id).await.unwrap().unwrap();

        assert_eq!(summary.astronomy_show_title, "Orion");
        assert_eq!(summary.planetarium_dome_name, "Blue");
        assert_eq!(summary.planetarium_dome_capacity, 20);
        assert_eq!(summary.tickets_sold, 2);
        assert_eq!(summary.tickets_available(), 18);

        let taken = fx.repo.taken_places(session.id).await.unwrap();
        assert_eq!(
            taken,
            vec![SeatPosition { row: 1, seat: 1 }, SeatPosition { row: 2, seat: 3 }]
        );
    }

    #[tokio::test]
    async fn test_list_filters() {
        let fx = setup().await;
        let morning = fx.repo.create(&input(1, at(1, 9))).await.unwrap();
        let late = fx.repo.create(&input(2, at(1, 23))).await.unwrap();
        let next_day = fx.repo.create(&input(1, at(2, 0))).await.unwrap();

        let all = fx.repo.list(&ShowSessionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let day_one = ShowSessionFilter {
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
            astronomy_show_id: None,
        };
        let ids: Vec<i64> = fx.repo.list(&day_one).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![morning.id, late.id]);

        let orion = ShowSessionFilter {
            date: None,
            astronomy_show_id: Some(1),
        };
        let ids: Vec<i64> = fx.repo.list(&orion).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![morning.id, next_day.id]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let fx = setup().await;
        let session = fx.repo.create(&input(1, at(1, 9))).await.unwrap();

        assert!(fx.repo.update(session.id, &input(2, at(3, 12))).await.unwrap());
        let loaded = fx.repo.get_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.astronomy_show_id, 2);
        assert_eq!(loaded.show_time, at(3, 12));

        assert!(!fx.repo.update(999, &input(2, at(3, 12))).await.unwrap());

        assert!(fx.repo.delete(session.id).await.unwrap());
        assert!(!fx.repo.delete(session.id).await.unwrap());
        assert!(fx.repo.get_by_id(session.id).await.unwrap().is_none());
    }

    #[test]
    fn test_build_list_query_binds() {
        let filter = ShowSessionFilter {
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
            astronomy_show_id: Some(7),
        };
        let (sql, binds) = build_list_query(&filter);

        assert_eq!(sql.matches('?').count(), binds.len());
        assert_eq!(binds.last(), Some(&BindValue::Int(7)));
    }
}

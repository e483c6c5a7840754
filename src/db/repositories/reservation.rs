//! Reservation repository
//!
//! A reservation and its tickets are written in one transaction; the
//! unique `(show_session_id, row_no, seat_no)` index rejects a seat that is
//! already sold, which rolls the whole reservation back.

use super::placeholders;
use super::show_session::{row_to_summary_mysql, row_to_summary_sqlite, SESSION_SUMMARY_SELECT};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateReservationInput, ListParams, Reservation, ShowSessionSummary, TicketWithSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Reservation repository trait
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert a reservation with all its tickets atomically
    async fn create(&self, input: &CreateReservationInput) -> Result<Reservation>;

    /// Get reservation by ID, with tickets
    async fn get_by_id(&self, id: i64) -> Result<Option<Reservation>>;

    /// A user's reservations, newest first, plus the total count
    async fn list_by_user(&self, user_id: i64, params: &ListParams) -> Result<(Vec<Reservation>, i64)>;
}

/// SQLx-based reservation repository implementation
pub struct SqlxReservationRepository {
    pool: DynDatabasePool,
}

impl SqlxReservationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReservationRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Reservation row before its tickets are attached
struct ReservationRow {
    id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
}

/// Ticket row before its session summary is attached
struct TicketRow {
    id: i64,
    row: i32,
    seat: i32,
    reservation_id: i64,
    show_session_id: i64,
}

/// Attach tickets (with their session summaries) to reservation rows
fn assemble(
    reservations: Vec<ReservationRow>,
    tickets: Vec<TicketRow>,
    summaries: Vec<ShowSessionSummary>,
) -> Result<Vec<Reservation>> {
    let summaries: HashMap<i64, ShowSessionSummary> =
        summaries.into_iter().map(|s| (s.id, s)).collect();

    let mut by_reservation: HashMap<i64, Vec<TicketWithSession>> = HashMap::new();
    for ticket in tickets {
        let show_session = summaries
            .get(&ticket.show_session_id)
            .cloned()
            .with_context(|| format!("Show session {} missing for ticket {}", ticket.show_session_id, ticket.id))?;
        by_reservation
            .entry(ticket.reservation_id)
            .or_default()
            .push(TicketWithSession {
                id: ticket.id,
                row: ticket.row,
                seat: ticket.seat,
                show_session,
            });
    }

    Ok(reservations
        .into_iter()
        .map(|r| Reservation {
            id: r.id,
            user_id: r.user_id,
            created_at: r.created_at,
            tickets: by_reservation.remove(&r.id).unwrap_or_default(),
        })
        .collect())
}

fn distinct_session_ids(tickets: &[TicketRow]) -> Vec<i64> {
    let mut ids: Vec<i64> = tickets.iter().map(|t| t.show_session_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[async_trait]
impl ReservationRepository for SqlxReservationRepository {
    async fn create(&self, input: &CreateReservationInput) -> Result<Reservation> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_reservation_sqlite(self.pool.sqlite()?, input).await?,
            DatabaseDriver::Mysql => create_reservation_mysql(self.pool.mysql()?, input).await?,
        };

        self.get_by_id(id)
            .await?
            .with_context(|| format!("Reservation {} vanished after insert", id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Reservation>> {
        let sql = "SELECT id, user_id, created_at FROM reservations WHERE id = ?";
        let reservations = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let rows = sqlx::query(sql)
                    .bind(id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get reservation by ID")?;
                load_reservations_sqlite(pool, rows.iter().map(row_to_reservation_sqlite).collect()).await?
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let rows = sqlx::query(sql)
                    .bind(id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get reservation by ID")?;
                load_reservations_mysql(pool, rows.iter().map(row_to_reservation_mysql).collect()).await?
            }
        };

        Ok(reservations.into_iter().next())
    }

    async fn list_by_user(&self, user_id: i64, params: &ListParams) -> Result<(Vec<Reservation>, i64)> {
        let count_sql = "SELECT COUNT(*) AS cnt FROM reservations WHERE user_id = ?";
        let page_sql = r#"
            SELECT id, user_id, created_at FROM reservations
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
        "#;

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let total: i64 = sqlx::query(count_sql)
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count reservations")?
                    .get("cnt");
                let rows = sqlx::query(page_sql)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list reservations")?;
                let items =
                    load_reservations_sqlite(pool, rows.iter().map(row_to_reservation_sqlite).collect()).await?;
                Ok((items, total))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let total: i64 = sqlx::query(count_sql)
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count reservations")?
                    .get("cnt");
                let rows = sqlx::query(page_sql)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list reservations")?;
                let items =
                    load_reservations_mysql(pool, rows.iter().map(row_to_reservation_mysql).collect()).await?;
                Ok((items, total))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_reservation_sqlite(pool: &SqlitePool, input: &CreateReservationInput) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query("INSERT INTO reservations (user_id, created_at) VALUES (?, ?)")
        .bind(input.user_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to create reservation")?
        .last_insert_rowid();

    for ticket in &input.tickets {
        sqlx::query(
            "INSERT INTO tickets (row_no, seat_no, show_session_id, reservation_id) VALUES (?, ?, ?, ?)",
        )
        .bind(ticket.row)
        .bind(ticket.seat)
        .bind(ticket.show_session_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| {
            format!(
                "Failed to book row {} seat {} for show session {}",
                ticket.row, ticket.seat, ticket.show_session_id
            )
        })?;
    }

    tx.commit().await.context("Failed to commit reservation")?;

    Ok(id)
}

async fn load_reservations_sqlite(pool: &SqlitePool, reservations: Vec<ReservationRow>) -> Result<Vec<Reservation>> {
    if reservations.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
    let sql = format!(
        "SELECT id, row_no, seat_no, reservation_id, show_session_id FROM tickets WHERE reservation_id IN ({}) ORDER BY id",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in &ids {
        query = query.bind(*id);
    }
    let tickets: Vec<TicketRow> = query
        .fetch_all(pool)
        .await
        .context("Failed to load tickets")?
        .iter()
        .map(|row| TicketRow {
            id: row.get("id"),
            row: row.get("row_no"),
            seat: row.get("seat_no"),
            reservation_id: row.get("reservation_id"),
            show_session_id: row.get("show_session_id"),
        })
        .collect();

    let session_ids = distinct_session_ids(&tickets);
    let summaries: Vec<ShowSessionSummary> = if session_ids.is_empty() {
        Vec::new()
    } else {
        let sql = format!("{} WHERE ss.id IN ({})", SESSION_SUMMARY_SELECT, placeholders(session_ids.len()));
        let mut query = sqlx::query(&sql);
        for id in &session_ids {
            query = query.bind(*id);
        }
        query
            .fetch_all(pool)
            .await
            .context("Failed to load ticket show sessions")?
            .iter()
            .map(row_to_summary_sqlite)
            .collect()
    };

    assemble(reservations, tickets, summaries)
}

fn row_to_reservation_sqlite(row: &sqlx::sqlite::SqliteRow) -> ReservationRow {
    ReservationRow {
        id: row.get("id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_reservation_mysql(pool: &MySqlPool, input: &CreateReservationInput) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query("INSERT INTO reservations (user_id, created_at) VALUES (?, ?)")
        .bind(input.user_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to create reservation")?
        .last_insert_id() as i64;

    for ticket in &input.tickets {
        sqlx::query(
            "INSERT INTO tickets (row_no, seat_no, show_session_id, reservation_id) VALUES (?, ?, ?, ?)",
        )
        .bind(ticket.row)
        .bind(ticket.seat)
        .bind(ticket.show_session_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| {
            format!(
                "Failed to book row {} seat {} for show session {}",
                ticket.row, ticket.seat, ticket.show_session_id
            )
        })?;
    }

    tx.commit().await.context("Failed to commit reservation")?;

    Ok(id)
}

async fn load_reservations_mysql(pool: &MySqlPool, reservations: Vec<ReservationRow>) -> Result<Vec<Reservation>> {
    if reservations.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
    let sql = format!(
        "SELECT id, row_no, seat_no, reservation_id, show_session_id FROM tickets WHERE reservation_id IN ({}) ORDER BY id",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in &ids {
        query = query.bind(*id);
    }
    let tickets: Vec<TicketRow> = query
        .fetch_all(pool)
        .await
        .context("Failed to load tickets")?
        .iter()
        .map(|row| TicketRow {
            id: row.get("id"),
            row: row.get("row_no"),
            seat: row.get("seat_no"),
            reservation_id: row.get("reservation_id"),
            show_session_id: row.get("show_session_id"),
        })
        .collect();

    let session_ids = distinct_session_ids(&tickets);
    let summaries: Vec<ShowSessionSummary> = if session_ids.is_empty() {
        Vec::new()
    } else {
        let sql = format!("{} WHERE ss.id IN ({})", SESSION_SUMMARY_SELECT, placeholders(session_ids.len()));
        let mut query = sqlx::query(&sql);
        for id in &session_ids {
            query = query.bind(*id);
        }
        query
            .fetch_all(pool)
            .await
            .context("Failed to load ticket show sessions")?
            .iter()
            .map(row_to_summary_mysql)
            .collect()
    };

    assemble(reservations, tickets, summaries)
}

fn row_to_reservation_mysql(row: &sqlx::mysql::MySqlRow) -> ReservationRow {
    ReservationRow {
        id: row.get("id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
    }
}

//! Reservation service
//!
//! Books tickets for show sessions. Every ticket is checked against the
//! seating grid of its session's dome before anything is written; seats
//! already sold are reported as conflicts.

use crate::db::is_unique_violation;
use crate::db::repositories::{PlanetariumDomeRepository, ReservationRepository, ShowSessionRepository};
use crate::models::{
    CreateReservationInput, ListParams, PagedResult, PlanetariumDome, Reservation, SeatPosition, TicketInput,
};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const MAX_TICKETS_PER_RESERVATION: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ReservationServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A requested seat is already sold
    #[error("Seat already taken: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ReservationService {
    repo: Arc<dyn ReservationRepository>,
    session_repo: Arc<dyn ShowSessionRepository>,
    dome_repo: Arc<dyn PlanetariumDomeRepository>,
}

impl ReservationService {
    pub fn new(
        repo: Arc<dyn ReservationRepository>,
        session_repo: Arc<dyn ShowSessionRepository>,
        dome_repo: Arc<dyn PlanetariumDomeRepository>,
    ) -> Self {
        Self {
            repo,
            session_repo,
            dome_repo,
        }
    }

    /// Book all tickets of `input` or none of them.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an empty or oversized ticket list, a seat
    ///   listed twice, an unknown session, or a seat outside the dome
    /// - `Conflict` if a seat is already sold
    pub async fn create(&self, input: CreateReservationInput) -> Result<Reservation, ReservationServiceError> {
        if input.tickets.is_empty() {
            return Err(ReservationServiceError::ValidationError(
                "A reservation needs at least one ticket".to_string(),
            ));
        }
        if input.tickets.len() > MAX_TICKETS_PER_RESERVATION {
            return Err(ReservationServiceError::ValidationError(format!(
                "A reservation can hold at most {} tickets",
                MAX_TICKETS_PER_RESERVATION
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = input.tickets.iter().find(|t| !seen.insert(**t)) {
            return Err(ReservationServiceError::ValidationError(format!(
                "Seat row {} seat {} of session {} is listed twice",
                dup.row, dup.seat, dup.show_session_id
            )));
        }

        let mut domes: HashMap<i64, PlanetariumDome> = HashMap::new();
        for ticket in &input.tickets {
            if !domes.contains_key(&ticket.show_session_id) {
                let dome = self.dome_for_session(ticket.show_session_id).await?;
                domes.insert(ticket.show_session_id, dome);
            }
            if let Some(dome) = domes.get(&ticket.show_session_id) {
                check_seat(ticket, dome)?;
            }
        }

        for &session_id in domes.keys() {
            let taken: HashSet<SeatPosition> = self
                .session_repo
                .taken_places(session_id)
                .await
                .context("Failed to load taken places")?
                .into_iter()
                .collect();
            if let Some(t) = input
                .tickets
                .iter()
                .filter(|t| t.show_session_id == session_id)
                .find(|t| taken.contains(&SeatPosition { row: t.row, seat: t.seat }))
            {
                return Err(seat_taken(t));
            }
        }

        match self.repo.create(&input).await {
            Ok(reservation) => {
                tracing::info!(
                    reservation_id = reservation.id,
                    user_id = reservation.user_id,
                    tickets = reservation.tickets.len(),
                    "Reservation created"
                );
                Ok(reservation)
            }
            // Someone bought one of the seats between the check and the insert
            Err(e) if is_unique_violation(&e) => Err(ReservationServiceError::Conflict(
                "One of the requested seats was just sold".to_string(),
            )),
            Err(e) => Err(e.context("Failed to create reservation").into()),
        }
    }

    /// A user's own reservations, newest first
    pub async fn list_by_user(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Reservation>, ReservationServiceError> {
        let (items, total) = self
            .repo
            .list_by_user(user_id, params)
            .await
            .context("Failed to list reservations")?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn dome_for_session(&self, session_id: i64) -> Result<PlanetariumDome, ReservationServiceError> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get show session")?
            .ok_or_else(|| {
                ReservationServiceError::ValidationError(format!("Show session {} does not exist", session_id))
            })?;

        let dome = self
            .dome_repo
            .get_by_id(session.planetarium_dome_id)
            .await
            .context("Failed to get planetarium dome")?
            .context("Show session references a missing dome")?;
        Ok(dome)
    }
}

/// Reject seats outside `[1, rows] x [1, seats_in_row]`
fn check_seat(ticket: &TicketInput, dome: &PlanetariumDome) -> Result<(), ReservationServiceError> {
    if !(1..=dome.rows).contains(&ticket.row) {
        return Err(ReservationServiceError::ValidationError(format!(
            "row must be in range [1, {}], got {}",
            dome.rows, ticket.row
        )));
    }
    if !(1..=dome.seats_in_row).contains(&ticket.seat) {
        return Err(ReservationServiceError::ValidationError(format!(
            "seat must be in range [1, {}], got {}",
            dome.seats_in_row, ticket.seat
        )));
    }
    Ok(())
}

fn seat_taken(ticket: &TicketInput) -> ReservationServiceError {
    ReservationServiceError::Conflict(format!(
        "Row {} seat {} of session {} is already sold",
        ticket.row, ticket.seat, ticket.show_session_id
    ))
}

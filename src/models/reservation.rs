//! Reservation and ticket models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ShowSessionSummary;

/// A booked seat for one show session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session_id: i64,
    pub reservation_id: i64,
}

/// A ticket together with the session it admits to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketWithSession {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: ShowSessionSummary,
}

/// A user's booking: one or more tickets bought together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketWithSession>,
}

/// Requested seat inside a new reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketInput {
    pub row: i32,
    pub seat: i32,
    pub show_session_id: i64,
}

/// Input for creating a reservation
#[derive(Debug, Clone)]
pub struct CreateReservationInput {
    pub user_id: i64,
    pub tickets: Vec<TicketInput>,
}

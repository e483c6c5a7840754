//! Show session model
//!
//! A show session is one screening of an astronomy show in a dome at a
//! given time. Listings carry the joined show title, dome name, capacity and
//! sold ticket count so the API can report availability without extra
//! lookups.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AstronomyShow, PlanetariumDome};

/// Show session entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowSession {
    pub id: i64,
    pub astronomy_show_id: i64,
    pub planetarium_dome_id: i64,
    pub show_time: DateTime<Utc>,
}

/// Show session joined with its show, dome and sold seat count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowSessionSummary {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub astronomy_show_id: i64,
    pub astronomy_show_title: String,
    pub planetarium_dome_id: i64,
    pub planetarium_dome_name: String,
    pub planetarium_dome_capacity: i64,
    pub tickets_sold: i64,
}

impl ShowSessionSummary {
    /// Seats left for sale
    pub fn tickets_available(&self) -> i64 {
        (self.planetarium_dome_capacity - self.tickets_sold).max(0)
    }
}

/// A taken seat of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SeatPosition {
    pub row: i32,
    pub seat: i32,
}

/// Input for creating or replacing a show session
/// A session with its show, its dome and the seats already sold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowSessionDetail {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub astronomy_show: AstronomyShow,
    pub planetarium_dome: PlanetariumDome,
    pub taken_places: Vec<SeatPosition>,
}

#[derive(Debug, Clone)]
pub struct ShowSessionInput {
    pub astronomy_show_id: i64,
    pub planetarium_dome_id: i64,
    pub show_time: DateTime<Utc>,
}

/// Filters accepted by the session listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowSessionFilter {
    /// Calendar day (UTC) of `show_time`
    pub date: Option<NaiveDate>,
    pub astronomy_show_id: Option<i64>,
}

impl ShowSessionFilter {
    /// Half-open UTC range `[start, end)` covering the filter date
    pub fn day_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let date = self.date?;
        let start = date.and_hms_opt(0, 0, 0)?.and_utc();
        let end = date.succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tickets_available() {
        let summary = ShowSessionSummary {
            id: 1,
            show_time: Utc::now(),
            astronomy_show_id: 1,
            astronomy_show_title: "Orion".to_string(),
            planetarium_dome_id: 1,
            planetarium_dome_name: "Blue".to_string(),
            planetarium_dome_capacity: 20,
            tickets_sold: 3,
        };
        assert_eq!(summary.tickets_available(), 17);
    }

    #[test]
    fn test_day_range() {
        let filter = ShowSessionFilter {
            date: NaiveDate::from_ymd_opt(2024, 12, 31),
            astronomy_show_id: None,
        };
        let (start, end) = filter.day_range().unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(ShowSessionFilter::default().day_range().is_none());
    }
}

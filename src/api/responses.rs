//! Shared API response types
//!
//! JSON representations of the models. Shows have two shapes: the list
//! representation names its themes, the detail representation embeds them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AstronomyShow, PagedResult, PlanetariumDome, Reservation, SeatPosition, ShowSession, ShowSessionDetail,
    ShowSessionSummary, ShowTheme, TicketWithSession, User,
};

/// Timestamps are rendered as RFC 3339 in UTC with whole seconds
pub fn format_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub is_staff: bool,
    pub created_at: String,
}

/// Response for a successful register or login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            is_staff: user.is_admin(),
            email: user.email,
            role: user.role.to_string(),
            created_at: format_time(&user.created_at),
        }
    }
}

// ============================================================================
// Themes and shows
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowThemeResponse {
    pub id: i64,
    pub name: String,
}

impl From<ShowTheme> for ShowThemeResponse {
    fn from(theme: ShowTheme) -> Self {
        Self {
            id: theme.id,
            name: theme.name,
        }
    }
}

/// List representation: themes by name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AstronomyShowListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub show_themes: Vec<String>,
}

impl From<AstronomyShow> for AstronomyShowListItem {
    fn from(show: AstronomyShow) -> Self {
        Self {
            show_themes: show.theme_names(),
            id: show.id,
            title: show.title,
            description: show.description,
        }
    }
}

/// Detail representation: embedded theme objects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AstronomyShowDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub show_themes: Vec<ShowThemeResponse>,
}

impl From<AstronomyShow> for AstronomyShowDetail {
    fn from(show: AstronomyShow) -> Self {
        Self {
            id: show.id,
            title: show.title,
            description: show.description,
            show_themes: show.show_themes.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Domes and sessions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanetariumDomeResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<PlanetariumDome> for PlanetariumDomeResponse {
    fn from(dome: PlanetariumDome) -> Self {
        Self {
            capacity: dome.capacity(),
            id: dome.id,
            name: dome.name,
            rows: dome.rows,
            seats_in_row: dome.seats_in_row,
        }
    }
}

/// Session as written: references by ID
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowSessionResponse {
    pub id: i64,
    pub show_time: String,
    pub astronomy_show: i64,
    pub planetarium_dome: i64,
}

impl From<ShowSession> for ShowSessionResponse {
    fn from(session: ShowSession) -> Self {
        Self {
            id: session.id,
            show_time: format_time(&session.show_time),
            astronomy_show: session.astronomy_show_id,
            planetarium_dome: session.planetarium_dome_id,
        }
    }
}

impl From<ShowSessionSummary> for ShowSessionResponse {
    fn from(summary: ShowSessionSummary) -> Self {
        Self {
            id: summary.id,
            show_time: format_time(&summary.show_time),
            astronomy_show: summary.astronomy_show_id,
            planetarium_dome: summary.planetarium_dome_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowSessionListItem {
    pub id: i64,
    pub show_time: String,
    pub astronomy_show_title: String,
    pub planetarium_dome_name: String,
    pub planetarium_dome_capacity: i64,
    pub tickets_available: i64,
}

impl From<ShowSessionSummary> for ShowSessionListItem {
    fn from(summary: ShowSessionSummary) -> Self {
        Self {
            tickets_available: summary.tickets_available(),
            id: summary.id,
            show_time: format_time(&summary.show_time),
            astronomy_show_title: summary.astronomy_show_title,
            planetarium_dome_name: summary.planetarium_dome_name,
            planetarium_dome_capacity: summary.planetarium_dome_capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowSessionDetailResponse {
    pub id: i64,
    pub show_time: String,
    pub astronomy_show: AstronomyShowListItem,
    pub planetarium_dome: PlanetariumDomeResponse,
    pub taken_places: Vec<SeatPosition>,
}

impl From<ShowSessionDetail> for ShowSessionDetailResponse {
    fn from(detail: ShowSessionDetail) -> Self {
        Self {
            id: detail.id,
            show_time: format_time(&detail.show_time),
            astronomy_show: detail.astronomy_show.into(),
            planetarium_dome: detail.planetarium_dome.into(),
            taken_places: detail.taken_places,
        }
    }
}

// ============================================================================
// Reservations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketResponse {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: ShowSessionListItem,
}

impl From<TicketWithSession> for TicketResponse {
    fn from(ticket: TicketWithSession) -> Self {
        Self {
            id: ticket.id,
            row: ticket.row,
            seat: ticket.seat,
            show_session: ticket.show_session.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservationResponse {
    pub id: i64,
    pub created_at: String,
    pub tickets: Vec<TicketResponse>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: reservation.id,
            created_at: format_time(&reservation.created_at),
            tickets: reservation.tickets.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    /// Convert every item of a page into its representation
    pub fn from_paged<M>(paged: PagedResult<M>) -> Self
    where
        M: Into<T>,
    {
        let total_pages = paged.total_pages();
        Self {
            results: paged.items.into_iter().map(Into::into).collect(),
            total: paged.total,
            page: paged.page,
            page_size: paged.per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListParams, UserRole};
    use chrono::TimeZone;

    fn show() -> AstronomyShow {
        AstronomyShow {
            id: 3,
            title: "Orion".to_string(),
            description: "Winter sky".to_string(),
            show_themes: vec![
                ShowTheme { id: 1, name: "Stars".to_string() },
                ShowTheme { id: 4, name: "Nebulae".to_string() },
            ],
        }
    }

    #[test]
    fn test_show_list_item_names_themes() {
        let item = AstronomyShowListItem::from(show());
        assert_eq!(item.show_themes, vec!["Stars", "Nebulae"]);

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["show_themes"], serde_json::json!(["Stars", "Nebulae"]));
    }

    #[test]
    fn test_show_detail_embeds_themes() {
        let json = serde_json::to_value(AstronomyShowDetail::from(show())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3,
                "title": "Orion",
                "description": "Winter sky",
                "show_themes": [{"id": 1, "name": "Stars"}, {"id": 4, "name": "Nebulae"}]
            })
        );
    }

    #[test]
    fn test_dome_capacity() {
        let dome = PlanetariumDome::new("Blue".to_string(), 12, 20);
        assert_eq!(PlanetariumDomeResponse::from(dome).capacity, 240);
    }

    #[test]
    fn test_session_list_item() {
        let summary = ShowSessionSummary {
            id: 1,
            show_time: Utc.with_ymd_and_hms(2025, 3, 14, 18, 0, 0).unwrap(),
            astronomy_show_id: 3,
            astronomy_show_title: "Orion".to_string(),
            planetarium_dome_id: 2,
            planetarium_dome_name: "Blue".to_string(),
            planetarium_dome_capacity: 50,
            tickets_sold: 8,
        };
        let item = ShowSessionListItem::from(summary);
        assert_eq!(item.show_time, "2025-03-14T18:00:00Z");
        assert_eq!(item.tickets_available, 42);
    }

    #[test]
    fn test_user_response_hides_nothing_secret() {
        let user = User::new("a@planetarium.test".to_string(), "secret".to_string(), UserRole::Admin);
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"is_staff\":true"));
    }

    #[test]
    fn test_paginated_response() {
        let params = ListParams::new(2, 2);
        let paged = PagedResult::new(vec![ShowTheme::new("Stars".to_string())], 3, &params);
        let response: PaginatedResponse<ShowThemeResponse> = PaginatedResponse::from_paged(paged);

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.page, 2);
        assert_eq!(response.page_size, 2);
        assert_eq!(response.total_pages, 2);
    }
}

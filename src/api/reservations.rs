//! Reservation API endpoints
//!
//! - GET /api/v1/reservations - the caller's reservations, paginated
//! - POST /api/v1/reservations - book tickets for the caller

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{JsonBody, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PaginatedResponse, ReservationResponse};
use crate::models::{CreateReservationInput, ListParams, TicketInput};

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub row: i32,
    pub seat: i32,
    pub show_session: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    #[serde(default)]
    pub tickets: Vec<TicketRequest>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

/// GET /api/v1/reservations
async fn list_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<ReservationResponse>>, ApiError> {
    let params: ListParams = query.into();
    let page = state.reservation_service.list_by_user(user.id, &params).await?;
    Ok(Json(PaginatedResponse::from_paged(page)))
}

/// POST /api/v1/reservations
async fn create_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let input = CreateReservationInput {
        user_id: user.id,
        tickets: body
            .tickets
            .into_iter()
            .map(|t| TicketInput {
                row: t.row,
                seat: t.seat,
                show_session_id: t.show_session,
            })
            .collect(),
    };

    let reservation = state.reservation_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}

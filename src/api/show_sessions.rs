//! Show session API endpoints
//!
//! - GET /api/v1/show_sessions - list, filtered by `date` and `astronomy_show`
//! - GET /api/v1/show_sessions/{id} - detail with taken places
//! - POST /api/v1/show_sessions - schedule (admin)
//! - PUT /api/v1/show_sessions/{id} - reschedule (admin)
//! - DELETE /api/v1/show_sessions/{id} - cancel (admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{non_blank, parse_date, parse_show_time, JsonBody};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ShowSessionDetailResponse, ShowSessionListItem, ShowSessionResponse};
use crate::models::{ShowSessionFilter, ShowSessionInput};

#[derive(Debug, Default, Deserialize)]
pub struct ListShowSessionsQuery {
    pub date: Option<String>,
    pub astronomy_show: Option<String>,
}

impl ListShowSessionsQuery {
    fn into_filter(self) -> Result<ShowSessionFilter, ApiError> {
        let date = non_blank(self.date.as_deref()).map(parse_date).transpose()?;
        let astronomy_show_id = non_blank(self.astronomy_show.as_deref())
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| ApiError::validation_error(format!("Invalid astronomy_show id: '{}'", raw)))
            })
            .transpose()?;

        Ok(ShowSessionFilter {
            date,
            astronomy_show_id,
        })
    }
}

/// Body for create and update; every field is required
#[derive(Debug, Deserialize)]
pub struct ShowSessionRequest {
    pub astronomy_show: Option<i64>,
    pub planetarium_dome: Option<i64>,
    pub show_time: Option<String>,
}

impl ShowSessionRequest {
    fn into_input(self) -> Result<ShowSessionInput, ApiError> {
        let astronomy_show_id = self
            .astronomy_show
            .ok_or_else(|| ApiError::validation_error("astronomy_show is required"))?;
        let planetarium_dome_id = self
            .planetarium_dome
            .ok_or_else(|| ApiError::validation_error("planetarium_dome is required"))?;
        let show_time = self
            .show_time
            .as_deref()
            .ok_or_else(|| ApiError::validation_error("show_time is required"))
            .and_then(parse_show_time)?;

        Ok(ShowSessionInput {
            astronomy_show_id,
            planetarium_dome_id,
            show_time,
        })
    }
}

pub fn reader_router() -> Router<AppState> {
    Router::new()
        .route("/show_sessions", get(list_show_sessions))
        .route("/show_sessions/{id}", get(get_show_session))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/show_sessions", post(create_show_session))
        .route("/show_sessions/{id}", put(update_show_session).delete(delete_show_session))
}

/// GET /api/v1/show_sessions
async fn list_show_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListShowSessionsQuery>,
) -> Result<Json<Vec<ShowSessionListItem>>, ApiError> {
    let filter = query.into_filter()?;
    let sessions = state.show_session_service.list(&filter).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/show_sessions/{id}
async fn get_show_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShowSessionDetailResponse>, ApiError> {
    let detail = state.show_session_service.get_detail(id).await?;
    Ok(Json(detail.into()))
}

/// POST /api/v1/show_sessions
async fn create_show_session(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ShowSessionRequest>,
) -> Result<(StatusCode, Json<ShowSessionResponse>), ApiError> {
    let session = state.show_session_service.create(body.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// PUT /api/v1/show_sessions/{id}
async fn update_show_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ShowSessionRequest>,
) -> Result<Json<ShowSessionResponse>, ApiError> {
    let session = state.show_session_service.update(id, body.into_input()?).await?;
    Ok(Json(session.into()))
}

/// DELETE /api/v1/show_sessions/{id}
async fn delete_show_session(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.show_session_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Planetarium dome API endpoints
//!
//! - GET /api/v1/planetarium_domes - list domes (authenticated)
//! - POST /api/v1/planetarium_domes - create a dome (admin)
//! - GET /api/v1/planetarium_domes/{id} - dome detail

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::JsonBody;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::PlanetariumDomeResponse;
use crate::models::CreatePlanetariumDomeInput;

#[derive(Debug, Deserialize)]
pub struct CreatePlanetariumDomeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rows: i32,
    #[serde(default)]
    pub seats_in_row: i32,
}

pub fn reader_router() -> Router<AppState> {
    Router::new()
        .route("/planetarium_domes", get(list_domes))
        .route("/planetarium_domes/{id}", get(get_dome))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/planetarium_domes", post(create_dome))
}

/// GET /api/v1/planetarium_domes
async fn list_domes(State(state): State<AppState>) -> Result<Json<Vec<PlanetariumDomeResponse>>, ApiError> {
    let domes = state.planetarium_dome_service.list().await?;
    Ok(Json(domes.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/planetarium_domes/{id}
async fn get_dome(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PlanetariumDomeResponse>, ApiError> {
    let dome = state.planetarium_dome_service.get(id).await?;
    Ok(Json(dome.into()))
}

/// POST /api/v1/planetarium_domes
async fn create_dome(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreatePlanetariumDomeRequest>,
) -> Result<(StatusCode, Json<PlanetariumDomeResponse>), ApiError> {
    let dome = state
        .planetarium_dome_service
        .create(CreatePlanetariumDomeInput {
            name: body.name,
            rows: body.rows,
            seats_in_row: body.seats_in_row,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(dome.into())))
}

//! Show theme API endpoints
//!
//! - GET /api/v1/show_themes - list themes (authenticated)
//! - POST /api/v1/show_themes - create a theme (admin)

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::JsonBody;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ShowThemeResponse;

#[derive(Debug, Deserialize)]
pub struct CreateShowThemeRequest {
    #[serde(default)]
    pub name: String,
}

pub fn reader_router() -> Router<AppState> {
    Router::new().route("/show_themes", get(list_show_themes))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/show_themes", post(create_show_theme))
}

/// GET /api/v1/show_themes
async fn list_show_themes(State(state): State<AppState>) -> Result<Json<Vec<ShowThemeResponse>>, ApiError> {
    let themes = state.show_theme_service.list().await?;
    Ok(Json(themes.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/show_themes
async fn create_show_theme(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateShowThemeRequest>,
) -> Result<(StatusCode, Json<ShowThemeResponse>), ApiError> {
    let theme = state.show_theme_service.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(theme.into())))
}

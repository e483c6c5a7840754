//! Astronomy show API endpoints
//!
//! - GET /api/v1/astronomy_shows - list, filtered by `title` and `genres`
//! - POST /api/v1/astronomy_shows - create (admin)
//! - GET /api/v1/astronomy_shows/{id} - detail
//!
//! Shows are never updated or deleted through the API, so PUT and DELETE
//! on the detail route answer 405 for every caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{non_blank, JsonBody};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{AstronomyShowDetail, AstronomyShowListItem};
use crate::models::{AstronomyShowFilter, CreateAstronomyShowInput};

/// Listing filters. `show_themes` is accepted as an alias of `genres`.
#[derive(Debug, Default, Deserialize)]
pub struct ListAstronomyShowsQuery {
    pub title: Option<String>,
    pub genres: Option<String>,
    pub show_themes: Option<String>,
}

impl ListAstronomyShowsQuery {
    fn into_filter(self) -> Result<AstronomyShowFilter, ApiError> {
        let genres = non_blank(self.genres.as_deref()).or(non_blank(self.show_themes.as_deref()));
        AstronomyShowFilter::from_query(self.title.as_deref(), genres).map_err(ApiError::validation_error)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAstronomyShowRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub show_themes: Option<Vec<i64>>,
}

pub fn reader_router() -> Router<AppState> {
    Router::new()
        .route("/astronomy_shows", get(list_astronomy_shows))
        .route("/astronomy_shows/{id}", get(get_astronomy_show))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/astronomy_shows", post(create_astronomy_show))
}

/// Unauthenticated, so the answer is 405 even without credentials
pub fn public_router() -> Router<AppState> {
    Router::new().route(
        "/astronomy_shows/{id}",
        put(show_method_not_allowed).delete(show_method_not_allowed),
    )
}

/// GET /api/v1/astronomy_shows
async fn list_astronomy_shows(
    State(state): State<AppState>,
    Query(query): Query<ListAstronomyShowsQuery>,
) -> Result<Json<Vec<AstronomyShowListItem>>, ApiError> {
    let filter = query.into_filter()?;
    let shows = state.astronomy_show_service.list(&filter).await?;
    Ok(Json(shows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/astronomy_shows/{id}
async fn get_astronomy_show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AstronomyShowDetail>, ApiError> {
    let show = state.astronomy_show_service.get(id).await?;
    Ok(Json(show.into()))
}

/// POST /api/v1/astronomy_shows
async fn create_astronomy_show(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateAstronomyShowRequest>,
) -> Result<(StatusCode, Json<AstronomyShowDetail>), ApiError> {
    let input = CreateAstronomyShowInput {
        title: body.title,
        description: body.description.unwrap_or_default(),
        show_themes: body.show_themes.unwrap_or_default(),
    };

    let show = state.astronomy_show_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(show.into())))
}

/// PUT and DELETE /api/v1/astronomy_shows/{id}
async fn show_method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("Astronomy shows cannot be modified or deleted")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(title: Option<&str>, genres: Option<&str>, show_themes: Option<&str>) -> ListAstronomyShowsQuery {
        ListAstronomyShowsQuery {
            title: title.map(str::to_string),
            genres: genres.map(str::to_string),
            show_themes: show_themes.map(str::to_string),
        }
    }

    #[test]
    fn test_genres_and_alias() {
        let filter = query(None, Some("1,2"), None).into_filter().unwrap();
        assert_eq!(filter.theme_ids, Some(vec![1, 2]));

        let filter = query(None, None, Some("3")).into_filter().unwrap();
        assert_eq!(filter.theme_ids, Some(vec![3]));

        // genres wins when both are present
        let filter = query(None, Some("4"), Some("5")).into_filter().unwrap();
        assert_eq!(filter.theme_ids, Some(vec![4]));
    }

    #[test]
    fn test_blank_values_mean_no_filter() {
        let filter = query(Some("  "), Some(""), None).into_filter().unwrap();
        assert_eq!(filter, AstronomyShowFilter::default());
    }

    #[test]
    fn test_bad_theme_id_is_validation_error() {
        let err = query(None, Some("1,abc"), None).into_filter().unwrap_err();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
    }
}

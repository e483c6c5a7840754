//! Common API utilities and shared types

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};

use crate::api::middleware::ApiError;
use crate::models::ListParams;

// ============================================================================
// Pagination
// ============================================================================

pub fn default_page() -> u32 {
    1
}

pub fn default_page_size() -> u32 {
    10
}

/// `page` / `page_size` query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl From<PaginationQuery> for ListParams {
    fn from(query: PaginationQuery) -> Self {
        ListParams::new(query.page, query.page_size)
    }
}

// ============================================================================
// JSON bodies
// ============================================================================

/// `Json` extractor whose rejections use the API error envelope (400)
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection_error(rejection)),
        }
    }
}

fn json_rejection_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation_error(format!("Invalid request body: {}", rejection.body_text()))
}

// ============================================================================
// Date and time parameters
// ============================================================================

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a show time: RFC 3339, or a naive date-time taken as UTC
pub fn parse_show_time(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::validation_error(format!("Invalid show_time: '{}'", raw)))
}

/// Parse a `YYYY-MM-DD` query value
pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation_error(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// Treat blank query values as absent
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

//! API middleware
//!
//! Shared state, the JSON error envelope, and the access gate:
//! `require_auth` resolves the session token (bearer header or `session`
//! cookie) to a user on every request, `require_admin` then checks the role.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::MemoryCache;
use crate::config::AuthConfig;
use crate::db::repositories::{
    SqlxAstronomyShowRepository, SqlxPlanetariumDomeRepository, SqlxReservationRepository,
    SqlxSessionRepository, SqlxShowSessionRepository, SqlxShowThemeRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use crate::services::{
    AstronomyShowService, AstronomyShowServiceError, PlanetariumDomeService, PlanetariumDomeServiceError,
    ReservationService, ReservationServiceError, ShowSessionService, ShowSessionServiceError,
    ShowThemeService, ShowThemeServiceError, UserService, UserServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Request counters updated with relaxed atomics
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub show_theme_service: Arc<ShowThemeService>,
    pub astronomy_show_service: Arc<AstronomyShowService>,
    pub planetarium_dome_service: Arc<PlanetariumDomeService>,
    pub show_session_service: Arc<ShowSessionService>,
    pub reservation_service: Arc<ReservationService>,
    pub request_stats: Arc<RequestStats>,
    /// Lifetime of the `session` cookie, matching server-side expiry
    pub session_max_age_secs: i64,
    /// Send the `session` cookie only over https
    pub secure_cookie: bool,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn new(pool: DynDatabasePool, cache: Arc<MemoryCache>, auth: &AuthConfig) -> Self {
        let theme_repo = SqlxShowThemeRepository::boxed(pool.clone());
        let show_repo = SqlxAstronomyShowRepository::boxed(pool.clone());
        let dome_repo = SqlxPlanetariumDomeRepository::boxed(pool.clone());
        let session_repo = SqlxShowSessionRepository::boxed(pool.clone());

        let user_service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            auth.session_expiration_days,
        );

        Self {
            user_service: Arc::new(user_service),
            show_theme_service: Arc::new(ShowThemeService::new(theme_repo.clone(), cache.clone())),
            astronomy_show_service: Arc::new(AstronomyShowService::new(show_repo.clone(), theme_repo, cache)),
            planetarium_dome_service: Arc::new(PlanetariumDomeService::new(dome_repo.clone())),
            show_session_service: Arc::new(ShowSessionService::new(
                session_repo.clone(),
                show_repo,
                dome_repo.clone(),
            )),
            reservation_service: Arc::new(ReservationService::new(
                SqlxReservationRepository::boxed(pool.clone()),
                session_repo,
                dome_repo,
            )),
            request_stats: Arc::new(RequestStats::new()),
            session_max_age_secs: auth.session_expiration_days * 24 * 60 * 60,
            secure_cookie: auth.secure_cookie.unwrap_or(false),
            pool,
        }
    }

    /// Override the cookie `Secure` flag, e.g. with `Config::secure_cookie`
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new("METHOD_NOT_ALLOWED", message)
    }

    /// Log the cause and answer with a generic message
    pub fn internal_error(err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "Request failed");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "METHOD_NOT_ALLOWED" => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ShowThemeServiceError> for ApiError {
    fn from(err: ShowThemeServiceError) -> Self {
        match err {
            ShowThemeServiceError::NotFound(msg) => ApiError::not_found(msg),
            ShowThemeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ShowThemeServiceError::Conflict(msg) => ApiError::conflict(msg),
            ShowThemeServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<AstronomyShowServiceError> for ApiError {
    fn from(err: AstronomyShowServiceError) -> Self {
        match err {
            AstronomyShowServiceError::NotFound(msg) => ApiError::not_found(msg),
            AstronomyShowServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AstronomyShowServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<PlanetariumDomeServiceError> for ApiError {
    fn from(err: PlanetariumDomeServiceError) -> Self {
        match err {
            PlanetariumDomeServiceError::NotFound(msg) => ApiError::not_found(msg),
            PlanetariumDomeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PlanetariumDomeServiceError::Conflict(msg) => ApiError::conflict(msg),
            PlanetariumDomeServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ShowSessionServiceError> for ApiError {
    fn from(err: ShowSessionServiceError) -> Self {
        match err {
            ShowSessionServiceError::NotFound(msg) => ApiError::not_found(msg),
            ShowSessionServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ShowSessionServiceError::Conflict(msg) => ApiError::conflict(msg),
            ShowSessionServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ReservationServiceError> for ApiError {
    fn from(err: ReservationServiceError) -> Self {
        match err {
            ReservationServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ReservationServiceError::Conflict(msg) => ApiError::conflict(msg),
            ReservationServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

// ============================================================================
// Access gate
// ============================================================================

/// Session token from `Authorization: Bearer` or the `session` cookie
pub(crate) fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    for cookie_header in request.headers().get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware; must run after `require_auth`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    Ok(next.run(request).await)
}

/// Request statistics middleware
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - create an account (first one is admin)
//! - POST /api/v1/auth/login - open a session
//! - POST /api/v1/auth/logout - close the current session
//! - GET /api/v1/auth/me - current user
//!
//! Register and login return the session token in the body and also set it
//! as an HttpOnly `session` cookie.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::JsonBody;
use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthResponse, UserResponse};
use crate::models::CreateUserInput;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Routes open to anonymous callers
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderMap, ApiError> {
    let mut cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal_error)?,
    );
    Ok(headers)
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state
        .user_service
        .register(CreateUserInput {
            email: body.email,
            password: body.password,
            role: None,
        })
        .await?;

    let (user, session) = state.user_service.login(&user.email, &password).await?;
    let headers = session_cookie(&session.id, state.session_max_age_secs, state.secure_cookie)?;

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(&body.email, &body.password).await?;
    let headers = session_cookie(&session.id, state.session_max_age_secs, state.secure_cookie)?;

    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(State(state): State<AppState>, request: Request) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request) {
        state.user_service.logout(&token).await?;
    }

    // Expire the cookie on the client as well
    let headers = session_cookie("", 0, state.secure_cookie)?;
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/v1/auth/me
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user.into())
}

//! API layer - HTTP handlers and routing
//!
//! Every resource lives under `/api/v1`. Routes are grouped by access:
//! public (auth, health), authenticated readers, and admin writers. Each
//! resource module contributes a router per group and the groups are merged
//! here, so a path can carry a GET for readers and a POST for admins.

pub mod astronomy_shows;
pub mod auth;
pub mod common;
pub mod health;
pub mod middleware;
pub mod planetarium_domes;
pub mod reservations;
pub mod responses;
pub mod show_sessions;
pub mod show_themes;


use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, RequestStats};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Writes to the catalogue (need admin role)
    let admin_routes = Router::new()
        .merge(show_themes::admin_router())
        .merge(astronomy_shows::admin_router())
        .merge(planetarium_domes::admin_router())
        .merge(show_sessions::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Reads and own reservations (need any account)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(show_themes::reader_router())
        .merge(astronomy_shows::reader_router())
        .merge(planetarium_domes::reader_router())
        .merge(show_sessions::reader_router())
        .merge(reservations::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .merge(auth::public_router())
        .merge(astronomy_shows::public_router())
        .merge(health::router())
        .merge(protected_routes)
        .merge(admin_routes)
}

/// Build the complete router with middleware
///
/// `cors_origin` is either one exact origin, which may send the session
/// cookie, or `*`, which allows any origin without credentials.
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]);
    let cors = if cors_origin.trim() == "*" {
        cors.allow_origin(Any)
    } else {
        let origin = cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
        cors.allow_origin(origin).allow_credentials(true)
    };

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .fallback(route_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Outermost, so every request is counted
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

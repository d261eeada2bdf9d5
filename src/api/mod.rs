//! API layer - HTTP handlers and routing
//!
//! JSON endpoints under `/api/v1`:
//! - `/auth` - registration, login, logout, current principal
//! - `/content` - published content, open to everyone
//! - `/studio` - authors' own drafts and submissions
//! - `/admin/review` - the review queue and decisions
//! - `/admin/explorer` - read-only table browser
//!
//! Authorization is decided by the services; handlers only resolve the
//! caller with [`MaybePrincipal`] and translate errors.

pub mod auth;
pub mod common;
pub mod content;
pub mod explorer;
pub mod health;
pub mod middleware;
pub mod review;
pub mod studio;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, MaybePrincipal};

/// Build the `/api/v1` router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/content", content::router())
        .nest("/studio", studio::router())
        .nest("/admin/review", review::router())
        .nest("/admin/explorer", explorer::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors_origin = state.config.server.cors_origin.clone();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %cors_origin, "Invalid CORS origin; cross-origin requests disabled");
            cors
        }
    };

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", build_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

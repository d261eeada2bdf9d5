//! GET /health - liveness, database reachability and schema version

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::db::migrations;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    /// `current`, `pending`, or `unknown` when the database is unreachable
    pub migrations: &'static str,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.pool.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            "unreachable"
        }
    };

    let schema = if database == "ok" {
        match migrations::is_up_to_date(&state.pool).await {
            Ok(true) => "current",
            Ok(false) => {
                tracing::warn!("Health check: migrations pending");
                "pending"
            }
            Err(e) => {
                tracing::warn!(error = %e, "Health check: cannot read migration state");
                "unknown"
            }
        }
    } else {
        "unknown"
    };

    let status = if schema == "current" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if status.is_success() { "ok" } else { "degraded" },
            database,
            migrations: schema,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

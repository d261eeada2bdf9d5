//! Studio API endpoints: authors working on their own content
//!
//! - POST /api/v1/studio/{kind} - Create a draft
//! - GET /api/v1/studio/{kind} - The caller's items
//! - GET /api/v1/studio/{kind}/{id} - One item in any status
//! - PUT /api/v1/studio/{kind}/{id} - Replace the payload
//! - POST /api/v1/studio/{kind}/{id}/submit - Send a draft for review

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{
    parse_kind, ApiError, ApiJson, ApiPath, AppState, MaybePrincipal,
};
use crate::models::{ContentItem, ContentKind, ContentPayload};
use crate::services::moderation::submitted_message;
use crate::services::{policy, ServiceError, TransitionOutcome};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", post(create).get(list_mine))
        .route("/{kind}/{id}", get(get_one).put(update))
        .route("/{kind}/{id}/submit", post(submit))
}

/// Decode a request body for `kind`. The role gate runs first so callers who
/// may not author `kind` learn nothing from payload errors.
fn payload(
    kind: ContentKind,
    principal: &MaybePrincipal,
    body: serde_json::Value,
) -> Result<ContentPayload, ApiError> {
    if !policy::can_create(principal.as_ref(), kind) {
        return Err(ServiceError::Forbidden.into());
    }
    ContentPayload::from_json(kind, body)
        .map_err(|e| ApiError::validation_error(format!("Invalid {} payload: {}", kind, e)))
}

async fn create(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath(kind): ApiPath<String>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let item = state
        .moderation
        .create_draft(kind, principal.as_ref(), payload(kind, &principal, body)?)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn list_mine(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath(kind): ApiPath<String>,
) -> Result<Json<Vec<ContentItem>>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.moderation.my_items(kind, principal.as_ref()).await?))
}

async fn get_one(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
) -> Result<Json<ContentItem>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.moderation.get_for(kind, id, principal.as_ref()).await?))
}

async fn update(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<ContentItem>, ApiError> {
    let kind = parse_kind(&kind)?;
    let item = state
        .moderation
        .edit(kind, id, principal.as_ref(), payload(kind, &principal, body)?)
        .await?;
    Ok(Json(item))
}

async fn submit(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let kind = parse_kind(&kind)?;
    let item = state.moderation.submit(kind, id, principal.as_ref()).await?;
    Ok(Json(TransitionOutcome {
        item,
        message: submitted_message(kind),
    }))
}

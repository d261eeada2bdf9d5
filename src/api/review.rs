//! Review API endpoints (admins)
//!
//! - GET /api/v1/admin/review/{kind} - Pending items, paginated
//! - POST /api/v1/admin/review/{kind}/{id} - Approve or reject

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PageQuery;
use crate::api::middleware::{
    parse_kind, ApiError, ApiJson, ApiPath, ApiQuery, AppState, MaybePrincipal,
};
use crate::models::{ContentItem, PagedResult};
use crate::services::{ReviewAction, TransitionOutcome};

/// Request body for a review decision
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    #[serde(default)]
    pub feedback: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", get(queue))
        .route("/{kind}/{id}", post(review))
}

async fn queue(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<PagedResult<ContentItem>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let page = state
        .moderation
        .review_queue(kind, principal.as_ref(), query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

async fn review(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let kind = parse_kind(&kind)?;
    let outcome = state
        .moderation
        .review(
            kind,
            id,
            principal.as_ref(),
            body.action,
            body.feedback.as_deref(),
        )
        .await?;
    Ok(Json(outcome))
}

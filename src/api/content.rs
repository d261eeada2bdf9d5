//! Public content API endpoints
//!
//! Published items only, with their markup sanitized.
//!
//! - GET /api/v1/content/{kind}
//! - GET /api/v1/content/{kind}/{id}

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{parse_kind, ApiError, ApiPath, ApiQuery, AppState};
use crate::models::{ContentItem, PagedResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", get(list_published))
        .route("/{kind}/{id}", get(get_published))
}

async fn list_published(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<PagedResult<ContentItem>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let page = state
        .moderation
        .list_published(kind, query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

async fn get_published(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
) -> Result<Json<ContentItem>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.moderation.get_published(kind, id).await?))
}

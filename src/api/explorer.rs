//! Data explorer endpoint (admins)
//!
//! - GET /api/v1/admin/explorer/{table}?page=&page_size=

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, ApiPath, ApiQuery, AppState, MaybePrincipal};
use crate::services::ExplorerPage;

pub fn router() -> Router<AppState> {
    Router::new().route("/{table}", get(list_table))
}

async fn list_table(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    ApiPath(table): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ExplorerPage>, ApiError> {
    let page = state
        .explorer
        .list_table(principal.as_ref(), &table, query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

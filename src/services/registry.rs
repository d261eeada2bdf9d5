//! Content registry
//!
//! Uniform access to every content kind. Each kind is backed by its own
//! [`ContentStore`]; the registry routes by [`ContentKind`] and turns storage
//! failures into [`ServiceError::StoreError`].
//!
//! Status can only be written through [`ContentRegistry::transition`], which
//! is crate-private and used by the moderation service alone.

use std::collections::HashMap;

use anyhow::anyhow;

use crate::db::repositories::{sql_content_stores, DynContentStore, MemoryContentStore};
use crate::db::DynDatabasePool;
use crate::models::{
    ContentItem, ContentKind, ContentPatch, ContentPayload, ContentStatus, ListParams,
    PagedResult, StatusChange,
};
use crate::services::error::{ServiceError, ServiceResult};

/// Validate 1-based paging input and clamp the page size to `max_page_size`.
pub fn page_params(page: i64, page_size: i64, max_page_size: u32) -> ServiceResult<ListParams> {
    if page < 1 {
        return Err(ServiceError::validation("page must be at least 1"));
    }
    if page_size < 1 {
        return Err(ServiceError::validation("page_size must be at least 1"));
    }
    let page = u32::try_from(page).map_err(|_| ServiceError::validation("page is too large"))?;
    let page_size = page_size.min(max_page_size as i64) as u32;
    Ok(ListParams { page, page_size })
}

pub struct ContentRegistry {
    stores: HashMap<ContentKind, DynContentStore>,
}

impl ContentRegistry {
    /// Build a registry from one store per kind. A later store for the same
    /// kind replaces an earlier one.
    pub fn new(stores: Vec<DynContentStore>) -> Self {
        Self {
            stores: stores.into_iter().map(|s| (s.kind(), s)).collect(),
        }
    }

    /// SQL-backed stores for every kind
    pub fn from_pool(pool: &DynDatabasePool) -> Self {
        Self::new(sql_content_stores(pool))
    }

    /// In-process stores for every kind
    pub fn in_memory() -> Self {
        Self::new(
            ContentKind::ALL
                .iter()
                .map(|kind| MemoryContentStore::boxed(*kind))
                .collect(),
        )
    }

    fn store(&self, kind: ContentKind) -> ServiceResult<&DynContentStore> {
        self.stores
            .get(&kind)
            .ok_or_else(|| ServiceError::StoreError(anyhow!("No store registered for {}", kind)))
    }

    pub async fn get(&self, kind: ContentKind, id: i64) -> ServiceResult<Option<ContentItem>> {
        Ok(self.store(kind)?.get(id).await?)
    }

    pub async fn list_by_status(
        &self,
        kind: ContentKind,
        status: ContentStatus,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<ContentItem>> {
        let store = self.store(kind)?;
        let items = store.list_by_status(status, params).await?;
        let total = store.count_by_status(status).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn list_by_owner(
        &self,
        kind: ContentKind,
        owner_id: i64,
    ) -> ServiceResult<Vec<ContentItem>> {
        Ok(self.store(kind)?.list_by_owner(owner_id).await?)
    }

    /// Create a new item in `draft`.
    pub async fn create(
        &self,
        kind: ContentKind,
        owner_id: i64,
        payload: ContentPayload,
    ) -> ServiceResult<ContentItem> {
        check_payload(kind, &payload)?;
        Ok(self.store(kind)?.insert(owner_id, &payload).await?)
    }

    /// Replace an item's payload. Status is untouched.
    pub async fn update(
        &self,
        kind: ContentKind,
        id: i64,
        patch: ContentPatch,
    ) -> ServiceResult<ContentItem> {
        check_payload(kind, &patch.payload)?;
        self.store(kind)?
            .update_payload(id, &patch.payload)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind, id)))
    }

    /// Apply `change` if the item is still in `expected`; `None` if it is not
    /// (or does not exist).
    pub(crate) async fn transition(
        &self,
        kind: ContentKind,
        id: i64,
        expected: ContentStatus,
        change: &StatusChange,
    ) -> ServiceResult<Option<ContentItem>> {
        Ok(self
            .store(kind)?
            .apply_transition(id, expected, change)
            .await?)
    }
}

fn check_payload(kind: ContentKind, payload: &ContentPayload) -> ServiceResult<()> {
    if payload.kind() != kind {
        return Err(ServiceError::validation(format!(
            "Expected a {} payload, got {}",
            kind,
            payload.kind()
        )));
    }
    payload.validate().map_err(ServiceError::ValidationError)
}

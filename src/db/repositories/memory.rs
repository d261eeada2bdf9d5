//! In-process content store
//!
//! Behaves like the SQL stores, including the conditional transition: the
//! status check and the write happen under one write lock.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::content::{kind_mismatch, ContentStore, DynContentStore};
use crate::models::{
    ContentItem, ContentKind, ContentPayload, ContentStatus, ListParams, StatusChange,
};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    items: HashMap<i64, ContentItem>,
}

pub struct MemoryContentStore {
    kind: ContentKind,
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryContentStore {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            state: Arc::new(RwLock::new(MemoryState::default())),
        }
    }

    pub fn boxed(kind: ContentKind) -> DynContentStore {
        Arc::new(Self::new(kind))
    }

    fn check_kind(&self, payload: &ContentPayload) -> Result<()> {
        if payload.kind() == self.kind {
            Ok(())
        } else {
            Err(kind_mismatch(self.kind, payload))
        }
    }
}

// Newest-updated first, id breaking ties, same as the SQL stores.
fn sort_recent_first(items: &mut [ContentItem]) {
    items.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn kind(&self) -> ContentKind {
        self.kind
    }

    async fn get(&self, id: i64) -> Result<Option<ContentItem>> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn list_by_status(
        &self,
        status: ContentStatus,
        params: &ListParams,
    ) -> Result<Vec<ContentItem>> {
        let state = self.state.read().await;
        let mut items: Vec<ContentItem> = state
            .items
            .values()
            .filter(|item| item.status == status)
            .cloned()
            .collect();
        sort_recent_first(&mut items);

        Ok(items
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit() as usize)
            .collect())
    }

    async fn count_by_status(&self, status: ContentStatus) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.items.values().filter(|i| i.status == status).count() as i64)
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<ContentItem>> {
        let state = self.state.read().await;
        let mut items: Vec<ContentItem> = state
            .items
            .values()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(items)
    }

    async fn insert(&self, owner_id: i64, payload: &ContentPayload) -> Result<ContentItem> {
        self.check_kind(payload)?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let now = Utc::now();
        let item = ContentItem {
            id: state.next_id,
            kind: self.kind,
            owner_id,
            status: ContentStatus::Draft,
            review_feedback: None,
            reviewed_at: None,
            reviewed_by: None,
            published_at: None,
            created_at: now,
            updated_at: now,
            payload: payload.clone(),
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_payload(
        &self,
        id: i64,
        payload: &ContentPayload,
    ) -> Result<Option<ContentItem>> {
        self.check_kind(payload)?;

        let mut state = self.state.write().await;
        Ok(state.items.get_mut(&id).map(|item| {
            item.payload = payload.clone();
            item.updated_at = Utc::now();
            item.clone()
        }))
    }

    async fn apply_transition(
        &self,
        id: i64,
        expected: ContentStatus,
        change: &StatusChange,
    ) -> Result<Option<ContentItem>> {
        let mut state = self.state.write().await;
        match state.items.get_mut(&id) {
            Some(item) if item.status == expected => {
                change.apply_to(item);
                Ok(Some(item.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticlePayload, EventPayload};

    fn article(title: &str) -> ContentPayload {
        ContentPayload::Article(ArticlePayload {
            title: title.to_string(),
            summary: None,
            body_html: String::new(),
        })
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryContentStore::new(ContentKind::Article);
        let a = store.insert(1, &article("a")).await.unwrap();
        let b = store.insert(1, &article("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn test_rejects_other_kind() {
        let store = MemoryContentStore::new(ContentKind::Article);
        let event = ContentPayload::Event(EventPayload {
            title: "e".to_string(),
            description_html: String::new(),
            location: None,
            starts_at: Utc::now(),
            ends_at: None,
        });
        assert!(store.insert(1, &event).await.is_err());
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let store = MemoryContentStore::new(ContentKind::Article);
        let item = store.insert(1, &article("a")).await.unwrap();

        let missed = store
            .apply_transition(item.id, ContentStatus::PendingReview, &StatusChange::submit(Utc::now()))
            .await
            .unwrap();
        assert!(missed.is_none());
        assert!(store
            .apply_transition(99, ContentStatus::Draft, &StatusChange::submit(Utc::now()))
            .await
            .unwrap()
            .is_none());

        let moved = store
            .apply_transition(item.id, ContentStatus::Draft, &StatusChange::submit(Utc::now()))
            .await
            .unwrap()
            .expect("moved");
        assert_eq!(moved.status, ContentStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_list_by_status_pages() {
        let store = MemoryContentStore::new(ContentKind::Article);
        for i in 0..5 {
            store.insert(1, &article(&format!("a{}", i))).await.unwrap();
        }

        let first = store
            .list_by_status(ContentStatus::Draft, &ListParams::new(1, 2))
            .await
            .unwrap();
        let third = store
            .list_by_status(ContentStatus::Draft, &ListParams::new(3, 2))
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(third.len(), 1);
        assert_eq!(store.count_by_status(ContentStatus::Draft).await.unwrap(), 5);
    }
}

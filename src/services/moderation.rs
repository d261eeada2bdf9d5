//! Moderation state machine
//!
//! ```text
//!            submit                 approve
//!   draft ──────────► pending_review ─────────► published
//!     ▲                     │
//!     └─────── reject ──────┘
//! ```
//!
//! Every transition runs the same checks in the same order:
//! principal and role gate, feedback validation (reject only), lookup,
//! ownership, status precondition, then a conditional write. The write only
//! succeeds if the item is still in the expected status, so of two
//! concurrent decisions on one item exactly one wins; the loser gets
//! `InvalidState`.
//!
//! Non-admin callers cannot tell a missing item from someone else's item:
//! both are `Forbidden`. Admins get `NotFound`.
//!
//! Each decision is written to the `editorial::audit` tracing target.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{
    ContentItem, ContentKind, ContentPatch, ContentPayload, ContentStatus, PagedResult,
    Principal, StatusChange, MAX_PAGE_SIZE,
};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::policy::{self, Action};
use crate::services::registry::{page_params, ContentRegistry};

/// Decision an admin takes on a pending item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl From<ReviewAction> for Action {
    fn from(action: ReviewAction) -> Self {
        match action {
            ReviewAction::Approve => Action::Approve,
            ReviewAction::Reject => Action::Reject,
        }
    }
}

/// An item after a lifecycle move, with a message for the actor
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub item: ContentItem,
    pub message: String,
}

pub fn approved_message(kind: ContentKind) -> String {
    format!("{} published", kind.label())
}

pub fn rejected_message(kind: ContentKind) -> String {
    format!("{} sent back to the {}", kind.label(), kind.author_title())
}

pub fn submitted_message(kind: ContentKind) -> String {
    format!("{} submitted for review", kind.label())
}

pub struct ModerationService {
    registry: Arc<ContentRegistry>,
}

impl ModerationService {
    pub fn new(registry: Arc<ContentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    /// Move a draft into the review queue.
    pub async fn submit(
        &self,
        kind: ContentKind,
        id: i64,
        principal: Option<&Principal>,
    ) -> ServiceResult<ContentItem> {
        self.transition(kind, id, principal, Action::Submit, None).await
    }

    /// Approve or reject a pending item.
    ///
    /// Rejection requires non-blank feedback, which is stored trimmed.
    pub async fn review(
        &self,
        kind: ContentKind,
        id: i64,
        principal: Option<&Principal>,
        action: ReviewAction,
        feedback: Option<&str>,
    ) -> ServiceResult<TransitionOutcome> {
        let item = self
            .transition(kind, id, principal, action.into(), feedback)
            .await?;
        let message = match action {
            ReviewAction::Approve => approved_message(kind),
            ReviewAction::Reject => rejected_message(kind),
        };
        Ok(TransitionOutcome { item, message })
    }

    async fn transition(
        &self,
        kind: ContentKind,
        id: i64,
        principal: Option<&Principal>,
        action: Action,
        feedback: Option<&str>,
    ) -> ServiceResult<ContentItem> {
        if !policy::role_may_attempt(principal, kind, action) {
            return Err(ServiceError::Forbidden);
        }
        let principal = principal.ok_or(ServiceError::Forbidden)?;

        let now = Utc::now();
        let change = match action {
            Action::Submit => StatusChange::submit(now),
            Action::Approve => StatusChange::approve(principal.user_id, now),
            Action::Reject => {
                StatusChange::reject(principal.user_id, required_feedback(feedback)?, now)
            }
        };

        let item = self.lookup(kind, id, principal).await?;

        if !policy::can_transition(Some(principal), &item, action) {
            return Err(ServiceError::Forbidden);
        }

        let expected = action.required_status();
        if item.status != expected {
            return Err(ServiceError::InvalidState {
                action: action.as_str(),
                current: item.status,
            });
        }

        let updated = match self.registry.transition(kind, id, expected, &change).await? {
            Some(updated) => updated,
            None => {
                // Someone else moved the item between the read and the write.
                let current = self
                    .registry
                    .get(kind, id)
                    .await?
                    .map(|i| i.status)
                    .unwrap_or(item.status);
                tracing::info!(
                    target: "editorial::audit",
                    kind = %kind,
                    id,
                    actor = principal.user_id,
                    decision = action.as_str(),
                    outcome = "lost_race",
                    "Moderation decision not applied"
                );
                return Err(ServiceError::InvalidState {
                    action: action.as_str(),
                    current,
                });
            }
        };

        tracing::info!(
            target: "editorial::audit",
            kind = %kind,
            id,
            actor = principal.user_id,
            decision = action.as_str(),
            from = %expected,
            to = %updated.status,
            has_feedback = updated.review_feedback.is_some(),
            "Moderation decision"
        );

        Ok(updated)
    }

    /// Fetch an item for an authenticated caller, hiding existence from
    /// non-admins.
    async fn lookup(
        &self,
        kind: ContentKind,
        id: i64,
        principal: &Principal,
    ) -> ServiceResult<ContentItem> {
        match self.registry.get(kind, id).await? {
            Some(item) => Ok(item),
            None if principal.is_admin() => {
                Err(ServiceError::NotFound(format!("{} {}", kind, id)))
            }
            None => Err(ServiceError::Forbidden),
        }
    }

    /// Create a draft owned by the caller.
    pub async fn create_draft(
        &self,
        kind: ContentKind,
        principal: Option<&Principal>,
        payload: ContentPayload,
    ) -> ServiceResult<ContentItem> {
        if !policy::can_create(principal, kind) {
            return Err(ServiceError::Forbidden);
        }
        let principal = principal.ok_or(ServiceError::Forbidden)?;

        let item = self.registry.create(kind, principal.user_id, payload).await?;
        tracing::info!(
            kind = %kind,
            id = item.id,
            owner = principal.user_id,
            title = item.payload.display_name(),
            "Draft created"
        );
        Ok(item)
    }

    /// Replace an item's payload.
    ///
    /// Owners may only edit drafts (which includes rejected items awaiting
    /// revision); admins may edit in any status. Status never changes.
    pub async fn edit(
        &self,
        kind: ContentKind,
        id: i64,
        principal: Option<&Principal>,
        payload: ContentPayload,
    ) -> ServiceResult<ContentItem> {
        if !policy::can_create(principal, kind) {
            return Err(ServiceError::Forbidden);
        }
        let principal = principal.ok_or(ServiceError::Forbidden)?;

        let item = self.lookup(kind, id, principal).await?;
        if !policy::can_edit(Some(principal), &item) {
            return Err(ServiceError::Forbidden);
        }
        if !principal.is_admin() && item.status != ContentStatus::Draft {
            return Err(ServiceError::InvalidState {
                action: "edit",
                current: item.status,
            });
        }

        let updated = self
            .registry
            .update(kind, id, ContentPatch::new(payload))
            .await?;
        tracing::info!(kind = %kind, id, actor = principal.user_id, "Content edited");
        Ok(updated)
    }

    /// Read an item in any status as its owner or an admin.
    pub async fn get_for(
        &self,
        kind: ContentKind,
        id: i64,
        principal: Option<&Principal>,
    ) -> ServiceResult<ContentItem> {
        let principal = principal.ok_or(ServiceError::Forbidden)?;
        let item = self.lookup(kind, id, principal).await?;
        if !policy::can_view_unpublished(Some(principal), &item) {
            return Err(ServiceError::Forbidden);
        }
        Ok(item)
    }

    /// Items of `kind` owned by the caller, newest first.
    pub async fn my_items(
        &self,
        kind: ContentKind,
        principal: Option<&Principal>,
    ) -> ServiceResult<Vec<ContentItem>> {
        if !policy::can_create(principal, kind) {
            return Err(ServiceError::Forbidden);
        }
        let principal = principal.ok_or(ServiceError::Forbidden)?;
        self.registry.list_by_owner(kind, principal.user_id).await
    }

    /// Pending items of `kind`, for admins.
    pub async fn review_queue(
        &self,
        kind: ContentKind,
        principal: Option<&Principal>,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<PagedResult<ContentItem>> {
        if !principal.map(Principal::is_admin).unwrap_or(false) {
            return Err(ServiceError::Forbidden);
        }
        let params = page_params(page, page_size, MAX_PAGE_SIZE)?;
        self.registry
            .list_by_status(kind, ContentStatus::PendingReview, &params)
            .await
    }

    /// Published items of `kind`, sanitized for rendering. Open to everyone.
    pub async fn list_published(
        &self,
        kind: ContentKind,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<PagedResult<ContentItem>> {
        let params = page_params(page, page_size, MAX_PAGE_SIZE)?;
        let page = self
            .registry
            .list_by_status(kind, ContentStatus::Published, &params)
            .await?;
        Ok(page.map(|item| item.sanitized()))
    }

    /// One published item, sanitized. Anything unpublished is `NotFound`.
    pub async fn get_published(&self, kind: ContentKind, id: i64) -> ServiceResult<ContentItem> {
        match self.registry.get(kind, id).await? {
            Some(item) if item.is_published() => Ok(item.sanitized()),
            _ => Err(ServiceError::NotFound(format!("{} {}", kind, id))),
        }
    }
}

fn required_feedback(feedback: Option<&str>) -> ServiceResult<String> {
    match feedback.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ServiceError::validation(
            "Feedback is required when rejecting",
        )),
    }
}

//! Authorization rules
//!
//! Every permission decision in the crate is made here. Callers pass an
//! optional principal; `None` is denied everywhere a principal is required.

use crate::models::{ContentItem, ContentKind, ContentStatus, Principal, UserRole};

/// Moderation actions on an existing item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    Approve,
    Reject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Reject => "reject",
        }
    }

    /// Status the item must be in for the action to apply
    pub fn required_status(&self) -> ContentStatus {
        match self {
            Action::Submit => ContentStatus::Draft,
            Action::Approve | Action::Reject => ContentStatus::PendingReview,
        }
    }

    pub fn is_review(&self) -> bool {
        matches!(self, Action::Approve | Action::Reject)
    }
}

/// Roles that may own content of `kind`
pub fn owner_role(kind: ContentKind) -> UserRole {
    match kind {
        ContentKind::Article | ContentKind::Expert => UserRole::Writer,
        ContentKind::Partner | ContentKind::Event => UserRole::Partner,
    }
}

/// Whether `principal`'s role is allowed to attempt `action` on `kind` at all,
/// before looking at any particular item.
pub fn role_may_attempt(principal: Option<&Principal>, kind: ContentKind, action: Action) -> bool {
    match principal {
        None => false,
        Some(p) if p.is_admin() => true,
        Some(p) => !action.is_review() && p.role == owner_role(kind),
    }
}

/// The single authorization predicate for moderation transitions.
///
/// Submit: the owner (with a role that may own the kind) or an admin.
/// Approve/reject: admins only. Status preconditions are checked separately.
pub fn can_transition(principal: Option<&Principal>, item: &ContentItem, action: Action) -> bool {
    if !role_may_attempt(principal, item.kind, action) {
        return false;
    }
    match principal {
        Some(p) if p.is_admin() => true,
        Some(p) => item.is_owned_by(p.user_id),
        None => false,
    }
}

pub fn can_create(principal: Option<&Principal>, kind: ContentKind) -> bool {
    match principal {
        Some(p) => p.is_admin() || p.role == owner_role(kind),
        None => false,
    }
}

/// Owners edit their own drafts; admins edit anything. The status rule for
/// owners is enforced by the moderation service as `InvalidState`.
pub fn can_edit(principal: Option<&Principal>, item: &ContentItem) -> bool {
    match principal {
        Some(p) if p.is_admin() => true,
        Some(p) => p.role == owner_role(item.kind) && item.is_owned_by(p.user_id),
        None => false,
    }
}

/// Drafts and pending items are visible to their owner and to admins only.
pub fn can_view_unpublished(principal: Option<&Principal>, item: &ContentItem) -> bool {
    match principal {
        Some(p) => p.is_admin() || item.is_owned_by(p.user_id),
        None => false,
    }
}

pub fn can_explore(principal: Option<&Principal>) -> bool {
    principal.map(Principal::is_admin).unwrap_or(false)
}

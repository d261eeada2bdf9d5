//! Data models
//!
//! - Accounts, sessions and the resolved [`Principal`]
//! - Moderated content: kinds, statuses, payloads and lifecycle changes
//! - Pagination types shared by list queries

mod content;
mod session;
mod user;

pub use content::{
    ArticlePayload, ContentItem, ContentKind, ContentPatch, ContentPayload, ContentStatus,
    EventPayload, ExpertPayload, FeedbackChange, ListParams, PagedResult, Pagination,
    PartnerPayload, StatusChange, MAX_PAGE_SIZE,
};
pub use session::Session;
pub use user::{CreateUserInput, Principal, User, UserRole, UserStatus};

//! Service error type
//!
//! One error enum shared by identity, registry, moderation and explorer.
//! Repository failures arrive as `anyhow::Error` and become `StoreError`
//! through `?`.

use crate::models::ContentStatus;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No principal, wrong role, or not the owner
    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    /// The item is not in the status the action requires
    #[error("Cannot {action} an item that is {current}")]
    InvalidState {
        action: &'static str,
        current: ContentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unique constraint (username, email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Wrong credentials; carries no detail
    #[error("Invalid username or password")]
    AuthenticationFailed,

    #[error("Store error: {0}")]
    StoreError(#[from] anyhow::Error),
}

impl ServiceError {
    /// Only store failures may succeed on retry; every other variant is a
    /// decision about the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::StoreError(_))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

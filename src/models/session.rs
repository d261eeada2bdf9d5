//! Session model

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (bearer token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` with a fresh random token.
    ///
    /// Fails when `ttl` pushes the expiry past the representable range.
    pub fn new(user_id: i64, ttl: Duration) -> anyhow::Result<Self> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .context("Session lifetime overflows the timestamp range")?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

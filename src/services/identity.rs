//! Identity and role resolution
//!
//! Turns a session token into a [`Principal`], and owns the account
//! operations that create sessions in the first place:
//! - registration (the very first account becomes admin)
//! - login with Argon2id password verification
//! - logout
//!
//! [`IdentityService::resolve_session`] fails closed. A missing, unknown or
//! expired token, a missing or banned user, and any store failure all
//! resolve to `None`; store failures are logged, never propagated.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Principal, Session, User, UserRole};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::password::{hash_password, verify_password};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 50;

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

/// A fresh session and who it belongs to
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session: Session,
    pub principal: Principal,
}

pub struct IdentityService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl_hours: i64,
}

impl IdentityService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_hours,
        }
    }

    fn session_ttl(&self) -> anyhow::Result<Duration> {
        Duration::try_hours(self.session_ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .with_context(|| {
                format!("Invalid session lifetime of {} hours", self.session_ttl_hours)
            })
    }

    /// Resolve a bearer token to the principal it authenticates.
    pub async fn resolve_session(&self, token: Option<&str>) -> Option<Principal> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;

        let session = match self.session_repo.get_by_id(token).await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed; treating request as anonymous");
                return None;
            }
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(&session.id).await {
                tracing::warn!(error = %e, "Failed to delete expired session");
            }
            return None;
        }

        match self.user_repo.get_by_id(session.user_id).await {
            Ok(Some(user)) if user.is_active() => Some(Principal::from(&user)),
            Ok(Some(user)) => {
                tracing::debug!(user_id = user.id, "Session belongs to an inactive account");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed; treating request as anonymous");
                None
            }
        }
    }

    /// Register a new account.
    ///
    /// Self-service accounts are writers or partners. The first account in
    /// an empty system becomes the admin; admin can never be requested.
    pub async fn register(&self, input: CreateUserInput) -> ServiceResult<User> {
        validate_register_input(&input)?;

        if input.role == Some(UserRole::Admin) {
            return Err(ServiceError::validation(
                "The admin role cannot be self-assigned",
            ));
        }

        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let is_first = self.user_repo.count().await.context("Failed to count users")? == 0;
        let role = if is_first {
            UserRole::Admin
        } else {
            input.role.unwrap_or_default()
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = self
            .user_repo
            .create(&User::new(username, email, password_hash, role))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, role = %user.role, "Registered account");
        Ok(user)
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown account, wrong password and banned account all produce the
    /// same `AuthenticationFailed`.
    pub async fn login(&self, input: LoginInput) -> ServiceResult<LoginResult> {
        let user = match self.find_by_username_or_email(&input.username_or_email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Login failed: unknown account");
                return Err(ServiceError::AuthenticationFailed);
            }
        };

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid || !user.is_active() {
            tracing::info!(user_id = user.id, "Login failed");
            return Err(ServiceError::AuthenticationFailed);
        }

        let session = self
            .session_repo
            .create(&Session::new(user.id, self.session_ttl()?)?)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "Login succeeded");
        Ok(LoginResult {
            session,
            principal: Principal::from(&user),
        })
    }

    /// Invalidate a session. Unknown tokens are not an error.
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Delete all expired sessions; returns how many were removed.
    pub async fn cleanup_expired_sessions(&self) -> ServiceResult<i64> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn find_by_username_or_email(&self, value: &str) -> ServiceResult<Option<User>> {
        let value = value.trim();
        if let Some(user) = self
            .user_repo
            .get_by_username(value)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(&value.to_lowercase())
            .await
            .context("Failed to get user by email")?;
        Ok(user)
    }
}

fn validate_register_input(input: &CreateUserInput) -> ServiceResult<()> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(ServiceError::validation("Username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ServiceError::validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }

    let email = input.email.trim();
    if email.is_empty() {
        return Err(ServiceError::validation("Email cannot be empty"));
    }
    if !email.contains('@') {
        return Err(ServiceError::validation("Invalid email format"));
    }

    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

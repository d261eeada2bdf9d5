//! User model
//!
//! Accounts, their roles, and the [`Principal`] a request acts as once its
//! session has been resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// User status (active/banned)
    pub status: UserStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed; see `services::password::hash_password`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// User role for authorization.
///
/// - Admin: reviews and publishes any content, reads the explorer
/// - Writer: authors articles and expert profiles
/// - Partner: maintains partner profiles and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Writer,
    Partner,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Writer
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Writer => write!(f, "writer"),
            UserRole::Partner => write!(f, "partner"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "writer" => Ok(UserRole::Writer),
            "partner" => Ok(UserRole::Partner),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// User status for account state.
///
/// Banned accounts cannot log in and their sessions resolve to no principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Banned,
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Banned => write!(f, "banned"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "banned" => Ok(UserStatus::Banned),
            _ => Err(anyhow::anyhow!("Invalid user status: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Requested role; defaults to Writer
    pub role: Option<UserRole>,
}

/// The resolved identity a request acts as.
///
/// Only the identity resolver builds these from a live session; every
/// authorization decision downstream is made against a `Principal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl Principal {
    pub fn new(user_id: i64, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.username.clone(), user.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "testuser".to_string(),
            "test@example.com".to_string(),
            "hashed_password".to_string(),
            UserRole::Partner,
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.role, UserRole::Partner);
        assert!(user.is_active());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "writer".to_string(),
            "writer@example.com".to_string(),
            "$argon2id$secret".to_string(),
            UserRole::Writer,
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$argon2id$secret"));
    }

    #[test]
    fn test_user_role_roundtrip() {
        for role in [UserRole::Admin, UserRole::Writer, UserRole::Partner] {
            assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }
        assert_eq!(UserRole::from_str("WRITER").unwrap(), UserRole::Writer);
        assert!(UserRole::from_str("editor").is_err());
    }

    #[test]
    fn test_user_role_default() {
        assert_eq!(UserRole::default(), UserRole::Writer);
    }

    #[test]
    fn test_principal_from_user() {
        let mut user = User::new(
            "root".to_string(),
            "root@example.com".to_string(),
            "hash".to_string(),
            UserRole::Admin,
        );
        user.id = 7;

        let principal = Principal::from(&user);
        assert_eq!(principal.user_id, 7);
        assert_eq!(principal.username, "root");
        assert!(principal.is_admin());
    }
}

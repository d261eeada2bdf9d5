//! User repository
//!
//! - `UserRepository` trait defining the interface for account data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::{User, UserRole, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, status, created_at, updated_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.backend() {
            Backend::Sqlite(p) => create_user_sqlite(p, user).await,
            Backend::Mysql(p) => create_user_mysql(p, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(p) => get_user_by_column_sqlite(p, "username", username).await,
            Backend::Mysql(p) => get_user_by_column_mysql(p, "username", username).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(p) => get_user_by_column_sqlite(p, "email", email).await,
            Backend::Mysql(p) => get_user_by_column_mysql(p, "email", email).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM users";
        let count = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(sql)
                .fetch_one(p)
                .await
                .context("Failed to count users")?
                .get("count"),
            Backend::Mysql(p) => sqlx::query(sql)
                .fetch_one(p)
                .await
                .context("Failed to count users")?
                .get("count"),
        };
        Ok(count)
    }
}

fn parse_role(role: &str) -> Result<UserRole> {
    UserRole::from_str(role).with_context(|| format!("Invalid role in database: {}", role))
}

fn parse_status(status: Option<String>) -> UserStatus {
    status
        .and_then(|s| UserStatus::from_str(&s).ok())
        .unwrap_or(UserStatus::Active)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

// `column` is always one of the literal names above, never caller input.
async fn get_user_by_column_sqlite(
    pool: &SqlitePool,
    column: &str,
    value: &str,
) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: parse_role(&role_str)?,
        status: parse_status(row.try_get("status").ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_column_mysql(
    pool: &MySqlPool,
    column: &str,
    value: &str,
) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: parse_role(&role_str)?,
        status: parse_status(row.try_get("status").ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

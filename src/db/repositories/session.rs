//! Session repository
//!
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.backend() {
            Backend::Sqlite(p) => create_session_sqlite(p, session).await,
            Backend::Mysql(p) => create_session_mysql(p, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.backend() {
            Backend::Sqlite(p) => get_session_by_id_sqlite(p, id).await,
            Backend::Mysql(p) => get_session_by_id_mysql(p, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(p)
                    .await
                    .context("Failed to delete session")?;
            }
            Backend::Mysql(p) => {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(p)
                    .await
                    .context("Failed to delete session")?;
            }
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(p)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
            Backend::Mysql(p) => sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(p)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
        };
        Ok(affected as i64)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, expires_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, expires_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    Ok(row.map(|row| {
        let expires_at: DateTime<Utc> = row.get("expires_at");
        let created_at: DateTime<Utc> = row.get("created_at");
        Session {
            id: row.get("id"),
            user_id: row.get("user_id"),
            expires_at,
            created_at,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    // Sessions reference users, so a user row must exist first.
    async fn create_test_user(pool: &DynDatabasePool, id: i64) {
        let sqlite_pool = pool.as_sqlite().expect("sqlite pool");
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("user{}", id))
        .bind(format!("user{}@example.com", id))
        .bind("hash")
        .bind("writer")
        .execute(sqlite_pool)
        .await
        .expect("Failed to create test user");
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;

        let session = Session::new(1, Duration::days(7)).unwrap();
        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_id(&session.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id, 1);
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_get_session_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo
            .get_by_id("nonexistent-session-id")
            .await
            .expect("Failed to get session");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;

        let session = Session::new(1, Duration::days(7)).unwrap();
        repo.create(&session).await.expect("Failed to create session");
        repo.delete(&session.id).await.expect("Failed to delete session");

        assert!(repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let (pool, repo) = setup_test_repo().await;
        create_test_user(&pool, 1).await;

        let live = Session::new(1, Duration::days(7)).unwrap();
        let stale = Session::new(1, Duration::days(-1)).unwrap();
        repo.create(&live).await.unwrap();
        repo.create(&stale).await.unwrap();

        let deleted = repo.delete_expired().await.expect("Failed to delete expired");
        assert_eq!(deleted, 1);
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
    }
}

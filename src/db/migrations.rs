//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! driver, and tracked in the `_migrations` table.
//!
//! Every content table (`articles`, `events`, `partners`, `experts`) carries
//! the same moderation columns with the same types and constraints; only the
//! payload columns differ. The content adapters rely on that uniformity.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'writer',
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (role IN ('admin', 'writer', 'partner'))
            );
            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'writer',
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (role IN ('admin', 'writer', 'partner'))
            );
            CREATE INDEX idx_users_role ON users(role);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                title VARCHAR(255) NOT NULL,
                summary TEXT,
                body_html TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP,
                reviewed_by INTEGER,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);
            CREATE INDEX IF NOT EXISTS idx_articles_owner_id ON articles(owner_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                owner_id BIGINT NOT NULL,
                title VARCHAR(255) NOT NULL,
                summary TEXT,
                body_html MEDIUMTEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP NULL,
                reviewed_by BIGINT NULL,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX idx_articles_status ON articles(status);
            CREATE INDEX idx_articles_owner_id ON articles(owner_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_events",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                title VARCHAR(255) NOT NULL,
                description_html TEXT NOT NULL,
                location VARCHAR(255),
                starts_at TIMESTAMP NOT NULL,
                ends_at TIMESTAMP,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP,
                reviewed_by INTEGER,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
            CREATE INDEX IF NOT EXISTS idx_events_owner_id ON events(owner_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS events (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                owner_id BIGINT NOT NULL,
                title VARCHAR(255) NOT NULL,
                description_html MEDIUMTEXT NOT NULL,
                location VARCHAR(255),
                starts_at TIMESTAMP NOT NULL,
                ends_at TIMESTAMP NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP NULL,
                reviewed_by BIGINT NULL,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX idx_events_status ON events(status);
            CREATE INDEX idx_events_owner_id ON events(owner_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_partners",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS partners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                website VARCHAR(512),
                description_html TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP,
                reviewed_by INTEGER,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_partners_status ON partners(status);
            CREATE INDEX IF NOT EXISTS idx_partners_owner_id ON partners(owner_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS partners (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                owner_id BIGINT NOT NULL,
                name VARCHAR(255) NOT NULL,
                website VARCHAR(512),
                description_html MEDIUMTEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP NULL,
                reviewed_by BIGINT NULL,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX idx_partners_status ON partners(status);
            CREATE INDEX idx_partners_owner_id ON partners(owner_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_experts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS experts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                headline VARCHAR(255),
                bio_html TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP,
                reviewed_by INTEGER,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_experts_status ON experts(status);
            CREATE INDEX IF NOT EXISTS idx_experts_owner_id ON experts(owner_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS experts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                owner_id BIGINT NOT NULL,
                name VARCHAR(255) NOT NULL,
                headline VARCHAR(255),
                bio_html MEDIUMTEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                review_feedback TEXT,
                reviewed_at TIMESTAMP NULL,
                reviewed_by BIGINT NULL,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (status IN ('draft', 'pending_review', 'published')),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (reviewed_by) REFERENCES users(id)
            );
            CREATE INDEX idx_experts_status ON experts(status);
            CREATE INDEX idx_experts_owner_id ON experts(owner_id);
        "#,
    },
];

/// Apply every migration not yet recorded in `_migrations`.
///
/// Returns the number of migrations applied by this call.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.backend() {
        Backend::Sqlite(p) => get_applied_migrations_sqlite(p).await,
        Backend::Mysql(p) => get_applied_migrations_mysql(p).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.backend() {
        Backend::Sqlite(p) => apply_migration_sqlite(p, migration).await,
        Backend::Mysql(p) => apply_migration_mysql(p, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(applied.len() == MIGRATIONS.len())
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool) -> i64 {
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind("writer")
        .bind("writer@example.com")
        .bind("hash123")
        .bind("writer")
        .execute(pool)
        .await
        .expect("Failed to create user")
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, total_migrations());
        assert!(is_up_to_date(&pool).await.expect("Failed to check migrations"));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = migrated_pool().await;
        let count = run_migrations(&pool).await.expect("Failed to rerun migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_content_tables_share_moderation_columns() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().expect("sqlite pool");

        for table in ["articles", "events", "partners", "experts"] {
            let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
                .fetch_all(sqlite_pool)
                .await
                .expect("Failed to read table info");
            let columns: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();

            for column in [
                "id",
                "owner_id",
                "status",
                "review_feedback",
                "reviewed_at",
                "reviewed_by",
                "published_at",
                "created_at",
                "updated_at",
            ] {
                assert!(
                    columns.iter().any(|c| c == column),
                    "{} is missing column {}",
                    table,
                    column
                );
            }
        }
    }

    #[tokio::test]
    async fn test_status_check_rejects_unknown_values() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().expect("sqlite pool");
        let owner_id = insert_user(sqlite_pool).await;

        for status in ["draft", "pending_review", "published"] {
            let result = sqlx::query(
                "INSERT INTO articles (owner_id, title, body_html, status) VALUES (?, ?, ?, ?)",
            )
            .bind(owner_id)
            .bind("Title")
            .bind("<p>Body</p>")
            .bind(status)
            .execute(sqlite_pool)
            .await;
            assert!(result.is_ok(), "status {} should be accepted", status);
        }

        let result = sqlx::query(
            "INSERT INTO articles (owner_id, title, body_html, status) VALUES (?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind("Title")
        .bind("<p>Body</p>")
        .bind("archived")
        .execute(sqlite_pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().expect("sqlite pool");

        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, datetime('now', '+1 day'))",
        )
        .bind("session123")
        .bind(999i64)
        .execute(sqlite_pool)
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}

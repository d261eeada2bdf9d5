//! Admin data explorer
//!
//! Paged, read-only views over a fixed catalog of tables. Credential
//! columns are never selected; they appear in each row as `"[REDACTED]"`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::db::repositories::{ColumnType, ExplorerRepository, JsonRow, TableColumn};
use crate::models::{Pagination, Principal};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::policy;
use crate::services::registry::page_params;

use ColumnType::{Integer, Text, Timestamp};

pub const REDACTED: &str = "[REDACTED]";

/// A table the explorer may read
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [TableColumn],
    /// Columns replaced by [`REDACTED`] in every row
    pub redacted: &'static [&'static str],
    pub order_by: &'static str,
}

/// Payload columns followed by the review columns every content table shares
macro_rules! content_columns {
    ($($name:literal: $ty:ident),* $(,)?) => {
        &[
            TableColumn::new("id", Integer),
            TableColumn::new("owner_id", Integer),
            $(TableColumn::new($name, $ty),)*
            TableColumn::new("status", Text),
            TableColumn::new("review_feedback", Text),
            TableColumn::new("reviewed_at", Timestamp),
            TableColumn::new("reviewed_by", Integer),
            TableColumn::new("published_at", Timestamp),
            TableColumn::new("created_at", Timestamp),
            TableColumn::new("updated_at", Timestamp),
        ]
    };
}

pub const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "users",
        columns: &[
            TableColumn::new("id", Integer),
            TableColumn::new("username", Text),
            TableColumn::new("email", Text),
            TableColumn::new("role", Text),
            TableColumn::new("status", Text),
            TableColumn::new("created_at", Timestamp),
            TableColumn::new("updated_at", Timestamp),
        ],
        redacted: &["password_hash"],
        order_by: "id",
    },
    TableSpec {
        name: "sessions",
        columns: &[
            TableColumn::new("user_id", Integer),
            TableColumn::new("expires_at", Timestamp),
            TableColumn::new("created_at", Timestamp),
        ],
        redacted: &["id"],
        order_by: "created_at",
    },
    TableSpec {
        name: "articles",
        columns: content_columns!("title": Text, "summary": Text, "body_html": Text),
        redacted: &[],
        order_by: "id",
    },
    TableSpec {
        name: "events",
        columns: content_columns!(
            "title": Text,
            "description_html": Text,
            "location": Text,
            "starts_at": Timestamp,
            "ends_at": Timestamp,
        ),
        redacted: &[],
        order_by: "id",
    },
    TableSpec {
        name: "partners",
        columns: content_columns!("name": Text, "website": Text, "description_html": Text),
        redacted: &[],
        order_by: "id",
    },
    TableSpec {
        name: "experts",
        columns: content_columns!("name": Text, "headline": Text, "bio_html": Text),
        redacted: &[],
        order_by: "id",
    },
];

pub fn table_spec(name: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|t| t.name == name)
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorerPage {
    pub table: &'static str,
    pub rows: Vec<JsonRow>,
    pub pagination: Pagination,
}

pub struct ExplorerService {
    repo: Arc<dyn ExplorerRepository>,
    max_page_size: u32,
}

impl ExplorerService {
    pub fn new(repo: Arc<dyn ExplorerRepository>, max_page_size: u32) -> Self {
        Self {
            repo,
            max_page_size,
        }
    }

    /// One page of `table`, admins only.
    pub async fn list_table(
        &self,
        principal: Option<&Principal>,
        table: &str,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<ExplorerPage> {
        if !policy::can_explore(principal) {
            return Err(ServiceError::Forbidden);
        }
        let spec = table_spec(table)
            .ok_or_else(|| ServiceError::validation(format!("Unknown table: {}", table)))?;
        let params = page_params(page, page_size, self.max_page_size)?;

        let total = self.repo.count(spec.name).await?;
        let mut rows = self
            .repo
            .page(spec.name, spec.columns, spec.order_by, &params)
            .await?;
        for row in &mut rows {
            redact(row, spec);
        }

        tracing::debug!(table = spec.name, page = params.page, rows = rows.len(), "Explorer page");

        Ok(ExplorerPage {
            table: spec.name,
            rows,
            pagination: Pagination::new(&params, total),
        })
    }
}

fn redact(row: &mut JsonRow, spec: &TableSpec) {
    for column in spec.redacted {
        row.insert(column.to_string(), Value::from(REDACTED));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SessionRepository, SqlxExplorerRepository, SqlxSessionRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{Session, UserRole};

    async fn setup() -> (DynDatabasePool, ExplorerService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        let service = ExplorerService::new(SqlxExplorerRepository::boxed(pool.clone()), 100);
        (pool, service)
    }

    async fn insert_users(pool: &DynDatabasePool, count: i64) {
        let sqlite = pool.as_sqlite().expect("sqlite pool");
        for i in 1..=count {
            sqlx::query(
                "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, '$argon2id$secret', 'writer')",
            )
            .bind(format!("user{}", i))
            .bind(format!("user{}@example.com", i))
            .execute(sqlite)
            .await
            .unwrap();
        }
    }

    fn admin() -> Principal {
        Principal::new(1, "admin", UserRole::Admin)
    }

    #[test]
    fn test_catalog_covers_content_tables() {
        for name in ["users", "sessions", "articles", "events", "partners", "experts"] {
            assert!(table_spec(name).is_some(), "missing {}", name);
        }
        assert!(table_spec("_migrations").is_none());
        for spec in TABLES {
            for redacted in spec.redacted {
                assert!(
                    spec.columns.iter().all(|c| c.name != *redacted),
                    "{}.{} must not be selected",
                    spec.name,
                    redacted
                );
            }
        }
    }

    #[tokio::test]
    async fn test_credentials_are_redacted() {
        let (pool, service) = setup().await;
        insert_users(&pool, 2).await;
        SqlxSessionRepository::new(pool.clone())
            .create(&Session::new(1, chrono::Duration::hours(1)).unwrap())
            .await
            .unwrap();

        let users = service.list_table(Some(&admin()), "users", 1, 10).await.unwrap();
        assert_eq!(users.rows.len(), 2);
        for row in &users.rows {
            assert_eq!(row["password_hash"], REDACTED);
            assert!(row["username"].is_string());
            assert!(row["created_at"].is_string());
        }

        let sessions = service.list_table(Some(&admin()), "sessions", 1, 10).await.unwrap();
        assert_eq!(sessions.rows.len(), 1);
        assert_eq!(sessions.rows[0]["id"], REDACTED);
        assert_eq!(sessions.rows[0]["user_id"], 1);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let (pool, service) = setup().await;
        insert_users(&pool, 105).await;

        let page = service.list_table(Some(&admin()), "users", 1, 10_000).await.unwrap();
        assert_eq!(page.rows.len(), 100);
        assert_eq!(page.pagination.page_size, 100);
        assert_eq!(page.pagination.total, 105);
        assert_eq!(page.pagination.total_pages, 2);

        let rest = service.list_table(Some(&admin()), "users", 2, 10_000).await.unwrap();
        assert_eq!(rest.rows.len(), 5);

        let small = service.list_table(Some(&admin()), "users", 27, 4).await.unwrap();
        assert_eq!(small.rows.len(), 1);
        assert_eq!(small.pagination.total_pages, 27);
    }

    #[tokio::test]
    async fn test_forbidden_before_validation() {
        let (_pool, service) = setup().await;
        let writer = Principal::new(2, "w", UserRole::Writer);

        for principal in [None, Some(&writer)] {
            let result = service.list_table(principal, "no_such_table", 0, 0).await;
            assert!(matches!(result, Err(ServiceError::Forbidden)));
        }
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let (_pool, service) = setup().await;

        assert!(matches!(
            service.list_table(Some(&admin()), "_migrations", 1, 10).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.list_table(Some(&admin()), "users", 0, 10).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.list_table(Some(&admin()), "users", 1, 0).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_content_rows_are_plain_json() {
        let (pool, service) = setup().await;
        insert_users(&pool, 1).await;
        sqlx::query("INSERT INTO articles (owner_id, title, body_html) VALUES (1, 'T', '<p>b</p>')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let page = service.list_table(Some(&admin()), "articles", 1, 10).await.unwrap();
        let row = &page.rows[0];
        assert_eq!(row["title"], "T");
        assert_eq!(row["status"], "draft");
        assert!(row["published_at"].is_null());
        assert!(row["summary"].is_null());
    }
}

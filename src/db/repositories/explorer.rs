//! Read-only table access for the admin explorer
//!
//! Table and column names are always taken from the explorer's static
//! catalog, never from request input; only page bounds are bound parameters.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::Row;

use super::content::ColumnReader;
use crate::db::{Backend, DynDatabasePool};
use crate::models::ListParams;

/// How a column is decoded into JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    /// Rendered as RFC 3339
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColumn {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl TableColumn {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

pub type JsonRow = Map<String, Value>;

#[async_trait]
pub trait ExplorerRepository: Send + Sync {
    async fn count(&self, table: &str) -> Result<i64>;

    /// One page of `columns` from `table`, ordered by `order_by`
    async fn page(
        &self,
        table: &str,
        columns: &[TableColumn],
        order_by: &str,
        params: &ListParams,
    ) -> Result<Vec<JsonRow>>;
}

pub struct SqlxExplorerRepository {
    pool: DynDatabasePool,
}

impl SqlxExplorerRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ExplorerRepository> {
        Arc::new(Self::new(pool))
    }
}

fn read_value(row: &dyn ColumnReader, column: &TableColumn) -> Result<Value> {
    Ok(match column.ty {
        ColumnType::Integer => row.opt_int(column.name)?.map(Value::from),
        ColumnType::Text => row.opt_text(column.name)?.map(Value::from),
        ColumnType::Timestamp => row
            .opt_time(column.name)?
            .map(|t| Value::from(t.to_rfc3339())),
    }
    .unwrap_or(Value::Null))
}

fn read_row(row: &dyn ColumnReader, columns: &[TableColumn]) -> Result<JsonRow> {
    let mut out = Map::new();
    for column in columns {
        out.insert(column.name.to_string(), read_value(row, column)?);
    }
    Ok(out)
}

#[async_trait]
impl ExplorerRepository for SqlxExplorerRepository {
    async fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", table);
        let context = || format!("Failed to count rows in {}", table);
        let count = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(&sql)
                .fetch_one(p)
                .await
                .with_context(context)?
                .get("count"),
            Backend::Mysql(p) => sqlx::query(&sql)
                .fetch_one(p)
                .await
                .with_context(context)?
                .get("count"),
        };
        Ok(count)
    }

    async fn page(
        &self,
        table: &str,
        columns: &[TableColumn],
        order_by: &str,
        params: &ListParams,
    ) -> Result<Vec<JsonRow>> {
        let select_list = columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} LIMIT ? OFFSET ?",
            select_list, table, order_by
        );
        let context = || format!("Failed to read rows from {}", table);

        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let rows = sqlx::query(&sql)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(p)
                    .await
                    .with_context(context)?;
                rows.iter().map(|r| read_row(r, columns)).collect()
            }
            Backend::Mysql(p) => {
                let rows = sqlx::query(&sql)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(p)
                    .await
                    .with_context(context)?;
                rows.iter().map(|r| read_row(r, columns)).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    const USER_COLUMNS: &[TableColumn] = &[
        TableColumn::new("id", ColumnType::Integer),
        TableColumn::new("username", ColumnType::Text),
        TableColumn::new("created_at", ColumnType::Timestamp),
    ];

    async fn setup() -> SqlxExplorerRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        for name in ["a", "b", "c"] {
            sqlx::query(
                "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, 'hash', 'writer')",
            )
            .bind(name)
            .bind(format!("{}@example.com", name))
            .execute(pool.as_sqlite().expect("sqlite pool"))
            .await
            .unwrap();
        }
        SqlxExplorerRepository::new(pool)
    }

    #[tokio::test]
    async fn test_count_and_page() {
        let repo = setup().await;
        assert_eq!(repo.count("users").await.unwrap(), 3);

        let rows = repo
            .page("users", USER_COLUMNS, "id", &ListParams::new(2, 2))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], "c");
        assert_eq!(rows[0]["id"], 3);
    }

    #[tokio::test]
    async fn test_only_requested_columns_are_returned() {
        let repo = setup().await;
        let rows = repo
            .page("users", USER_COLUMNS, "id", &ListParams::new(1, 10))
            .await
            .unwrap();

        for row in rows {
            assert_eq!(row.len(), USER_COLUMNS.len());
            assert!(!row.contains_key("password_hash"));
            assert!(row["created_at"].is_string());
        }
    }
}

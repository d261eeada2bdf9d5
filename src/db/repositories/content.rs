//! Content store
//!
//! Every content kind is persisted through the same [`ContentStore`] trait.
//! The SQL implementation is written once, in [`SqlContentStore`], and
//! specialised per kind by a [`PayloadSchema`] that knows the kind's table
//! and payload columns (see the `article`, `event`, `partner` and `expert`
//! modules). [`MemoryContentStore`](super::memory::MemoryContentStore) is the
//! in-process implementation used by tests.
//!
//! Status is only ever written by `apply_transition`, a single conditional
//! `UPDATE ... WHERE id = ? AND status = ?`; zero affected rows means the
//! item was not in the expected state (or does not exist).

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::str::FromStr;

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    ContentItem, ContentKind, ContentPayload, ContentStatus, ListParams, StatusChange,
};

/// Storage capability for one content kind.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The kind this store holds
    fn kind(&self) -> ContentKind;

    async fn get(&self, id: i64) -> Result<Option<ContentItem>>;

    /// One page of items in `status`, most recently updated first
    async fn list_by_status(
        &self,
        status: ContentStatus,
        params: &ListParams,
    ) -> Result<Vec<ContentItem>>;

    async fn count_by_status(&self, status: ContentStatus) -> Result<i64>;

    /// All items owned by `owner_id`, newest first
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<ContentItem>>;

    /// Insert a new item in `draft`
    async fn insert(&self, owner_id: i64, payload: &ContentPayload) -> Result<ContentItem>;

    /// Replace the payload. Returns `None` if the id does not exist.
    async fn update_payload(&self, id: i64, payload: &ContentPayload)
        -> Result<Option<ContentItem>>;

    /// Apply `change` only if the item is currently in `expected`.
    ///
    /// Returns `None` when no row matched.
    async fn apply_transition(
        &self,
        id: i64,
        expected: ContentStatus,
        change: &StatusChange,
    ) -> Result<Option<ContentItem>>;
}

/// Type alias for a shared content store
pub type DynContentStore = Arc<dyn ContentStore>;

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    OptText(Option<String>),
    Time(DateTime<Utc>),
    OptTime(Option<DateTime<Utc>>),
}

/// Driver-independent access to a result row.
pub trait ColumnReader {
    fn int(&self, column: &str) -> Result<i64>;
    fn opt_int(&self, column: &str) -> Result<Option<i64>>;
    fn text(&self, column: &str) -> Result<String>;
    fn opt_text(&self, column: &str) -> Result<Option<String>>;
    fn time(&self, column: &str) -> Result<DateTime<Utc>>;
    fn opt_time(&self, column: &str) -> Result<Option<DateTime<Utc>>>;
}

macro_rules! impl_column_reader {
    ($row:ty) => {
        impl ColumnReader for $row {
            fn int(&self, column: &str) -> Result<i64> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn opt_int(&self, column: &str) -> Result<Option<i64>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn text(&self, column: &str) -> Result<String> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn opt_text(&self, column: &str) -> Result<Option<String>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn time(&self, column: &str) -> Result<DateTime<Utc>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn opt_time(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }
        }
    };
}

impl_column_reader!(SqliteRow);
impl_column_reader!(MySqlRow);

/// Table layout of one content kind's payload.
pub trait PayloadSchema: Send + Sync + 'static {
    const KIND: ContentKind;

    /// Payload columns, in the order `values` produces them
    const COLUMNS: &'static [&'static str];

    /// Column values for `payload`; fails if the payload is another kind
    fn values(payload: &ContentPayload) -> Result<Vec<SqlValue>>;

    fn read(row: &dyn ColumnReader) -> Result<ContentPayload>;
}

/// Error for a payload written to the wrong kind's store
pub(crate) fn kind_mismatch(expected: ContentKind, payload: &ContentPayload) -> anyhow::Error {
    anyhow!(
        "{} payload cannot be stored as {}",
        payload.kind(),
        expected
    )
}

const COMMON_COLUMNS: &[&str] = &[
    "id",
    "owner_id",
    "status",
    "review_feedback",
    "reviewed_at",
    "reviewed_by",
    "published_at",
    "created_at",
    "updated_at",
];

/// Pre-rendered statements for one kind
struct Statements {
    select_by_id: String,
    select_by_status: String,
    count_by_status: String,
    select_by_owner: String,
    insert: String,
    update_payload: String,
    transition: String,
}

impl Statements {
    fn new(table: &str, payload_columns: &[&str]) -> Self {
        let select_list = COMMON_COLUMNS
            .iter()
            .chain(payload_columns.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        let insert_columns = payload_columns.join(", ");
        let insert_params = vec!["?"; payload_columns.len()].join(", ");
        let assignments = payload_columns
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            select_by_id: format!("SELECT {} FROM {} WHERE id = ?", select_list, table),
            select_by_status: format!(
                "SELECT {} FROM {} WHERE status = ? ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
                select_list, table
            ),
            count_by_status: format!("SELECT COUNT(*) AS count FROM {} WHERE status = ?", table),
            select_by_owner: format!(
                "SELECT {} FROM {} WHERE owner_id = ? ORDER BY id DESC",
                select_list, table
            ),
            insert: format!(
                "INSERT INTO {} (owner_id, status, {}, created_at, updated_at) VALUES (?, 'draft', {}, ?, ?)",
                table, insert_columns, insert_params
            ),
            update_payload: format!(
                "UPDATE {} SET {}, updated_at = ? WHERE id = ?",
                table, assignments
            ),
            transition: format!(
                r#"UPDATE {} SET
                    status = ?,
                    review_feedback = CASE WHEN ? THEN ? ELSE review_feedback END,
                    reviewed_at = COALESCE(?, reviewed_at),
                    reviewed_by = COALESCE(?, reviewed_by),
                    published_at = COALESCE(published_at, ?),
                    updated_at = ?
                WHERE id = ? AND status = ?"#,
                table
            ),
        }
    }
}

fn read_item<S: PayloadSchema>(row: &dyn ColumnReader) -> Result<ContentItem> {
    let status = row.text("status")?;
    Ok(ContentItem {
        id: row.int("id")?,
        kind: S::KIND,
        owner_id: row.int("owner_id")?,
        status: ContentStatus::from_str(&status)
            .with_context(|| format!("Invalid status in database: {}", status))?,
        review_feedback: row.opt_text("review_feedback")?,
        reviewed_at: row.opt_time("reviewed_at")?,
        reviewed_by: row.opt_int("reviewed_by")?,
        published_at: row.opt_time("published_at")?,
        created_at: row.time("created_at")?,
        updated_at: row.time("updated_at")?,
        payload: S::read(row)?,
    })
}

fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::OptText(v) => query.bind(v),
        SqlValue::Time(v) => query.bind(v),
        SqlValue::OptTime(v) => query.bind(v),
    }
}

fn bind_mysql(
    query: Query<'_, MySql, MySqlArguments>,
    value: SqlValue,
) -> Query<'_, MySql, MySqlArguments> {
    match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::OptText(v) => query.bind(v),
        SqlValue::Time(v) => query.bind(v),
        SqlValue::OptTime(v) => query.bind(v),
    }
}

/// SQL-backed [`ContentStore`] for the kind described by `S`.
pub struct SqlContentStore<S: PayloadSchema> {
    pool: DynDatabasePool,
    sql: Statements,
    _schema: PhantomData<S>,
}

impl<S: PayloadSchema> SqlContentStore<S> {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            pool,
            sql: Statements::new(S::KIND.table(), S::COLUMNS),
            _schema: PhantomData,
        }
    }

    /// Create a boxed store for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> DynContentStore {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl<S: PayloadSchema> ContentStore for SqlContentStore<S> {
    fn kind(&self) -> ContentKind {
        S::KIND
    }

    async fn get(&self, id: i64) -> Result<Option<ContentItem>> {
        match self.pool.backend() {
            Backend::Sqlite(p) => get_sqlite::<S>(p, &self.sql, id).await,
            Backend::Mysql(p) => get_mysql::<S>(p, &self.sql, id).await,
        }
    }

    async fn list_by_status(
        &self,
        status: ContentStatus,
        params: &ListParams,
    ) -> Result<Vec<ContentItem>> {
        let context = || format!("Failed to list {} by status", S::KIND);
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let rows = sqlx::query(&self.sql.select_by_status)
                    .bind(status.as_str())
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(p)
                    .await
                    .with_context(context)?;
                rows.iter().map(|r| read_item::<S>(r)).collect()
            }
            Backend::Mysql(p) => {
                let rows = sqlx::query(&self.sql.select_by_status)
                    .bind(status.as_str())
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(p)
                    .await
                    .with_context(context)?;
                rows.iter().map(|r| read_item::<S>(r)).collect()
            }
        }
    }

    async fn count_by_status(&self, status: ContentStatus) -> Result<i64> {
        let context = || format!("Failed to count {} by status", S::KIND);
        let count = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(&self.sql.count_by_status)
                .bind(status.as_str())
                .fetch_one(p)
                .await
                .with_context(context)?
                .get("count"),
            Backend::Mysql(p) => sqlx::query(&self.sql.count_by_status)
                .bind(status.as_str())
                .fetch_one(p)
                .await
                .with_context(context)?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<ContentItem>> {
        let context = || format!("Failed to list {} by owner", S::KIND);
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let rows = sqlx::query(&self.sql.select_by_owner)
                    .bind(owner_id)
                    .fetch_all(p)
                    .await
                    .with_context(context)?;
                rows.iter().map(|r| read_item::<S>(r)).collect()
            }
            Backend::Mysql(p) => {
                let rows = sqlx::query(&self.sql.select_by_owner)
                    .bind(owner_id)
                    .fetch_all(p)
                    .await
                    .with_context(context)?;
                rows.iter().map(|r| read_item::<S>(r)).collect()
            }
        }
    }

    async fn insert(&self, owner_id: i64, payload: &ContentPayload) -> Result<ContentItem> {
        let values = S::values(payload)?;
        let now = Utc::now();
        let context = || format!("Failed to create {}", S::KIND);

        let id = match self.pool.backend() {
            Backend::Sqlite(p) => {
                let mut query = sqlx::query(&self.sql.insert).bind(owner_id);
                for value in values {
                    query = bind_sqlite(query, value);
                }
                query
                    .bind(now)
                    .bind(now)
                    .execute(p)
                    .await
                    .with_context(context)?
                    .last_insert_rowid()
            }
            Backend::Mysql(p) => {
                let mut query = sqlx::query(&self.sql.insert).bind(owner_id);
                for value in values {
                    query = bind_mysql(query, value);
                }
                query
                    .bind(now)
                    .bind(now)
                    .execute(p)
                    .await
                    .with_context(context)?
                    .last_insert_id() as i64
            }
        };

        self.get(id)
            .await?
            .ok_or_else(|| anyhow!("{} {} not found after insert", S::KIND, id))
    }

    async fn update_payload(
        &self,
        id: i64,
        payload: &ContentPayload,
    ) -> Result<Option<ContentItem>> {
        let values = S::values(payload)?;
        let now = Utc::now();
        let context = || format!("Failed to update {} {}", S::KIND, id);

        let affected = match self.pool.backend() {
            Backend::Sqlite(p) => {
                let mut query = sqlx::query(&self.sql.update_payload);
                for value in values {
                    query = bind_sqlite(query, value);
                }
                query
                    .bind(now)
                    .bind(id)
                    .execute(p)
                    .await
                    .with_context(context)?
                    .rows_affected()
            }
            Backend::Mysql(p) => {
                let mut query = sqlx::query(&self.sql.update_payload);
                for value in values {
                    query = bind_mysql(query, value);
                }
                query
                    .bind(now)
                    .bind(id)
                    .execute(p)
                    .await
                    .with_context(context)?
                    .rows_affected()
            }
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn apply_transition(
        &self,
        id: i64,
        expected: ContentStatus,
        change: &StatusChange,
    ) -> Result<Option<ContentItem>> {
        let feedback = change.feedback();
        let context = || {
            format!(
                "Failed to move {} {} from {} to {}",
                S::KIND,
                id,
                expected,
                change.to()
            )
        };

        let affected = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(&self.sql.transition)
                .bind(change.to().as_str())
                .bind(feedback.overwrites())
                .bind(feedback.value())
                .bind(change.reviewed_at())
                .bind(change.reviewed_by())
                .bind(change.publish_at())
                .bind(change.at())
                .bind(id)
                .bind(expected.as_str())
                .execute(p)
                .await
                .with_context(context)?
                .rows_affected(),
            Backend::Mysql(p) => sqlx::query(&self.sql.transition)
                .bind(change.to().as_str())
                .bind(feedback.overwrites())
                .bind(feedback.value())
                .bind(change.reviewed_at())
                .bind(change.reviewed_by())
                .bind(change.publish_at())
                .bind(change.at())
                .bind(id)
                .bind(expected.as_str())
                .execute(p)
                .await
                .with_context(context)?
                .rows_affected(),
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }
}

async fn get_sqlite<S: PayloadSchema>(
    pool: &SqlitePool,
    sql: &Statements,
    id: i64,
) -> Result<Option<ContentItem>> {
    let row = sqlx::query(&sql.select_by_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} {}", S::KIND, id))?;

    row.as_ref().map(|r| read_item::<S>(r)).transpose()
}

async fn get_mysql<S: PayloadSchema>(
    pool: &MySqlPool,
    sql: &Statements,
    id: i64,
) -> Result<Option<ContentItem>> {
    let row = sqlx::query(&sql.select_by_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} {}", S::KIND, id))?;

    row.as_ref().map(|r| read_item::<S>(r)).transpose()
}

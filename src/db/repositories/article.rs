//! Article storage adapter

use anyhow::Result;

use super::content::{kind_mismatch, ColumnReader, PayloadSchema, SqlContentStore, SqlValue};
use crate::models::{ArticlePayload, ContentKind, ContentPayload};

/// Column layout of the `articles` table
pub struct ArticleSchema;

impl PayloadSchema for ArticleSchema {
    const KIND: ContentKind = ContentKind::Article;
    const COLUMNS: &'static [&'static str] = &["title", "summary", "body_html"];

    fn values(payload: &ContentPayload) -> Result<Vec<SqlValue>> {
        match payload {
            ContentPayload::Article(p) => Ok(vec![
                SqlValue::Text(p.title.clone()),
                SqlValue::OptText(p.summary.clone()),
                SqlValue::Text(p.body_html.clone()),
            ]),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }

    fn read(row: &dyn ColumnReader) -> Result<ContentPayload> {
        Ok(ContentPayload::Article(ArticlePayload {
            title: row.text("title")?,
            summary: row.opt_text("summary")?,
            body_html: row.text("body_html")?,
        }))
    }
}

pub type SqlxArticleStore = SqlContentStore<ArticleSchema>;

//! Expert profile storage adapter

use anyhow::Result;

use super::content::{kind_mismatch, ColumnReader, PayloadSchema, SqlContentStore, SqlValue};
use crate::models::{ContentKind, ContentPayload, ExpertPayload};

/// Column layout of the `experts` table
pub struct ExpertSchema;

impl PayloadSchema for ExpertSchema {
    const KIND: ContentKind = ContentKind::Expert;
    const COLUMNS: &'static [&'static str] = &["name", "headline", "bio_html"];

    fn values(payload: &ContentPayload) -> Result<Vec<SqlValue>> {
        match payload {
            ContentPayload::Expert(p) => Ok(vec![
                SqlValue::Text(p.name.clone()),
                SqlValue::OptText(p.headline.clone()),
                SqlValue::Text(p.bio_html.clone()),
            ]),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }

    fn read(row: &dyn ColumnReader) -> Result<ContentPayload> {
        Ok(ContentPayload::Expert(ExpertPayload {
            name: row.text("name")?,
            headline: row.opt_text("headline")?,
            bio_html: row.text("bio_html")?,
        }))
    }
}

pub type SqlxExpertStore = SqlContentStore<ExpertSchema>;

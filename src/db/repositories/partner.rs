//! Partner profile storage adapter

use anyhow::Result;

use super::content::{kind_mismatch, ColumnReader, PayloadSchema, SqlContentStore, SqlValue};
use crate::models::{ContentKind, ContentPayload, PartnerPayload};

/// Column layout of the `partners` table
pub struct PartnerSchema;

impl PayloadSchema for PartnerSchema {
    const KIND: ContentKind = ContentKind::Partner;
    const COLUMNS: &'static [&'static str] = &["name", "website", "description_html"];

    fn values(payload: &ContentPayload) -> Result<Vec<SqlValue>> {
        match payload {
            ContentPayload::Partner(p) => Ok(vec![
                SqlValue::Text(p.name.clone()),
                SqlValue::OptText(p.website.clone()),
                SqlValue::Text(p.description_html.clone()),
            ]),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }

    fn read(row: &dyn ColumnReader) -> Result<ContentPayload> {
        Ok(ContentPayload::Partner(PartnerPayload {
            name: row.text("name")?,
            website: row.opt_text("website")?,
            description_html: row.text("description_html")?,
        }))
    }
}

pub type SqlxPartnerStore = SqlContentStore<PartnerSchema>;

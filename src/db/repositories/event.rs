//! Event storage adapter

use anyhow::Result;

use super::content::{kind_mismatch, ColumnReader, PayloadSchema, SqlContentStore, SqlValue};
use crate::models::{ContentKind, ContentPayload, EventPayload};

/// Column layout of the `events` table
pub struct EventSchema;

impl PayloadSchema for EventSchema {
    const KIND: ContentKind = ContentKind::Event;
    const COLUMNS: &'static [&'static str] =
        &["title", "description_html", "location", "starts_at", "ends_at"];

    fn values(payload: &ContentPayload) -> Result<Vec<SqlValue>> {
        match payload {
            ContentPayload::Event(p) => Ok(vec![
                SqlValue::Text(p.title.clone()),
                SqlValue::Text(p.description_html.clone()),
                SqlValue::OptText(p.location.clone()),
                SqlValue::Time(p.starts_at),
                SqlValue::OptTime(p.ends_at),
            ]),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }

    fn read(row: &dyn ColumnReader) -> Result<ContentPayload> {
        Ok(ContentPayload::Event(EventPayload {
            title: row.text("title")?,
            description_html: row.text("description_html")?,
            location: row.opt_text("location")?,
            starts_at: row.time("starts_at")?,
            ends_at: row.opt_time("ends_at")?,
        }))
    }
}

pub type SqlxEventStore = SqlContentStore<EventSchema>;

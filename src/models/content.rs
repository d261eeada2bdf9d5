//! Moderated content model
//!
//! Articles, events, partner profiles and expert profiles share one editorial
//! lifecycle (`draft` -> `pending_review` -> `published`, with rejection back to
//! `draft`). The lifecycle fields live on [`ContentItem`]; everything
//! kind-specific is carried by an opaque [`ContentPayload`].
//!
//! Status is never written through a [`ContentPatch`]. The only value that
//! can move an item between states is a [`StatusChange`], and those can only be
//! built inside this crate by the moderation service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::sanitizer::sanitize;

/// The kinds of moderated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    Event,
    Partner,
    Expert,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Article,
        ContentKind::Event,
        ContentKind::Partner,
        ContentKind::Expert,
    ];

    /// Lowercase identifier used in URLs and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Event => "event",
            ContentKind::Partner => "partner",
            ContentKind::Expert => "expert",
        }
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Article => "articles",
            ContentKind::Event => "events",
            ContentKind::Partner => "partners",
            ContentKind::Expert => "experts",
        }
    }

    /// Human-facing name used in moderation messages
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Article => "Article",
            ContentKind::Event => "Event",
            ContentKind::Partner => "Partner",
            ContentKind::Expert => "Expert",
        }
    }

    /// Who a rejected item is sent back to
    pub fn author_title(&self) -> &'static str {
        match self {
            ContentKind::Article | ContentKind::Expert => "writer",
            ContentKind::Partner | ContentKind::Event => "partner",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;

    /// Accepts the singular or plural form, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "article" | "articles" => Ok(ContentKind::Article),
            "event" | "events" => Ok(ContentKind::Event),
            "partner" | "partners" => Ok(ContentKind::Partner),
            "expert" | "experts" => Ok(ContentKind::Expert),
            _ => Err(anyhow::anyhow!("Unknown content kind: {}", s)),
        }
    }
}

/// Editorial status. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    PendingReview,
    Published,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::PendingReview => "pending_review",
            ContentStatus::Published => "published",
        }
    }
}

impl Default for ContentStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ContentStatus::Draft),
            "pending_review" => Ok(ContentStatus::PendingReview),
            "published" => Ok(ContentStatus::Published),
            _ => Err(anyhow::anyhow!("Invalid content status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub body_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub title: String,
    pub description_html: String,
    #[serde(default)]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerPayload {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    pub description_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertPayload {
    pub name: String,
    #[serde(default)]
    pub headline: Option<String>,
    pub bio_html: String,
}

/// Kind-specific fields of a content item.
///
/// The moderation layer never looks inside; it only needs `kind()` to match
/// the store the payload is written to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentPayload {
    Article(ArticlePayload),
    Event(EventPayload),
    Partner(PartnerPayload),
    Expert(ExpertPayload),
}

const MAX_TITLE_CHARS: usize = 255;

fn require_text(field: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", field));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(format!(
            "{} must be at most {} characters",
            field, MAX_TITLE_CHARS
        ));
    }
    Ok(())
}

impl ContentPayload {
    /// Decode a request body for the given kind.
    pub fn from_json(kind: ContentKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ContentKind::Article => ContentPayload::Article(serde_json::from_value(value)?),
            ContentKind::Event => ContentPayload::Event(serde_json::from_value(value)?),
            ContentKind::Partner => ContentPayload::Partner(serde_json::from_value(value)?),
            ContentKind::Expert => ContentPayload::Expert(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::Article(_) => ContentKind::Article,
            ContentPayload::Event(_) => ContentKind::Event,
            ContentPayload::Partner(_) => ContentKind::Partner,
            ContentPayload::Expert(_) => ContentKind::Expert,
        }
    }

    /// Field-level checks applied before any write.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ContentPayload::Article(p) => require_text("title", &p.title),
            ContentPayload::Event(p) => {
                require_text("title", &p.title)?;
                match p.ends_at {
                    Some(ends_at) if ends_at < p.starts_at => {
                        Err("ends_at must not be before starts_at".to_string())
                    }
                    _ => Ok(()),
                }
            }
            ContentPayload::Partner(p) => {
                require_text("name", &p.name)?;
                match p.website.as_deref().map(str::trim) {
                    None | Some("") => Ok(()),
                    Some(website) => match url::Url::parse(website) {
                        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
                        _ => Err("website must be an http(s) URL".to_string()),
                    },
                }
            }
            ContentPayload::Expert(p) => require_text("name", &p.name),
        }
    }

    /// Copy of the payload with every HTML-bearing field passed through the
    /// sanitizer. Plain-text fields are left as-is; they are escaped on output.
    pub fn sanitized(&self) -> Self {
        match self {
            ContentPayload::Article(p) => ContentPayload::Article(ArticlePayload {
                title: p.title.clone(),
                summary: p.summary.clone(),
                body_html: sanitize(&p.body_html),
            }),
            ContentPayload::Event(p) => ContentPayload::Event(EventPayload {
                title: p.title.clone(),
                description_html: sanitize(&p.description_html),
                location: p.location.clone(),
                starts_at: p.starts_at,
                ends_at: p.ends_at,
            }),
            ContentPayload::Partner(p) => ContentPayload::Partner(PartnerPayload {
                name: p.name.clone(),
                website: p.website.clone(),
                description_html: sanitize(&p.description_html),
            }),
            ContentPayload::Expert(p) => ContentPayload::Expert(ExpertPayload {
                name: p.name.clone(),
                headline: p.headline.clone(),
                bio_html: sanitize(&p.bio_html),
            }),
        }
    }

    /// Human-readable title used in logs
    pub fn display_name(&self) -> &str {
        match self {
            ContentPayload::Article(p) => &p.title,
            ContentPayload::Event(p) => &p.title,
            ContentPayload::Partner(p) => &p.name,
            ContentPayload::Expert(p) => &p.name,
        }
    }
}

/// A moderated content item of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub id: i64,
    pub kind: ContentKind,
    pub owner_id: i64,
    pub status: ContentStatus,
    /// Present only while the latest decision is a rejection
    pub review_feedback: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i64>,
    /// First time the item entered `published`; never changes afterwards
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: ContentPayload,
}

impl ContentItem {
    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }

    /// Render-path copy with sanitized HTML.
    pub fn sanitized(&self) -> Self {
        Self {
            payload: self.payload.sanitized(),
            ..self.clone()
        }
    }
}

/// Generic update to a content item.
///
/// Carries a replacement payload only. Status is not expressible here.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPatch {
    pub payload: ContentPayload,
}

impl ContentPatch {
    pub fn new(payload: ContentPayload) -> Self {
        Self { payload }
    }
}

/// What a status change does to `review_feedback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackChange {
    Keep,
    Clear,
    Set(String),
}

impl FeedbackChange {
    /// Whether the stored value is replaced
    pub fn overwrites(&self) -> bool {
        !matches!(self, FeedbackChange::Keep)
    }

    /// Replacement value when `overwrites()` is true
    pub fn value(&self) -> Option<&str> {
        match self {
            FeedbackChange::Set(text) => Some(text),
            FeedbackChange::Keep | FeedbackChange::Clear => None,
        }
    }
}

/// A lifecycle move, applied by a store only if the item is still in the
/// expected status.
///
/// Constructors are crate-private: the moderation service is the only
/// producer.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    to: ContentStatus,
    feedback: FeedbackChange,
    reviewed_by: Option<i64>,
    reviewed_at: Option<DateTime<Utc>>,
    publish_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
}

impl StatusChange {
    pub(crate) fn submit(at: DateTime<Utc>) -> Self {
        Self {
            to: ContentStatus::PendingReview,
            feedback: FeedbackChange::Keep,
            reviewed_by: None,
            reviewed_at: None,
            publish_at: None,
            at,
        }
    }

    pub(crate) fn approve(reviewer_id: i64, at: DateTime<Utc>) -> Self {
        Self {
            to: ContentStatus::Published,
            feedback: FeedbackChange::Clear,
            reviewed_by: Some(reviewer_id),
            reviewed_at: Some(at),
            publish_at: Some(at),
            at,
        }
    }

    pub(crate) fn reject(reviewer_id: i64, feedback: String, at: DateTime<Utc>) -> Self {
        Self {
            to: ContentStatus::Draft,
            feedback: FeedbackChange::Set(feedback),
            reviewed_by: Some(reviewer_id),
            reviewed_at: Some(at),
            publish_at: None,
            at,
        }
    }

    /// Target status
    pub fn to(&self) -> ContentStatus {
        self.to
    }

    pub fn feedback(&self) -> &FeedbackChange {
        &self.feedback
    }

    /// Reviewer stamp; `None` leaves the stored stamp untouched
    pub fn reviewed_by(&self) -> Option<i64> {
        self.reviewed_by
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    /// Candidate `published_at`; only applied while the stored value is null
    pub fn publish_at(&self) -> Option<DateTime<Utc>> {
        self.publish_at
    }

    /// New `updated_at`
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Apply to an in-memory item. Stores without a query language use this
    /// so every backend produces the same row.
    pub fn apply_to(&self, item: &mut ContentItem) {
        item.status = self.to;
        match &self.feedback {
            FeedbackChange::Keep => {}
            FeedbackChange::Clear => item.review_feedback = None,
            FeedbackChange::Set(text) => item.review_feedback = Some(text.clone()),
        }
        if let Some(reviewer) = self.reviewed_by {
            item.reviewed_by = Some(reviewer);
        }
        if let Some(reviewed_at) = self.reviewed_at {
            item.reviewed_at = Some(reviewed_at);
        }
        if item.published_at.is_none() {
            item.published_at = self.publish_at;
        }
        item.updated_at = self.at;
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

/// Upper bound on any page size
pub const MAX_PAGE_SIZE: u32 = 100;

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl ListParams {
    /// Create pagination parameters, clamping both values into range
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.page_size as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// Page metadata returned alongside list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(params: &ListParams, total: i64) -> Self {
        let total_pages = if params.page_size == 0 || total <= 0 {
            0
        } else {
            ((total as u64 + params.page_size as u64 - 1) / params.page_size as u64) as u32
        };
        Self {
            page: params.page,
            page_size: params.page_size,
            total,
            total_pages,
        }
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            pagination: Pagination::new(params, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

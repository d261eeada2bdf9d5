//! Common API utilities and shared types

use serde::Deserialize;

/// Default page number (1-indexed)
pub fn default_page() -> i64 {
    1
}

pub fn default_page_size() -> i64 {
    20
}

/// Pagination query parameters.
///
/// Signed so that `page=0` and negative sizes reach the services and are
/// reported as validation errors instead of query rejections.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

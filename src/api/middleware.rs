//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The JSON error envelope and its mapping from service errors
//! - Session token extraction and the `MaybePrincipal` extractor
//! - `ApiJson`, `ApiPath` and `ApiQuery`, which reject with the error envelope

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::repositories::{SqlxExplorerRepository, SqlxSessionRepository, SqlxUserRepository};
use crate::db::DynDatabasePool;
use crate::models::{ContentKind, Principal};
use crate::services::{
    ContentRegistry, ExplorerService, IdentityService, ModerationService, ServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub identity: Arc<IdentityService>,
    pub moderation: Arc<ModerationService>,
    pub explorer: Arc<ExplorerService>,
}

impl AppState {
    /// Wire every service against one database pool.
    pub fn new(pool: DynDatabasePool, config: Config) -> Self {
        let identity = IdentityService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.session.ttl_hours,
        );
        let moderation = ModerationService::new(Arc::new(ContentRegistry::from_pool(&pool)));
        let explorer = ExplorerService::new(
            SqlxExplorerRepository::boxed(pool.clone()),
            config.explorer.effective_max_page_size(),
        );

        Self {
            pool,
            config: Arc::new(config),
            identity: Arc::new(identity),
            moderation: Arc::new(moderation),
            explorer: Arc::new(explorer),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn store_error() -> Self {
        Self::new("STORE_ERROR", "Internal storage error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "INVALID_STATE" | "CONFLICT" => StatusCode::CONFLICT,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Forbidden => Self::new("FORBIDDEN", "You are not allowed to do that"),
            ServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            e @ ServiceError::InvalidState { .. } => Self::new("INVALID_STATE", e.to_string()),
            ServiceError::ValidationError(msg) => Self::validation_error(msg),
            ServiceError::Conflict(msg) => Self::new("CONFLICT", msg),
            e @ ServiceError::AuthenticationFailed => Self::unauthorized(e.to_string()),
            ServiceError::StoreError(e) => {
                tracing::error!(error = %format!("{:#}", e), "Store error");
                Self::store_error()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation_error(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation_error(format!("Invalid path: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation_error(format!("Invalid query: {}", rejection.body_text()))
    }
}

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Parse the `{kind}` path segment. Unknown kinds are a 404.
pub fn parse_kind(raw: &str) -> Result<ContentKind, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("Unknown content kind: {}", raw)))
}

/// Extract session token from the `Authorization: Bearer` header or the
/// session cookie.
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let prefix = format!("{}=", cookie_name);
    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix(prefix.as_str()) {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// The caller's principal, if the request carries a live session.
///
/// Never rejects: anonymous requests get `None` and the services decide.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn as_ref(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers, &state.config.session.cookie_name);
        let principal = state.identity.resolve_session(token.as_deref()).await;
        Ok(MaybePrincipal(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentStatus;
    use axum::http::HeaderValue;

    #[test]
    fn test_error_mapping() {
        let cases = [
            (ServiceError::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ServiceError::NotFound("article 1".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                ServiceError::InvalidState {
                    action: "approve",
                    current: ContentStatus::Draft,
                },
                StatusCode::CONFLICT,
                "INVALID_STATE",
            ),
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ServiceError::Conflict("taken".into()), StatusCode::CONFLICT, "CONFLICT"),
            (ServiceError::AuthenticationFailed, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                ServiceError::StoreError(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.error.code, code);
        }
    }

    #[test]
    fn test_store_error_message_is_generic() {
        let api: ApiError = ServiceError::StoreError(anyhow::anyhow!("password=hunter2")).into();
        assert!(!api.error.message.contains("hunter2"));
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_session_token(&headers, "session").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=tok; other=1"),
        );
        assert_eq!(extract_session_token(&headers, "session").as_deref(), Some("tok"));
        assert_eq!(extract_session_token(&headers, "sid"), None);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("articles").unwrap(), ContentKind::Article);
        assert_eq!(parse_kind("Event").unwrap(), ContentKind::Event);
        let err = parse_kind("podcasts").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}

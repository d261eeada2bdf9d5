//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Account registration
//! - POST /api/v1/auth/login - Login, returns a token and sets the session cookie
//! - POST /api/v1/auth/logout - Logout
//! - GET /api/v1/auth/me - Current principal

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    extract_session_token, ApiError, ApiJson, AppState, MaybePrincipal,
};
use crate::models::{CreateUserInput, Principal, User, UserRole};
use crate::services::LoginInput;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal: Principal,
    pub token: String,
    pub expires_at: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .identity
        .register(CreateUserInput {
            username: body.username,
            email: body.email,
            password: body.password,
            role: body.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .identity
        .login(LoginInput::new(body.username_or_email, body.password))
        .await?;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.session.cookie_name,
        result.session.id,
        (result.session.expires_at - result.session.created_at).num_seconds()
    );

    let mut headers = HeaderMap::new();
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|_| ApiError::validation_error("Invalid session cookie name"))?;
    headers.insert(header::SET_COOKIE, cookie);

    Ok((
        headers,
        Json(LoginResponse {
            principal: result.principal,
            token: result.session.id,
            expires_at: result.session.expires_at.to_rfc3339(),
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_name = &state.config.session.cookie_name;
    let token = extract_session_token(&headers, cookie_name)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.identity.logout(&token).await?;

    let expired = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", cookie_name);
    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&expired) {
        response_headers.insert(header::SET_COOKIE, value);
    }

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me
async fn me(principal: MaybePrincipal) -> Result<Json<Principal>, ApiError> {
    principal
        .0
        .map(Json)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register new user
/// - `POST /auth/login` - Login and get an access token
/// - `GET /auth/me` - The authenticated user

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskive_shared::{auth::middleware::Principal, models::user::User};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password; strength is checked when hashing
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token
    pub token: String,

    /// Always `Bearer`
    pub token_type: &'static str,

    /// Token lifetime in seconds
    pub expires_in: i64,

    pub user: User,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Ada",
///   "email": "ada@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or password shorter than 6 characters
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let user = state
        .accounts
        .register(&req.name, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ...",
///   "token_type": "Bearer",
///   "expires_in": 86400,
///   "user": { "id": 1, "name": "Ada", "email": "ada@example.com", ... }
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let (token, user) = state.accounts.login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.config.jwt.ttl_hours * 3600,
        user,
    }))
}

/// The user the bearer token was issued for
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.current_user(&principal).await?))
}

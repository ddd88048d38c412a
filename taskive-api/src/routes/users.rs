/// User lookup
///
/// `GET /api/users?email=` resolves an email to a user so a project owner can
/// invite by address. Only authenticated callers reach it.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use taskive_shared::models::user::User;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// # Errors
///
/// - `422 Unprocessable Entity`: not an email address
/// - `404 Not Found`: no user with that email
pub async fn find_user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<User>> {
    query.validate()?;

    Ok(Json(state.accounts.find_by_email(&query.email).await?))
}

/// Comment endpoints
///
/// - `GET /api/tasks/:id/comments` - Newest first
/// - `POST /api/tasks/:id/comments` - Any accepted member of the task's project
/// - `DELETE /api/comments/:id` - The author, or the project owner

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskive_shared::{auth::middleware::Principal, models::comment::Comment};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Content must be 1 to 5000 characters"))]
    pub content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let comment = state
        .comments
        .create(&principal, task_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.comments.list(&principal, task_id).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(comment_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.comments.delete(&principal, comment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

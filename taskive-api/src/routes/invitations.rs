/// Invitation endpoints
///
/// An invitation is identified by its project: a user has at most one
/// membership row per project, so `:id` below is the project ID.
///
/// # Endpoints
///
/// - `GET /api/invitations` - The caller's pending invitations, newest first
/// - `POST /api/invitations/:id/accept`
/// - `POST /api/invitations/:id/reject`
/// - `POST /api/invitations/:id/respond` - Body `{ "accept": bool }`

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskive_shared::{
    auth::middleware::Principal,
    models::membership::{Invitation, Membership},
};

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

/// Result of answering an invitation
///
/// `membership` is present after an accept and absent after a reject, which
/// removes the row.
#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub project_id: i64,
    pub accepted: bool,
    pub membership: Option<Membership>,
}

pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Invitation>>> {
    Ok(Json(state.members.list_pending(principal.user_id).await?))
}

pub async fn accept_invitation(
    state: State<AppState>,
    principal: Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<RespondResponse>> {
    respond(state, principal, project_id, true).await
}

pub async fn reject_invitation(
    state: State<AppState>,
    principal: Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<RespondResponse>> {
    respond(state, principal, project_id, false).await
}

/// # Errors
///
/// - `404 Not Found`: no invitation for this project
/// - `409 Conflict`: the invitation was already accepted
pub async fn respond_to_invitation(
    state: State<AppState>,
    principal: Extension<Principal>,
    Path(project_id): Path<i64>,
    Json(req): Json<RespondRequest>,
) -> ApiResult<Json<RespondResponse>> {
    respond(state, principal, project_id, req.accept).await
}

async fn respond(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    project_id: i64,
    accept: bool,
) -> ApiResult<Json<RespondResponse>> {
    let membership = state
        .members
        .respond_to_invitation(&principal, project_id, accept)
        .await?;

    Ok(Json(RespondResponse {
        project_id,
        accepted: accept,
        membership,
    }))
}

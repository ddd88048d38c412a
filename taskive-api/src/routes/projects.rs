/// Project endpoints
///
/// # Endpoints
///
/// - `POST /api/projects` - Create a project; the caller becomes its OWNER
/// - `GET /api/projects` - Projects the caller is an accepted member of
/// - `GET /api/projects/:id` - Any accepted member
/// - `PUT /api/projects/:id` - Owner only
/// - `DELETE /api/projects/:id` - Owner only; removes members, tasks and comments
/// - `POST /api/projects/:id/invite` - Owner only
/// - `GET /api/projects/:id/members` - Any accepted member

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskive_shared::{
    auth::middleware::Principal,
    models::{
        membership::{MemberRole, Membership, ProjectMember},
        project::{Project, UpdateProject},
    },
    store::CascadeStep,
};
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Invite request
///
/// `role` must be one of `OWNER`, `EDITOR`, `VIEWER`; anything else is
/// rejected while the body is parsed.
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_id: i64,
    pub role: MemberRole,
}

/// Outcome of a project deletion
#[derive(Debug, Serialize)]
pub struct DeleteProjectResponse {
    pub project_id: i64,
    pub memberships_removed: u64,
    pub tasks_removed: u64,
    pub comments_removed: u64,
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = state
        .projects
        .create_project(&principal, &req.name, req.description, req.start_date, req.end_date)
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_for_user(&principal).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.get(&principal, project_id).await?))
}

/// Partial update
///
/// An empty or missing `name` keeps the current one, `description` is always
/// overwritten, dates only change when given.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
    Json(changes): Json<UpdateProject>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.update(&principal, project_id, changes).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<DeleteProjectResponse>> {
    let report = state.projects.delete_project(&principal, project_id).await?;

    Ok(Json(DeleteProjectResponse {
        project_id,
        memberships_removed: report
            .rows_for(CascadeStep::DeleteProjectMemberships(project_id))
            .unwrap_or_default(),
        tasks_removed: report
            .rows_for(CascadeStep::DeleteProjectTasks(project_id))
            .unwrap_or_default(),
        comments_removed: report
            .rows_for(CascadeStep::DeleteProjectComments(project_id))
            .unwrap_or_default(),
    }))
}

/// Invite a user
///
/// # Endpoint
///
/// ```text
/// POST /api/projects/:id/invite
/// Content-Type: application/json
///
/// { "user_id": 2, "role": "EDITOR" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: caller is not the owner
/// - `404 Not Found`: project or user does not exist
/// - `409 Conflict`: the user is already a member or invited
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    let membership = state
        .projects
        .add_member(&principal, project_id, req.user_id, req.role)
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Vec<ProjectMember>>> {
    Ok(Json(state.members.list_members(&principal, project_id).await?))
}

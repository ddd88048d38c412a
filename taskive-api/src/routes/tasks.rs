/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/projects/:id/tasks` - Any accepted member, ordered by ID
/// - `POST /api/projects/:id/tasks` - Owners and editors
/// - `GET /api/tasks/:id` - Any accepted member
/// - `PUT /api/tasks/:id` - Owners and editors, partial update
/// - `PATCH /api/tasks/:id/status` - Owners and editors
/// - `DELETE /api/tasks/:id` - Owners and editors; removes the task's comments too

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
    models::task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
    store::CascadeStep,
};
use validator::Validate;

/// Create task request
///
/// `status` defaults to `TODO` and `priority` to `MEDIUM`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<i64>,
}

impl From<CreateTaskRequest> for CreateTask {
    fn from(req: CreateTaskRequest) -> Self {
        CreateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub task_id: i64,
    pub comments_removed: u64,
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state.tasks.create(&principal, project_id, req.into()).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list(&principal, project_id).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get(&principal, task_id).await?))
}

/// Partial update
///
/// An empty `title` is ignored; `status`, `priority` and `due_date` change
/// only when given; `description` and `assignee_id` are always overwritten.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<i64>,
    Json(changes): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.update(&principal, task_id, changes).await?))
}

pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(
        state
            .tasks
            .update_status(&principal, task_id, req.status)
            .await?,
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    let report = state.projects.delete_task(&principal, task_id).await?;

    Ok(Json(DeleteTaskResponse {
        task_id,
        comments_removed: report
            .rows_for(CascadeStep::DeleteTaskComments(task_id))
            .unwrap_or_default(),
    }))
}

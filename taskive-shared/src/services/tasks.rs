/// Task operations
///
/// Every call resolves the task's project first and checks the principal's
/// membership there: reading needs any accepted role, writing needs OWNER or
/// EDITOR. Deletion lives in [`ProjectLifecycle::delete_task`] because it
/// cascades.
///
/// [`ProjectLifecycle::delete_task`]: super::projects::ProjectLifecycle::delete_task

use std::sync::Arc;

use tracing::{info, instrument};

use super::{ServiceError, ServiceResult};
use crate::auth::authorization::{AccessGate, ProjectPermission};
use crate::auth::middleware::Principal;
use crate::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    gate: AccessGate,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            gate: AccessGate::new(store.clone()),
            store,
        }
    }

    /// Creates a task; status defaults to TODO and priority to MEDIUM
    #[instrument(skip(self, data), fields(title = %data.title))]
    pub async fn create(
        &self,
        principal: &Principal,
        project_id: i64,
        mut data: CreateTask,
    ) -> ServiceResult<Task> {
        data.title = data.title.trim().to_string();
        if data.title.is_empty() {
            return Err(ServiceError::Validation("Task title is required".to_string()));
        }

        self.require_project(project_id).await?;
        self.gate
            .authorize(principal, project_id, ProjectPermission::Write.allowed_roles())
            .await?;

        let task = self.store.create_task(project_id, data).await?;

        info!(task_id = task.id, project_id, "Task created");
        Ok(task)
    }

    pub async fn get(&self, principal: &Principal, task_id: i64) -> ServiceResult<Task> {
        self.authorized_task(principal, task_id, ProjectPermission::Read).await
    }

    /// Tasks of a project ordered by ID
    pub async fn list(&self, principal: &Principal, project_id: i64) -> ServiceResult<Vec<Task>> {
        self.require_project(project_id).await?;
        self.gate
            .authorize(principal, project_id, ProjectPermission::Read.allowed_roles())
            .await?;

        Ok(self.store.list_tasks_for_project(project_id).await?)
    }

    /// Applies a partial update, see [`UpdateTask`]
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        principal: &Principal,
        task_id: i64,
        changes: UpdateTask,
    ) -> ServiceResult<Task> {
        let mut task = self
            .authorized_task(principal, task_id, ProjectPermission::Write)
            .await?;

        changes.apply(&mut task);
        let task = self.store.update_task(&task).await?;

        info!(task_id, "Task updated");
        Ok(task)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        task_id: i64,
        status: TaskStatus,
    ) -> ServiceResult<Task> {
        self.authorized_task(principal, task_id, ProjectPermission::Write)
            .await?;

        let task = self.store.update_task_status(task_id, status).await?;

        info!(task_id, status = %status, "Task status changed");
        Ok(task)
    }

    async fn authorized_task(
        &self,
        principal: &Principal,
        task_id: i64,
        permission: ProjectPermission,
    ) -> ServiceResult<Task> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Task", task_id))?;

        self.gate
            .authorize(principal, task.project_id, permission.allowed_roles())
            .await?;

        Ok(task)
    }

    async fn require_project(&self, project_id: i64) -> ServiceResult<()> {
        match self.store.find_project(project_id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found("Project", project_id).into()),
        }
    }
}

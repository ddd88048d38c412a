/// Project lifecycle
///
/// Creation writes the project and its OWNER membership as one unit. Deletion
/// of a project or a task runs an explicit, ordered cascade inside a single
/// transaction:
///
/// | operation | steps |
/// |---|---|
/// | delete project | memberships, comments on its tasks, tasks, project |
/// | delete task | comments, task |
///
/// A failing step rolls back every step before it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskive_shared::auth::middleware::Principal;
/// use taskive_shared::services::projects::ProjectLifecycle;
/// use taskive_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let projects = ProjectLifecycle::new(Arc::new(MemoryStore::new()));
/// let owner = Principal { user_id: 1 };
///
/// let project = projects.create_project(&owner, "Launch", None, None, None).await?;
/// let report = projects.delete_project(&owner, project.id).await?;
/// println!("removed {} rows", report.total_rows());
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::membership::MembershipService;
use super::{ServiceError, ServiceResult};
use crate::auth::authorization::{AccessGate, ProjectPermission};
use crate::auth::middleware::Principal;
use crate::models::membership::{MemberRole, Membership};
use crate::models::project::{NewProject, Project, UpdateProject};
use crate::store::{CascadeReport, CascadeStep, Store, StoreError};

#[derive(Clone)]
pub struct ProjectLifecycle {
    store: Arc<dyn Store>,
    gate: AccessGate,
    members: MembershipService,
}

impl ProjectLifecycle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            gate: AccessGate::new(store.clone()),
            members: MembershipService::new(store.clone()),
            store,
        }
    }

    /// Creates a project owned by the principal
    ///
    /// The OWNER/ACCEPTED membership is committed together with the project,
    /// so the project shows up in the owner's listing right away.
    #[instrument(skip(self, description))]
    pub async fn create_project(
        &self,
        principal: &Principal,
        name: &str,
        description: Option<String>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> ServiceResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("Project name is required".to_string()));
        }

        let project = self
            .store
            .create_project_with_owner(NewProject {
                owner_id: principal.user_id,
                name: name.to_string(),
                description,
                start_date,
                end_date,
            })
            .await?;

        info!(project_id = project.id, owner_id = principal.user_id, "Project created");
        Ok(project)
    }

    /// Fetches a project the principal is an accepted member of
    pub async fn get(&self, principal: &Principal, project_id: i64) -> ServiceResult<Project> {
        let project = self.require_project(project_id).await?;
        self.gate
            .authorize(principal, project_id, ProjectPermission::Read.allowed_roles())
            .await?;

        Ok(project)
    }

    /// Projects the principal is an accepted member of
    pub async fn list_for_user(&self, principal: &Principal) -> ServiceResult<Vec<Project>> {
        self.members.list_accepted(principal.user_id).await
    }

    /// Applies a partial update; owner only
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        principal: &Principal,
        project_id: i64,
        changes: UpdateProject,
    ) -> ServiceResult<Project> {
        let mut project = self.require_project(project_id).await?;
        self.gate
            .authorize(principal, project_id, ProjectPermission::Manage.allowed_roles())
            .await?;

        changes.apply(&mut project);
        let project = self.store.update_project(&project).await?;

        info!(project_id, "Project updated");
        Ok(project)
    }

    /// Deletes the project with its memberships, tasks and comments; owner only
    #[instrument(skip(self))]
    pub async fn delete_project(
        &self,
        principal: &Principal,
        project_id: i64,
    ) -> ServiceResult<CascadeReport> {
        self.require_project(project_id).await?;
        self.gate
            .authorize(principal, project_id, ProjectPermission::Manage.allowed_roles())
            .await?;

        let report = self
            .store
            .run_cascade(&CascadeStep::project_deletion(project_id))
            .await?;

        info!(project_id, rows = report.total_rows(), "Project deleted");
        Ok(report)
    }

    /// Deletes a task and its comments; owners and editors only
    #[instrument(skip(self))]
    pub async fn delete_task(&self, principal: &Principal, task_id: i64) -> ServiceResult<CascadeReport> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Task", task_id))?;
        self.gate
            .authorize(principal, task.project_id, ProjectPermission::Write.allowed_roles())
            .await?;

        let report = self.store.run_cascade(&CascadeStep::task_deletion(task_id)).await?;

        info!(task_id, project_id = task.project_id, "Task deleted");
        Ok(report)
    }

    /// Invites a user into the project; see [`MembershipService::invite`]
    pub async fn add_member(
        &self,
        principal: &Principal,
        project_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> ServiceResult<Membership> {
        self.require_project(project_id).await?;
        self.members.invite(principal, project_id, user_id, role).await
    }

    async fn require_project(&self, project_id: i64) -> ServiceResult<Project> {
        self.store
            .find_project(project_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Project", project_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::models::comment::NewComment;
    use crate::models::membership::MemberStatus;
    use crate::models::task::CreateTask;
    use crate::services::testing;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_create_project_grants_owner_membership() {
        let (_, store) = testing::store();
        let owner = testing::register(&store, "a@x.com").await;
        let projects = ProjectLifecycle::new(store.clone());

        let project = projects
            .create_project(&owner, "Launch", Some("Q3".to_string()), None, None)
            .await
            .unwrap();
        assert_eq!(project.owner_id, owner.user_id);

        let listed = projects.list_for_user(&owner).await.unwrap();
        assert_eq!(listed, vec![project.clone()]);

        let membership = store
            .find_membership(project.id, owner.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, MemberRole::Owner);
        assert_eq!(membership.status, MemberStatus::Accepted);
    }

    #[tokio::test]
    async fn test_create_project_requires_name() {
        let (_, store) = testing::store();
        let owner = testing::register(&store, "a@x.com").await;

        let result = ProjectLifecycle::new(store)
            .create_project(&owner, "   ", None, None, None)
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invite_then_reject_scenario() {
        let (_, store) = testing::store();
        let a = testing::register(&store, "a@x.com").await;
        let b = testing::register(&store, "b@x.com").await;
        let projects = ProjectLifecycle::new(store.clone());
        let members = MembershipService::new(store.clone());

        let launch = projects.create_project(&a, "Launch", None, None, None).await.unwrap();

        let invitation = projects
            .add_member(&a, launch.id, b.user_id, MemberRole::Editor)
            .await
            .unwrap();
        assert_eq!(invitation.status, MemberStatus::Pending);

        members.respond_to_invitation(&b, launch.id, false).await.unwrap();

        assert!(projects.list_for_user(&b).await.unwrap().is_empty());
        let denied = projects.get(&b, launch.id).await;
        assert!(matches!(
            denied,
            Err(ServiceError::Access(AuthzError::NoAccess { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_is_owner_only() {
        let (_, store) = testing::store();
        let a = testing::register(&store, "a@x.com").await;
        let b = testing::register(&store, "b@x.com").await;
        let projects = ProjectLifecycle::new(store.clone());
        let members = MembershipService::new(store.clone());

        let project = projects.create_project(&a, "Launch", None, None, None).await.unwrap();
        projects
            .add_member(&a, project.id, b.user_id, MemberRole::Editor)
            .await
            .unwrap();
        members.respond_to_invitation(&b, project.id, true).await.unwrap();

        let changes = UpdateProject {
            name: "Liftoff".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            projects.update(&b, project.id, changes.clone()).await,
            Err(ServiceError::Access(AuthzError::InsufficientRole { .. }))
        ));

        let updated = projects.update(&a, project.id, changes).await.unwrap();
        assert_eq!(updated.name, "Liftoff");
        assert_eq!(projects.get(&b, project.id).await.unwrap().name, "Liftoff");
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let (_, store) = testing::store();
        let a = testing::register(&store, "a@x.com").await;
        let projects = ProjectLifecycle::new(store);

        assert!(matches!(
            projects.get(&a, 42).await,
            Err(ServiceError::Store(StoreError::NotFound { entity: "Project", id: 42 }))
        ));
        assert!(matches!(
            projects.delete_project(&a, 42).await,
            Err(ServiceError::Store(StoreError::NotFound { .. }))
        ));
    }

    async fn populated() -> (Arc<MemoryStore>, ProjectLifecycle, Principal, i64, i64) {
        let (memory, store) = testing::store();
        let a = testing::register(&store, "a@x.com").await;
        let b = testing::register(&store, "b@x.com").await;
        let projects = ProjectLifecycle::new(store.clone());

        let project = projects.create_project(&a, "Launch", None, None, None).await.unwrap();
        projects
            .add_member(&a, project.id, b.user_id, MemberRole::Viewer)
            .await
            .unwrap();

        let task = store
            .create_task(
                project.id,
                CreateTask {
                    title: "Write docs".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        for content in ["first", "second"] {
            store
                .create_comment(NewComment {
                    task_id: task.id,
                    user_id: a.user_id,
                    content: content.to_string(),
                })
                .await
                .unwrap();
        }

        (memory, projects, a, project.id, task.id)
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let (memory, projects, owner, project_id, task_id) = populated().await;
        assert_eq!(memory.row_counts().await, (2, 1, 2));

        let report = projects.delete_project(&owner, project_id).await.unwrap();
        assert_eq!(report.rows_for(CascadeStep::DeleteProjectMemberships(project_id)), Some(2));
        assert_eq!(report.rows_for(CascadeStep::DeleteProjectComments(project_id)), Some(2));
        assert_eq!(report.rows_for(CascadeStep::DeleteProjectTasks(project_id)), Some(1));
        assert_eq!(report.rows_for(CascadeStep::DeleteProject(project_id)), Some(1));

        assert_eq!(memory.row_counts().await, (0, 0, 0));
        assert!(memory.find_task(task_id).await.unwrap().is_none());
        assert!(projects.list_for_user(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_project_failure_leaves_everything() {
        let (memory, projects, owner, project_id, _) = populated().await;

        memory.fail_on(CascadeStep::DeleteProject(project_id)).await;
        let result = projects.delete_project(&owner, project_id).await;
        assert!(matches!(result, Err(ServiceError::Store(StoreError::Unavailable(_)))));

        assert_eq!(memory.row_counts().await, (2, 1, 2));
        assert_eq!(projects.get(&owner, project_id).await.unwrap().name, "Launch");
    }

    #[tokio::test]
    async fn test_delete_project_requires_owner() {
        let (memory, projects, _, project_id, _) = populated().await;
        let members = MembershipService::new(memory.clone());
        let viewer = Principal { user_id: 2 };
        members.respond_to_invitation(&viewer, project_id, true).await.unwrap();

        assert!(matches!(
            projects.delete_project(&viewer, project_id).await,
            Err(ServiceError::Access(AuthzError::InsufficientRole { actual: MemberRole::Viewer }))
        ));
        assert_eq!(memory.row_counts().await, (2, 1, 2));
    }

    #[tokio::test]
    async fn test_delete_task_cascades() {
        let (memory, projects, owner, _, task_id) = populated().await;

        let report = projects.delete_task(&owner, task_id).await.unwrap();
        assert_eq!(report.total_rows(), 3);
        assert_eq!(memory.row_counts().await, (2, 0, 0));

        assert!(matches!(
            projects.delete_task(&owner, task_id).await,
            Err(ServiceError::Store(StoreError::NotFound { entity: "Task", .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_task_rollback() {
        let (memory, projects, owner, _, task_id) = populated().await;

        memory.fail_on(CascadeStep::DeleteTask(task_id)).await;
        assert!(projects.delete_task(&owner, task_id).await.is_err());
        assert_eq!(memory.row_counts().await, (2, 1, 2));
    }
}

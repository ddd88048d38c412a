/// Persistence abstraction
///
/// [`Store`] is the single shared mutable resource of the system. Services hold
/// it as `Arc<dyn Store>` and never cache what it returns across requests.
///
/// Operations that must be atomic are trait methods rather than sequences of
/// calls, so every implementation has to provide the atomicity itself:
///
/// - [`Store::create_project_with_owner`]: project row plus OWNER membership
/// - [`Store::resolve_invitation`]: locked read-then-transition of a PENDING row
/// - [`Store::run_cascade`]: an ordered list of deletes, all or nothing
///
/// Two implementations exist: [`postgres::PgStore`] for production and
/// [`memory::MemoryStore`] for tests and local experiments.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskive_shared::store::{memory::MemoryStore, CascadeStep, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let report = store.run_cascade(&CascadeStep::project_deletion(42)).await;
/// assert!(report.is_err()); // project 42 does not exist
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::comment::{Comment, NewComment};
use crate::models::membership::{Invitation, MemberStatus, Membership, NewMembership, ProjectMember};
use crate::models::project::{NewProject, Project};
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::models::user::{CreateUser, User};

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A membership already exists for this project and user
    #[error("User {user_id} is already a member of (or invited to) project {project_id}")]
    DuplicateMembership { project_id: i64, user_id: i64 },

    /// The email address is already registered
    #[error("Email already exists")]
    DuplicateEmail,

    /// No PENDING invitation exists for this project and user
    #[error("No pending invitation to project {project_id} for user {user_id}")]
    InvitationNotFound { project_id: i64, user_id: i64 },

    /// The invitation was already answered
    #[error("Invitation to project {project_id} for user {user_id} is already {status}")]
    AlreadyResolved {
        project_id: i64,
        user_id: i64,
        status: MemberStatus,
    },

    /// No membership row exists for this project and user
    #[error("User {user_id} is not a member of project {project_id}")]
    MembershipNotFound { project_id: i64, user_id: i64 },

    /// The addressed entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A referenced row (user, project, task) does not exist
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The store did not answer in time
    #[error("Store operation timed out")]
    Timeout,

    /// Connection or transaction failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }
}

/// One delete in a cascade
///
/// Steps are applied in the order given; the canonical orders are built by
/// [`CascadeStep::project_deletion`] and [`CascadeStep::task_deletion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStep {
    /// Every membership of the project
    DeleteProjectMemberships(i64),
    /// Every comment on any task of the project
    DeleteProjectComments(i64),
    /// Every task of the project
    DeleteProjectTasks(i64),
    /// The project row itself; must remove exactly one row
    DeleteProject(i64),
    /// Every comment on the task
    DeleteTaskComments(i64),
    /// The task row itself; must remove exactly one row
    DeleteTask(i64),
}

impl CascadeStep {
    /// Memberships, comments, tasks, then the project: children before parents
    pub fn project_deletion(project_id: i64) -> [CascadeStep; 4] {
        [
            CascadeStep::DeleteProjectMemberships(project_id),
            CascadeStep::DeleteProjectComments(project_id),
            CascadeStep::DeleteProjectTasks(project_id),
            CascadeStep::DeleteProject(project_id),
        ]
    }

    /// Comments, then the task
    pub fn task_deletion(task_id: i64) -> [CascadeStep; 2] {
        [
            CascadeStep::DeleteTaskComments(task_id),
            CascadeStep::DeleteTask(task_id),
        ]
    }

    /// Entity removed by a root step, `None` for bulk steps
    ///
    /// A root step that removes nothing fails the cascade with `NotFound`.
    pub fn root_entity(&self) -> Option<(&'static str, i64)> {
        match *self {
            CascadeStep::DeleteProject(id) => Some(("Project", id)),
            CascadeStep::DeleteTask(id) => Some(("Task", id)),
            CascadeStep::DeleteProjectMemberships(_)
            | CascadeStep::DeleteProjectComments(_)
            | CascadeStep::DeleteProjectTasks(_)
            | CascadeStep::DeleteTaskComments(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CascadeStep::DeleteProjectMemberships(_) => "delete_project_memberships",
            CascadeStep::DeleteProjectComments(_) => "delete_project_comments",
            CascadeStep::DeleteProjectTasks(_) => "delete_project_tasks",
            CascadeStep::DeleteProject(_) => "delete_project",
            CascadeStep::DeleteTaskComments(_) => "delete_task_comments",
            CascadeStep::DeleteTask(_) => "delete_task",
        }
    }
}

/// Rows removed by each step of a committed cascade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub steps: Vec<(CascadeStep, u64)>,
}

impl CascadeReport {
    pub fn total_rows(&self) -> u64 {
        self.steps.iter().map(|(_, rows)| rows).sum()
    }

    pub fn rows_for(&self, step: CascadeStep) -> Option<u64> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, rows)| *rows)
    }
}

/// Storage operations used by the domain services
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity probe
    async fn health_check(&self) -> Result<(), StoreError>;

    // === Users ===

    /// Fails with `DuplicateEmail` if the email is taken.
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    // === Projects ===

    /// Inserts the project and its OWNER/ACCEPTED membership atomically.
    async fn create_project_with_owner(&self, data: NewProject) -> Result<Project, StoreError>;

    async fn find_project(&self, id: i64) -> Result<Option<Project>, StoreError>;

    /// Writes back name, description and dates. `NotFound` if absent.
    async fn update_project(&self, project: &Project) -> Result<Project, StoreError>;

    /// Projects where the user holds an ACCEPTED membership
    async fn list_projects_for_member(&self, user_id: i64) -> Result<Vec<Project>, StoreError>;

    // === Memberships ===

    /// Fails with `DuplicateMembership` if the pair already has a row.
    async fn insert_membership(&self, data: NewMembership) -> Result<Membership, StoreError>;

    async fn find_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, StoreError>;

    /// Answers a PENDING invitation under a row lock.
    ///
    /// Returns the ACCEPTED membership on accept and `None` on reject (the row
    /// is removed). A missing row yields `InvitationNotFound`; a row that is no
    /// longer PENDING yields `AlreadyResolved`.
    async fn resolve_invitation(
        &self,
        project_id: i64,
        user_id: i64,
        accept: bool,
    ) -> Result<Option<Membership>, StoreError>;

    async fn list_pending_invitations(&self, user_id: i64) -> Result<Vec<Invitation>, StoreError>;

    async fn list_project_members(&self, project_id: i64) -> Result<Vec<ProjectMember>, StoreError>;

    // === Tasks ===

    async fn create_task(&self, project_id: i64, data: CreateTask) -> Result<Task, StoreError>;

    async fn find_task(&self, id: i64) -> Result<Option<Task>, StoreError>;

    /// Writes back every mutable column. `NotFound` if absent.
    async fn update_task(&self, task: &Task) -> Result<Task, StoreError>;

    async fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<Task, StoreError>;

    /// Ordered by task ID
    async fn list_tasks_for_project(&self, project_id: i64) -> Result<Vec<Task>, StoreError>;

    // === Comments ===

    async fn create_comment(&self, data: NewComment) -> Result<Comment, StoreError>;

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;

    /// Newest first
    async fn list_comments_for_task(&self, task_id: i64) -> Result<Vec<Comment>, StoreError>;

    /// `NotFound` if absent.
    async fn delete_comment(&self, id: i64) -> Result<(), StoreError>;

    // === Cascades ===

    /// Runs the steps in order inside one transaction.
    ///
    /// Any failing step, including a root step that removes nothing, rolls
    /// back every earlier step and is returned as the error.
    async fn run_cascade(&self, steps: &[CascadeStep]) -> Result<CascadeReport, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_deletion_order() {
        let plan = CascadeStep::project_deletion(9);
        assert_eq!(
            plan,
            [
                CascadeStep::DeleteProjectMemberships(9),
                CascadeStep::DeleteProjectComments(9),
                CascadeStep::DeleteProjectTasks(9),
                CascadeStep::DeleteProject(9),
            ]
        );
        // only the last step is a root
        assert!(plan[..3].iter().all(|s| s.root_entity().is_none()));
        assert_eq!(plan[3].root_entity(), Some(("Project", 9)));
    }

    #[test]
    fn test_task_deletion_order() {
        let plan = CascadeStep::task_deletion(3);
        assert_eq!(plan[0], CascadeStep::DeleteTaskComments(3));
        assert_eq!(plan[1].root_entity(), Some(("Task", 3)));
    }

    #[test]
    fn test_report_totals() {
        let report = CascadeReport {
            steps: vec![
                (CascadeStep::DeleteTaskComments(1), 3),
                (CascadeStep::DeleteTask(1), 1),
            ],
        };
        assert_eq!(report.total_rows(), 4);
        assert_eq!(report.rows_for(CascadeStep::DeleteTask(1)), Some(1));
        assert_eq!(report.rows_for(CascadeStep::DeleteProject(1)), None);
    }
}

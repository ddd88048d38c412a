/// PostgreSQL [`Store`] implementation
///
/// Composite operations open a transaction with `PgPool::begin`, run their
/// statements through the model functions, and commit explicitly. Any early
/// return drops the transaction, which rolls it back.
///
/// Invitation responses lock the membership row with `SELECT ... FOR UPDATE`,
/// so of two concurrent responders the second waits for the first to commit
/// and then sees the row already answered (or gone).
///
/// # Error mapping
///
/// | sqlx error | StoreError |
/// |---|---|
/// | unique violation on `project_members_pkey` | `DuplicateMembership` |
/// | unique violation on `users_email_key` | `DuplicateEmail` |
/// | foreign key violation | `InvalidReference` |
/// | `PoolTimedOut` | `Timeout` |
/// | anything else | `Unavailable` |

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, warn};

use super::{CascadeReport, CascadeStep, Store, StoreError};
use crate::models::comment::{Comment, NewComment};
use crate::models::membership::{Invitation, MemberStatus, Membership, NewMembership, ProjectMember};
use crate::models::project::{NewProject, Project};
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::models::user::{CreateUser, User};

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// SQLSTATE code of a database error, if any
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    sqlstate(err).as_deref() == Some("23505") && violated_constraint(err) == Some(constraint)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err, "users_email_key") {
        return StoreError::DuplicateEmail;
    }
    if sqlstate(&err).as_deref() == Some("23503") {
        let constraint = violated_constraint(&err).unwrap_or("foreign key").to_string();
        return StoreError::InvalidReference(constraint);
    }

    match err {
        sqlx::Error::PoolTimedOut => {
            warn!(operation, "Timed out acquiring a database connection");
            StoreError::Timeout
        }
        other => {
            error!(operation, error = %other, "Database error");
            StoreError::Unavailable(format!("{}: {}", operation, other))
        }
    }
}

/// Executes one cascade step on an open transaction
async fn apply_step(conn: &mut PgConnection, step: CascadeStep) -> Result<u64, sqlx::Error> {
    match step {
        CascadeStep::DeleteProjectMemberships(id) => Membership::delete_all_for_project(conn, id).await,
        CascadeStep::DeleteProjectComments(id) => Comment::delete_all_for_project(conn, id).await,
        CascadeStep::DeleteProjectTasks(id) => Task::delete_all_for_project(conn, id).await,
        CascadeStep::DeleteProject(id) => Project::delete(conn, id).await,
        CascadeStep::DeleteTaskComments(id) => Comment::delete_all_for_task(conn, id).await,
        CascadeStep::DeleteTask(id) => Task::delete(conn, id).await,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        crate::db::pool::health_check(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("health_check", e))
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| map_sqlx_error("create_user", e))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        User::find_by_id(&self.pool, id)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        User::find_by_email(&self.pool, email)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))
    }

    async fn create_project_with_owner(&self, data: NewProject) -> Result<Project, StoreError> {
        let op = "create_project_with_owner";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        let project = Project::insert(&mut *tx, &data)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;

        Membership::insert(&mut *tx, NewMembership::owner(project.id, project.owner_id))
            .await
            .map_err(|e| map_sqlx_error(op, e))?;

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(project)
    }

    async fn find_project(&self, id: i64) -> Result<Option<Project>, StoreError> {
        Project::find_by_id(&self.pool, id)
            .await
            .map_err(|e| map_sqlx_error("find_project", e))
    }

    async fn update_project(&self, project: &Project) -> Result<Project, StoreError> {
        Project::save(&self.pool, project)
            .await
            .map_err(|e| map_sqlx_error("update_project", e))?
            .ok_or_else(|| StoreError::not_found("Project", project.id))
    }

    async fn list_projects_for_member(&self, user_id: i64) -> Result<Vec<Project>, StoreError> {
        Project::list_for_member(&self.pool, user_id)
            .await
            .map_err(|e| map_sqlx_error("list_projects_for_member", e))
    }

    async fn insert_membership(&self, data: NewMembership) -> Result<Membership, StoreError> {
        Membership::insert(&self.pool, data).await.map_err(|e| {
            if is_unique_violation(&e, "project_members_pkey") {
                StoreError::DuplicateMembership {
                    project_id: data.project_id(),
                    user_id: data.user_id(),
                }
            } else {
                map_sqlx_error("insert_membership", e)
            }
        })
    }

    async fn find_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, StoreError> {
        Membership::find(&self.pool, project_id, user_id)
            .await
            .map_err(|e| map_sqlx_error("find_membership", e))
    }

    async fn resolve_invitation(
        &self,
        project_id: i64,
        user_id: i64,
        accept: bool,
    ) -> Result<Option<Membership>, StoreError> {
        let op = "resolve_invitation";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        let current = Membership::find_for_update(&mut *tx, project_id, user_id)
            .await
            .map_err(|e| map_sqlx_error(op, e))?
            .ok_or(StoreError::InvitationNotFound { project_id, user_id })?;

        if current.status != MemberStatus::Pending {
            return Err(StoreError::AlreadyResolved {
                project_id,
                user_id,
                status: current.status,
            });
        }

        let resolved = if accept {
            let accepted = Membership::accept(&mut *tx, project_id, user_id)
                .await
                .map_err(|e| map_sqlx_error(op, e))?
                .ok_or(StoreError::InvitationNotFound { project_id, user_id })?;
            Some(accepted)
        } else {
            Membership::delete_pending(&mut *tx, project_id, user_id)
                .await
                .map_err(|e| map_sqlx_error(op, e))?;
            None
        };

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(resolved)
    }

    async fn list_pending_invitations(&self, user_id: i64) -> Result<Vec<Invitation>, StoreError> {
        Membership::list_pending_for_user(&self.pool, user_id)
            .await
            .map_err(|e| map_sqlx_error("list_pending_invitations", e))
    }

    async fn list_project_members(&self, project_id: i64) -> Result<Vec<ProjectMember>, StoreError> {
        Membership::list_for_project(&self.pool, project_id)
            .await
            .map_err(|e| map_sqlx_error("list_project_members", e))
    }

    async fn create_task(&self, project_id: i64, data: CreateTask) -> Result<Task, StoreError> {
        Task::create(&self.pool, project_id, data)
            .await
            .map_err(|e| map_sqlx_error("create_task", e))
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        Task::find_by_id(&self.pool, id)
            .await
            .map_err(|e| map_sqlx_error("find_task", e))
    }

    async fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        Task::save(&self.pool, task)
            .await
            .map_err(|e| map_sqlx_error("update_task", e))?
            .ok_or_else(|| StoreError::not_found("Task", task.id))
    }

    async fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<Task, StoreError> {
        Task::update_status(&self.pool, id, status)
            .await
            .map_err(|e| map_sqlx_error("update_task_status", e))?
            .ok_or_else(|| StoreError::not_found("Task", id))
    }

    async fn list_tasks_for_project(&self, project_id: i64) -> Result<Vec<Task>, StoreError> {
        Task::list_for_project(&self.pool, project_id)
            .await
            .map_err(|e| map_sqlx_error("list_tasks_for_project", e))
    }

    async fn create_comment(&self, data: NewComment) -> Result<Comment, StoreError> {
        Comment::create(&self.pool, data)
            .await
            .map_err(|e| map_sqlx_error("create_comment", e))
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Comment::find_by_id(&self.pool, id)
            .await
            .map_err(|e| map_sqlx_error("find_comment", e))
    }

    async fn list_comments_for_task(&self, task_id: i64) -> Result<Vec<Comment>, StoreError> {
        Comment::list_for_task(&self.pool, task_id)
            .await
            .map_err(|e| map_sqlx_error("list_comments_for_task", e))
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        let removed = Comment::delete(&self.pool, id)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;

        if removed == 0 {
            return Err(StoreError::not_found("Comment", id));
        }
        Ok(())
    }

    async fn run_cascade(&self, steps: &[CascadeStep]) -> Result<CascadeReport, StoreError> {
        let op = "run_cascade";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;
        let mut report = CascadeReport::default();

        for &step in steps {
            let rows = match apply_step(&mut tx, step).await {
                Ok(rows) => rows,
                Err(e) => {
                    let mapped = map_sqlx_error(step.name(), e);
                    warn!(step = step.name(), error = %mapped, "Cascade step failed, rolling back");
                    tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                    return Err(mapped);
                }
            };

            if rows == 0 {
                if let Some((entity, id)) = step.root_entity() {
                    tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                    return Err(StoreError::not_found(entity, id));
                }
            }

            debug!(step = step.name(), rows, "Cascade step applied");
            report.steps.push((step, rows));
        }

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(report)
    }
}

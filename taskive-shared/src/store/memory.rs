/// In-memory [`Store`] implementation
///
/// All tables sit behind one `tokio::sync::Mutex`, which serializes every
/// operation the way row locks serialize them in PostgreSQL. Composite
/// operations run against a cloned snapshot that replaces the live tables only
/// once every step succeeded, so a failure part way through leaves nothing
/// behind.
///
/// Foreign keys are enforced the same way the schema enforces them: deleting a
/// parent that still has children fails with `InvalidReference`.
///
/// Cloning a `MemoryStore` shares the same tables.
///
/// # Example
///
/// ```no_run
/// use taskive_shared::store::{memory::MemoryStore, CascadeStep, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// // Make the next cascade fail when it reaches the task delete
/// store.fail_on(CascadeStep::DeleteProjectTasks(1)).await;
/// # Ok(())
/// # }
/// ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CascadeReport, CascadeStep, Store, StoreError};
use crate::models::comment::{Comment, NewComment};
use crate::models::membership::{Invitation, MemberStatus, Membership, NewMembership, ProjectMember};
use crate::models::project::{NewProject, Project};
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    projects: BTreeMap<i64, Project>,
    members: BTreeMap<(i64, i64), Membership>,
    tasks: BTreeMap<i64, Task>,
    comments: BTreeMap<i64, Comment>,
    last_user_id: i64,
    last_project_id: i64,
    last_task_id: i64,
    last_comment_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

impl Tables {
    fn require_user(&self, id: i64) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("user {} does not exist", id)))
        }
    }

    fn require_project(&self, id: i64) -> Result<(), StoreError> {
        if self.projects.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("project {} does not exist", id)))
        }
    }

    fn require_task(&self, id: i64) -> Result<(), StoreError> {
        if self.tasks.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("task {} does not exist", id)))
        }
    }

    fn project_task_ids(&self, project_id: i64) -> BTreeSet<i64> {
        self.tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id)
            .collect()
    }

    /// Applies one cascade step, returning the number of rows removed
    fn apply(&mut self, step: CascadeStep) -> Result<u64, StoreError> {
        let removed = match step {
            CascadeStep::DeleteProjectMemberships(project_id) => {
                let before = self.members.len();
                self.members.retain(|(p, _), _| *p != project_id);
                before - self.members.len()
            }
            CascadeStep::DeleteProjectComments(project_id) => {
                let task_ids = self.project_task_ids(project_id);
                let before = self.comments.len();
                self.comments.retain(|_, c| !task_ids.contains(&c.task_id));
                before - self.comments.len()
            }
            CascadeStep::DeleteProjectTasks(project_id) => {
                let task_ids = self.project_task_ids(project_id);
                if self.comments.values().any(|c| task_ids.contains(&c.task_id)) {
                    return Err(StoreError::InvalidReference(format!(
                        "tasks of project {} still have comments",
                        project_id
                    )));
                }
                let before = self.tasks.len();
                self.tasks.retain(|_, t| t.project_id != project_id);
                before - self.tasks.len()
            }
            CascadeStep::DeleteProject(project_id) => {
                let has_members = self.members.keys().any(|(p, _)| *p == project_id);
                let has_tasks = self.tasks.values().any(|t| t.project_id == project_id);
                if has_members || has_tasks {
                    return Err(StoreError::InvalidReference(format!(
                        "project {} still has members or tasks",
                        project_id
                    )));
                }
                usize::from(self.projects.remove(&project_id).is_some())
            }
            CascadeStep::DeleteTaskComments(task_id) => {
                let before = self.comments.len();
                self.comments.retain(|_, c| c.task_id != task_id);
                before - self.comments.len()
            }
            CascadeStep::DeleteTask(task_id) => {
                if self.comments.values().any(|c| c.task_id == task_id) {
                    return Err(StoreError::InvalidReference(format!(
                        "task {} still has comments",
                        task_id
                    )));
                }
                usize::from(self.tasks.remove(&task_id).is_some())
            }
        };

        Ok(removed as u64)
    }
}

/// In-memory store backed by ordered maps
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fault: Arc<Mutex<Option<CascadeStep>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next cascade that reaches `step` fail with `Unavailable`
    ///
    /// The fault fires once and is then cleared.
    pub async fn fail_on(&self, step: CascadeStep) {
        *self.fault.lock().await = Some(step);
    }

    /// Number of memberships, tasks and comments currently stored
    pub async fn row_counts(&self) -> (usize, usize, usize) {
        let tables = self.tables.lock().await;
        (tables.members.len(), tables.tasks.len(), tables.comments.len())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: next_id(&mut tables.last_user_id),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_project_with_owner(&self, data: NewProject) -> Result<Project, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.require_user(data.owner_id)?;

        let mut working = tables.clone();
        let now = Utc::now();
        let project = Project {
            id: next_id(&mut working.last_project_id),
            name: data.name,
            description: data.description,
            start_date: Some(data.start_date.unwrap_or(now)),
            end_date: data.end_date,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        working.projects.insert(project.id, project.clone());

        let owner = NewMembership::owner(project.id, project.owner_id);
        working.members.insert(
            (owner.project_id(), owner.user_id()),
            Membership {
                project_id: owner.project_id(),
                user_id: owner.user_id(),
                role: owner.role(),
                status: owner.status(),
                created_at: now,
                updated_at: now,
            },
        );

        *tables = working;
        Ok(project)
    }

    async fn find_project(&self, id: i64) -> Result<Option<Project>, StoreError> {
        Ok(self.tables.lock().await.projects.get(&id).cloned())
    }

    async fn update_project(&self, project: &Project) -> Result<Project, StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .projects
            .get_mut(&project.id)
            .ok_or_else(|| StoreError::not_found("Project", project.id))?;

        stored.name = project.name.clone();
        stored.description = project.description.clone();
        stored.start_date = project.start_date;
        stored.end_date = project.end_date;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_projects_for_member(&self, user_id: i64) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .members
            .values()
            .filter(|m| m.user_id == user_id && m.status == MemberStatus::Accepted)
            .filter_map(|m| tables.projects.get(&m.project_id).cloned())
            .collect())
    }

    async fn insert_membership(&self, data: NewMembership) -> Result<Membership, StoreError> {
        let mut tables = self.tables.lock().await;
        let key = (data.project_id(), data.user_id());
        if tables.members.contains_key(&key) {
            return Err(StoreError::DuplicateMembership {
                project_id: key.0,
                user_id: key.1,
            });
        }
        tables.require_project(key.0)?;
        tables.require_user(key.1)?;

        let now = Utc::now();
        let membership = Membership {
            project_id: key.0,
            user_id: key.1,
            role: data.role(),
            status: data.status(),
            created_at: now,
            updated_at: now,
        };
        tables.members.insert(key, membership.clone());
        Ok(membership)
    }

    async fn find_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.members.get(&(project_id, user_id)).cloned())
    }

    async fn resolve_invitation(
        &self,
        project_id: i64,
        user_id: i64,
        accept: bool,
    ) -> Result<Option<Membership>, StoreError> {
        let mut tables = self.tables.lock().await;
        let key = (project_id, user_id);

        let status = tables
            .members
            .get(&key)
            .map(|m| m.status)
            .ok_or(StoreError::InvitationNotFound { project_id, user_id })?;

        if status != MemberStatus::Pending {
            return Err(StoreError::AlreadyResolved {
                project_id,
                user_id,
                status,
            });
        }

        if accept {
            let membership = tables
                .members
                .get_mut(&key)
                .ok_or(StoreError::InvitationNotFound { project_id, user_id })?;
            membership.status = MemberStatus::Accepted;
            membership.updated_at = Utc::now();
            Ok(Some(membership.clone()))
        } else {
            tables.members.remove(&key);
            Ok(None)
        }
    }

    async fn list_pending_invitations(&self, user_id: i64) -> Result<Vec<Invitation>, StoreError> {
        let tables = self.tables.lock().await;
        let mut invitations: Vec<Invitation> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id && m.status == MemberStatus::Pending)
            .filter_map(|m| {
                let project = tables.projects.get(&m.project_id)?;
                let owner = tables.users.get(&project.owner_id)?;
                Some(Invitation {
                    project_id: project.id,
                    project_name: project.name.clone(),
                    inviter_id: owner.id,
                    inviter_name: owner.name.clone(),
                    role: m.role,
                    status: m.status,
                    created_at: m.created_at,
                })
            })
            .collect();

        invitations.sort_by_key(|i| (Reverse(i.created_at), i.project_id));
        Ok(invitations)
    }

    async fn list_project_members(&self, project_id: i64) -> Result<Vec<ProjectMember>, StoreError> {
        let tables = self.tables.lock().await;
        let mut members: Vec<ProjectMember> = tables
            .members
            .values()
            .filter(|m| m.project_id == project_id)
            .filter_map(|m| {
                let user = tables.users.get(&m.user_id)?;
                Some(ProjectMember {
                    project_id: m.project_id,
                    user_id: m.user_id,
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                    role: m.role,
                    status: m.status,
                    created_at: m.created_at,
                })
            })
            .collect();

        members.sort_by_key(|m| (m.created_at, m.user_id));
        Ok(members)
    }

    async fn create_task(&self, project_id: i64, data: CreateTask) -> Result<Task, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.require_project(project_id)?;
        if let Some(assignee) = data.assignee_id {
            tables.require_user(assignee)?;
        }

        let now = Utc::now();
        let task = Task {
            id: next_id(&mut tables.last_task_id),
            project_id,
            title: data.title,
            description: data.description,
            status: data.status.unwrap_or_default(),
            priority: data.priority.unwrap_or_default(),
            due_date: data.due_date,
            assignee_id: data.assignee_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.lock().await.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(assignee) = task.assignee_id {
            tables.require_user(assignee)?;
        }
        let stored = tables
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| StoreError::not_found("Task", task.id))?;

        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.status = task.status;
        stored.priority = task.priority;
        stored.due_date = task.due_date;
        stored.assignee_id = task.assignee_id;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<Task, StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Task", id))?;

        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_tasks_for_project(&self, project_id: i64) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, data: NewComment) -> Result<Comment, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.require_task(data.task_id)?;
        tables.require_user(data.user_id)?;

        let now = Utc::now();
        let comment = Comment {
            id: next_id(&mut tables.last_comment_id),
            task_id: data.task_id,
            user_id: data.user_id,
            content: data.content,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Ok(self.tables.lock().await.comments.get(&id).cloned())
    }

    async fn list_comments_for_task(&self, task_id: i64) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect();

        comments.sort_by_key(|c| (Reverse(c.created_at), Reverse(c.id)));
        Ok(comments)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("Comment", id))
    }

    async fn run_cascade(&self, steps: &[CascadeStep]) -> Result<CascadeReport, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut fault = self.fault.lock().await;
        let mut working = tables.clone();
        let mut report = CascadeReport::default();

        for &step in steps {
            if *fault == Some(step) {
                *fault = None;
                warn!(step = step.name(), "Injected cascade failure, rolling back");
                return Err(StoreError::Unavailable(format!(
                    "injected failure at {}",
                    step.name()
                )));
            }

            let rows = working.apply(step).map_err(|e| {
                warn!(step = step.name(), error = %e, "Cascade step failed, rolling back");
                e
            })?;

            if rows == 0 {
                if let Some((entity, id)) = step.root_entity() {
                    return Err(StoreError::not_found(entity, id));
                }
            }

            debug!(step = step.name(), rows, "Cascade step applied");
            report.steps.push((step, rows));
        }

        *tables = working;
        Ok(report)
    }
}

/// Task model and database operations
///
/// Tasks belong to exactly one project. The assignee is any user ID; it is
/// not checked against the project's members.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'IN_PROGRESS', 'DONE');
/// CREATE TYPE task_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'TODO',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     due_date TIMESTAMPTZ,
///     project_id BIGINT NOT NULL REFERENCES projects(id),
///     assignee_id BIGINT REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use super::ParseEnumError;

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(ParseEnumError::new("task status", other)),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            other => Err(ParseEnumError::new("task priority", other)),
        }
    }
}

/// A task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// Missing status and priority fall back to TODO and MEDIUM.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<i64>,
}

/// Partial update of a task
///
/// An empty title is ignored. Status, priority and due date change only when
/// present. Description and assignee always overwrite, so omitting them
/// clears them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<i64>,
}

impl UpdateTask {
    /// Applies this update to a task in place
    pub fn apply(self, task: &mut Task) {
        if !self.title.is_empty() {
            task.title = self.title;
        }
        task.description = self.description;
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        task.assignee_id = self.assignee_id;
    }
}

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, due_date, \
                            assignee_id, created_at, updated_at";

impl Task {
    pub async fn create<'e, E>(executor: E, project_id: i64, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (project_id, title, description, status, priority, due_date, assignee_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status.unwrap_or_default())
        .bind(data.priority.unwrap_or_default())
        .bind(data.due_date)
        .bind(data.assignee_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Writes back the mutable columns of a task
    pub async fn save<'e, E>(executor: E, task: &Task) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5,
                due_date = $6, assignee_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.assignee_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: i64,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_for_project<'e, E>(executor: E, project_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY id"
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_all_for_project<'e, E>(executor: E, project_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            project_id: 1,
            title: "Write docs".to_string(),
            description: Some("draft".to_string()),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            assignee_id: Some(4),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_create_input_defaults_from_json() {
        let input: CreateTask = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(input.status, None);
        assert_eq!(input.priority, None);

        assert!(serde_json::from_str::<CreateTask>(r#"{"title": "x", "status": "BLOCKED"}"#).is_err());
    }

    #[test]
    fn test_update_partial_semantics() {
        let mut t = task();
        UpdateTask {
            title: String::new(),
            description: None,
            status: Some(TaskStatus::InProgress),
            priority: None,
            due_date: None,
            assignee_id: None,
        }
        .apply(&mut t);

        assert_eq!(t.title, "Write docs");
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.priority, TaskPriority::Medium);
        assert_eq!(t.description, None);
        assert_eq!(t.assignee_id, None);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("in_progress".parse::<TaskStatus>().is_err());
        assert_eq!("HIGH".parse::<TaskPriority>().unwrap(), TaskPriority::High);
    }
}

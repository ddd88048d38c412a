/// Comment model and database operations
///
/// A comment belongs to one task and one authoring user. Comments are removed
/// explicitly before their task (see [`CascadeStep`](crate::store::CascadeStep)).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    /// Author
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub task_id: i64,
    pub user_id: i64,
    pub content: String,
}

impl Comment {
    pub async fn create<'e, E>(executor: E, data: NewComment) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.content)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Comment>(
            "SELECT id, task_id, user_id, content, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists a task's comments, newest first
    pub async fn list_for_task<'e, E>(executor: E, task_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, user_id, content, created_at, updated_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_all_for_task<'e, E>(executor: E, task_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM comments WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Removes the comments of every task in a project
    pub async fn delete_all_for_project<'e, E>(executor: E, project_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM comments WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)",
        )
        .bind(project_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}

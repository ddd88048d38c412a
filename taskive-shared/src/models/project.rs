/// Project model and database operations
///
/// A project is owned by exactly one user (`owner_id`), but ownership alone
/// grants nothing: access is always decided from the `project_members` table.
/// Creating a project therefore always goes through
/// [`Store::create_project_with_owner`](crate::store::Store::create_project_with_owner),
/// which writes the project row and the OWNER membership in one transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     start_date TIMESTAMPTZ,
///     end_date TIMESTAMPTZ,
///     owner_id BIGINT NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// A project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    /// The creating user; becomes the OWNER member
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Defaults to the creation time when absent
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Partial update of a project
///
/// An empty `name` is ignored. `description` always overwrites. Dates are
/// only changed when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl UpdateProject {
    /// Applies this update to a project in place
    pub fn apply(self, project: &mut Project) {
        if !self.name.is_empty() {
            project.name = self.name;
        }
        project.description = self.description;
        if let Some(start) = self.start_date {
            project.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            project.end_date = Some(end);
        }
    }
}

impl Project {
    /// Inserts the project row only
    ///
    /// Callers must write the OWNER membership in the same transaction.
    pub async fn insert<'e, E>(executor: E, data: &NewProject) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, start_date, end_date, owner_id)
            VALUES ($1, $2, COALESCE($3, NOW()), $4, $5)
            RETURNING id, name, description, start_date, end_date, owner_id, created_at, updated_at
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.owner_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, start_date, end_date, owner_id, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Writes back the mutable columns of a project
    pub async fn save<'e, E>(executor: E, project: &Project) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, start_date = $4, end_date = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, start_date, end_date, owner_id, created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.start_date)
        .bind(project.end_date)
        .fetch_optional(executor)
        .await
    }

    /// Lists the projects a user has an ACCEPTED membership in
    pub async fn list_for_member<'e, E>(executor: E, user_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.start_date, p.end_date, p.owner_id,
                   p.created_at, p.updated_at
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1 AND m.status = 'ACCEPTED'
            ORDER BY p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Deletes the project row, returning the number of rows removed
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

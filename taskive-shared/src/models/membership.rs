/// Membership model: who belongs to which project, with what role and status
///
/// A membership is keyed by `(project_id, user_id)`; at most one row exists per
/// pair. Its [`MemberStatus`] drives the invitation state machine:
///
/// ```text
///  (none) --invite--> PENDING --accept--> ACCEPTED
///                        |
///                        +----reject--> (row removed)
///  (none) --project created--> ACCEPTED (OWNER, never PENDING)
/// ```
///
/// Only ACCEPTED rows grant access. No transition leaves ACCEPTED, and nothing
/// ever moves back into PENDING.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE member_role AS ENUM ('OWNER', 'EDITOR', 'VIEWER');
/// CREATE TYPE member_status AS ENUM ('PENDING', 'ACCEPTED', 'REJECTED');
///
/// CREATE TABLE project_members (
///     project_id BIGINT NOT NULL REFERENCES projects(id),
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     role member_role NOT NULL,
///     status member_status NOT NULL DEFAULT 'PENDING',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT project_members_pkey PRIMARY KEY (project_id, user_id)
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use super::ParseEnumError;

/// Role of a member within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    /// Full control, including invitations and deletion
    Owner,

    /// Can create, edit and delete tasks
    Editor,

    /// Read-only, may comment
    Viewer,
}

impl MemberRole {
    /// Every role, in descending order of privilege
    pub const ALL: [MemberRole; 3] = [MemberRole::Owner, MemberRole::Editor, MemberRole::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "OWNER",
            MemberRole::Editor => "EDITOR",
            MemberRole::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(MemberRole::Owner),
            "EDITOR" => Ok(MemberRole::Editor),
            "VIEWER" => Ok(MemberRole::Viewer),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Invitation status of a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    /// Invited, not yet answered. Grants no access.
    Pending,

    /// Active member
    Accepted,

    /// Terminal, grants no access. Rejections currently delete the row, so
    /// this only appears in data written by other tools.
    Rejected,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Pending => "PENDING",
            MemberStatus::Accepted => "ACCEPTED",
            MemberStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MemberStatus::Pending),
            "ACCEPTED" => Ok(MemberStatus::Accepted),
            "REJECTED" => Ok(MemberStatus::Rejected),
            other => Err(ParseEnumError::new("status", other)),
        }
    }
}

/// A `(project, user)` membership row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub project_id: i64,
    pub user_id: i64,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// True when this membership currently grants access
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Accepted
    }
}

/// A membership about to be inserted
///
/// Only the two constructors exist, one per entry edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewMembership {
    project_id: i64,
    user_id: i64,
    role: MemberRole,
    status: MemberStatus,
}

impl NewMembership {
    /// OWNER/ACCEPTED membership written alongside a new project
    pub fn owner(project_id: i64, user_id: i64) -> Self {
        Self {
            project_id,
            user_id,
            role: MemberRole::Owner,
            status: MemberStatus::Accepted,
        }
    }

    /// PENDING invitation with the given role
    pub fn invitation(project_id: i64, user_id: i64, role: MemberRole) -> Self {
        Self {
            project_id,
            user_id,
            role,
            status: MemberStatus::Pending,
        }
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }

    pub fn status(&self) -> MemberStatus {
        self.status
    }
}

/// A pending invitation as seen by the invitee
///
/// Invitations have no surrogate key; `project_id` identifies one together
/// with the invitee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub project_id: i64,
    pub project_name: String,
    /// The project owner
    pub inviter_id: i64,
    pub inviter_name: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

/// A membership joined with the member's public user fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub project_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

const MEMBERSHIP_COLUMNS: &str = "project_id, user_id, role, status, created_at, updated_at";

impl Membership {
    /// Inserts a membership row
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `project_members_pkey` if the pair exists.
    pub async fn insert<'e, E>(executor: E, data: NewMembership) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO project_members (project_id, user_id, role, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .bind(data.status)
        .fetch_one(executor)
        .await
    }

    pub async fn find<'e, E>(
        executor: E,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM project_members WHERE project_id = $1 AND user_id = $2"
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Reads a membership and locks its row until the transaction ends
    ///
    /// Concurrent callers block here, then observe the committed state of the
    /// first one.
    pub async fn find_for_update<'e, E>(
        executor: E,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM project_members \
             WHERE project_id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Moves a PENDING row to ACCEPTED
    ///
    /// Returns `None` when no PENDING row matched.
    pub async fn accept<'e, E>(
        executor: E,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE project_members
            SET status = 'ACCEPTED', updated_at = NOW()
            WHERE project_id = $1 AND user_id = $2 AND status = 'PENDING'
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Removes a PENDING row, returning the number of rows removed
    pub async fn delete_pending<'e, E>(
        executor: E,
        project_id: i64,
        user_id: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM project_members WHERE project_id = $1 AND user_id = $2 AND status = 'PENDING'",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes every membership of a project
    pub async fn delete_all_for_project<'e, E>(executor: E, project_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists a user's PENDING invitations with project and inviter names
    ///
    /// The inviter is the project owner.
    pub async fn list_pending_for_user<'e, E>(
        executor: E,
        user_id: i64,
    ) -> Result<Vec<Invitation>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT m.project_id, p.name AS project_name,
                   p.owner_id AS inviter_id, u.name AS inviter_name,
                   m.role, m.status, m.created_at
            FROM project_members m
            JOIN projects p ON p.id = m.project_id
            JOIN users u ON u.id = p.owner_id
            WHERE m.user_id = $1 AND m.status = 'PENDING'
            ORDER BY m.created_at DESC, m.project_id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Lists every membership of a project, in any status
    pub async fn list_for_project<'e, E>(
        executor: E,
        project_id: i64,
    ) -> Result<Vec<ProjectMember>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT m.project_id, m.user_id, u.name AS user_name, u.email AS user_email,
                   m.role, m.status, m.created_at
            FROM project_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.created_at, m.user_id
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }
}

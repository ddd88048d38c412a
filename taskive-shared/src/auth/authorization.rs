/// Project-scoped role-based access control
///
/// The [`AccessGate`] answers one question: may this principal act on this
/// project with one of these roles? It reads the membership fresh from the
/// [`Store`] on every call; nothing is cached across requests.
///
/// # Decision table
///
/// | membership | decision |
/// |---|---|
/// | none | `NoAccess` |
/// | PENDING or REJECTED | `NoAccess` |
/// | ACCEPTED, role not allowed | `InsufficientRole` |
/// | ACCEPTED, role allowed | allow |
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskive_shared::auth::authorization::{AccessGate, ProjectPermission};
/// use taskive_shared::auth::middleware::Principal;
/// use taskive_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gate = AccessGate::new(Arc::new(MemoryStore::new()));
/// let principal = Principal { user_id: 1 };
///
/// let membership = gate
///     .authorize(&principal, 10, ProjectPermission::Write.allowed_roles())
///     .await?;
/// println!("acting as {}", membership.role);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use tracing::{debug, warn};

use super::middleware::Principal;
use crate::models::membership::{MemberRole, MemberStatus, Membership};
use crate::store::{Store, StoreError};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No ACCEPTED membership in the project
    #[error("No access to project {project_id}")]
    NoAccess { project_id: i64 },

    /// Member, but the role is not allowed for this operation
    #[error("Insufficient permissions: role {actual} is not allowed")]
    InsufficientRole { actual: MemberRole },

    /// Membership lookup failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoAccess,
    InsufficientRole(MemberRole),
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Allow(Membership),
    Deny(DenyReason),
}

/// Permission levels for project-scoped operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPermission {
    /// View the project, its tasks, members and comments; add comments
    Read,

    /// Create, edit and delete tasks
    Write,

    /// Edit or delete the project, invite members
    Manage,
}

impl ProjectPermission {
    /// Roles that hold this permission
    pub fn allowed_roles(&self) -> &'static [MemberRole] {
        match self {
            ProjectPermission::Read => &[MemberRole::Owner, MemberRole::Editor, MemberRole::Viewer],
            ProjectPermission::Write => &[MemberRole::Owner, MemberRole::Editor],
            ProjectPermission::Manage => &[MemberRole::Owner],
        }
    }
}

/// Decides access from an optional membership row
///
/// Pure function of its inputs; [`AccessGate`] feeds it the current row.
pub fn decide(membership: Option<Membership>, allowed: &[MemberRole]) -> AccessDecision {
    let Some(membership) = membership else {
        return AccessDecision::Deny(DenyReason::NoAccess);
    };

    match membership.status {
        MemberStatus::Pending | MemberStatus::Rejected => AccessDecision::Deny(DenyReason::NoAccess),
        MemberStatus::Accepted if allowed.contains(&membership.role) => AccessDecision::Allow(membership),
        MemberStatus::Accepted => AccessDecision::Deny(DenyReason::InsufficientRole(membership.role)),
    }
}

/// Access Control Gate backed by the membership store
#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn Store>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Looks up the principal's membership and decides
    pub async fn check(
        &self,
        principal: &Principal,
        project_id: i64,
        allowed: &[MemberRole],
    ) -> Result<AccessDecision, StoreError> {
        let membership = self
            .store
            .find_membership(project_id, principal.user_id)
            .await?;

        Ok(decide(membership, allowed))
    }

    /// Like [`check`](Self::check), but turns a denial into an error
    ///
    /// Returns the membership on success so callers can inspect the role.
    pub async fn authorize(
        &self,
        principal: &Principal,
        project_id: i64,
        allowed: &[MemberRole],
    ) -> Result<Membership, AuthzError> {
        match self.check(principal, project_id, allowed).await? {
            AccessDecision::Allow(membership) => {
                debug!(user_id = principal.user_id, project_id, role = %membership.role, "Access granted");
                Ok(membership)
            }
            AccessDecision::Deny(DenyReason::NoAccess) => {
                warn!(user_id = principal.user_id, project_id, "Access denied: no active membership");
                Err(AuthzError::NoAccess { project_id })
            }
            AccessDecision::Deny(DenyReason::InsufficientRole(actual)) => {
                warn!(user_id = principal.user_id, project_id, role = %actual, "Access denied: insufficient role");
                Err(AuthzError::InsufficientRole { actual })
            }
        }
    }
}

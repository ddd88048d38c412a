/// Membership store operations
///
/// Who belongs to which project, with what role and status. Invitations move
/// through a small state machine:
///
/// ```text
/// (none) --invite--> PENDING --accept--> ACCEPTED
///                       |
///                       +----reject----> (row removed)
/// (none) --project creation--> ACCEPTED (OWNER)
/// ```
///
/// Nothing leaves ACCEPTED, and a rejected invitation is gone for good; the
/// pair can be invited again afterwards.

use std::sync::Arc;

use tracing::{info, instrument};

use super::ServiceResult;
use crate::auth::authorization::{AccessGate, ProjectPermission};
use crate::auth::middleware::Principal;
use crate::models::membership::{Invitation, MemberRole, Membership, NewMembership, ProjectMember};
use crate::models::project::Project;
use crate::store::{CascadeStep, Store, StoreError};

#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn Store>,
    gate: AccessGate,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            gate: AccessGate::new(store.clone()),
            store,
        }
    }

    /// Invites `user_id` into the project as `role`, status PENDING
    ///
    /// Only the project owner may invite.
    ///
    /// # Errors
    ///
    /// - `Access` if the principal is not the owner
    /// - `Store(NotFound)` if the invitee does not exist
    /// - `Store(DuplicateMembership)` if the pair already has a row, whatever its status
    #[instrument(skip(self))]
    pub async fn invite(
        &self,
        principal: &Principal,
        project_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> ServiceResult<Membership> {
        self.gate
            .authorize(principal, project_id, ProjectPermission::Manage.allowed_roles())
            .await?;

        if self.store.find_user_by_id(user_id).await?.is_none() {
            return Err(StoreError::not_found("User", user_id).into());
        }

        let membership = self
            .store
            .insert_membership(NewMembership::invitation(project_id, user_id, role))
            .await?;

        info!(project_id, user_id, role = %role, "Invitation created");
        Ok(membership)
    }

    /// Accepts or rejects the principal's own pending invitation
    ///
    /// Returns the ACCEPTED membership on accept and `None` on reject. Of two
    /// concurrent responses only the first to commit succeeds.
    ///
    /// # Errors
    ///
    /// - `Store(InvitationNotFound)` if there is no row for the pair
    /// - `Store(AlreadyResolved)` if the invitation was already accepted
    #[instrument(skip(self))]
    pub async fn respond_to_invitation(
        &self,
        principal: &Principal,
        project_id: i64,
        accept: bool,
    ) -> ServiceResult<Option<Membership>> {
        let resolved = self
            .store
            .resolve_invitation(project_id, principal.user_id, accept)
            .await?;

        info!(
            project_id,
            user_id = principal.user_id,
            accepted = accept,
            "Invitation answered"
        );
        Ok(resolved)
    }

    /// Projects the user is an accepted member of
    pub async fn list_accepted(&self, user_id: i64) -> ServiceResult<Vec<Project>> {
        Ok(self.store.list_projects_for_member(user_id).await?)
    }

    /// Invitations still waiting for the user's answer, newest first
    pub async fn list_pending(&self, user_id: i64) -> ServiceResult<Vec<Invitation>> {
        Ok(self.store.list_pending_invitations(user_id).await?)
    }

    /// The membership row for the pair, whatever its status
    pub async fn lookup(&self, project_id: i64, user_id: i64) -> ServiceResult<Membership> {
        self.store
            .find_membership(project_id, user_id)
            .await?
            .ok_or_else(|| StoreError::MembershipNotFound { project_id, user_id }.into())
    }

    /// Every member and invitee of the project; any accepted member may look
    pub async fn list_members(
        &self,
        principal: &Principal,
        project_id: i64,
    ) -> ServiceResult<Vec<ProjectMember>> {
        self.gate
            .authorize(principal, project_id, ProjectPermission::Read.allowed_roles())
            .await?;

        Ok(self.store.list_project_members(project_id).await?)
    }

    /// Removes every membership of the project in its own transaction
    ///
    /// Project deletion does not call this; it runs the same step as part of
    /// its cascade.
    pub async fn delete_all_for_project(&self, project_id: i64) -> ServiceResult<u64> {
        let report = self
            .store
            .run_cascade(&[CascadeStep::DeleteProjectMemberships(project_id)])
            .await?;

        Ok(report.total_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::models::membership::MemberStatus;
    use crate::services::projects::ProjectLifecycle;
    use crate::services::testing;
    use crate::services::ServiceError;

    struct Fixture {
        members: MembershipService,
        owner: Principal,
        invitee: Principal,
        project_id: i64,
    }

    async fn fixture() -> Fixture {
        let (_, store) = testing::store();
        let owner = testing::register(&store, "a@x.com").await;
        let invitee = testing::register(&store, "b@x.com").await;
        let project = ProjectLifecycle::new(store.clone())
            .create_project(&owner, "Launch", None, None, None)
            .await
            .unwrap();

        Fixture {
            members: MembershipService::new(store),
            owner,
            invitee,
            project_id: project.id,
        }
    }

    #[tokio::test]
    async fn test_invite_creates_pending_membership() {
        let f = fixture().await;

        let m = f
            .members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Editor)
            .await
            .unwrap();
        assert_eq!((m.role, m.status), (MemberRole::Editor, MemberStatus::Pending));

        let pending = f.members.list_pending(f.invitee.user_id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].project_name, "Launch");
        assert_eq!(pending[0].inviter_id, f.owner.user_id);

        assert!(f.members.list_accepted(f.invitee.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invite_twice_is_duplicate() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Viewer)
            .await
            .unwrap();

        let again = f
            .members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Editor)
            .await;
        assert!(matches!(
            again,
            Err(ServiceError::Store(StoreError::DuplicateMembership { .. }))
        ));

        // the owner already has a row too
        let self_invite = f
            .members
            .invite(&f.owner, f.project_id, f.owner.user_id, MemberRole::Viewer)
            .await;
        assert!(matches!(
            self_invite,
            Err(ServiceError::Store(StoreError::DuplicateMembership { .. }))
        ));
    }

    #[tokio::test]
    async fn test_only_owner_can_invite() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Editor)
            .await
            .unwrap();
        f.members
            .respond_to_invitation(&f.invitee, f.project_id, true)
            .await
            .unwrap();

        let result = f
            .members
            .invite(&f.invitee, f.project_id, f.owner.user_id, MemberRole::Viewer)
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Access(AuthzError::InsufficientRole { actual: MemberRole::Editor }))
        ));
    }

    #[tokio::test]
    async fn test_invite_unknown_user() {
        let f = fixture().await;

        let result = f
            .members
            .invite(&f.owner, f.project_id, 999, MemberRole::Viewer)
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::NotFound { entity: "User", id: 999 }))
        ));
    }

    #[tokio::test]
    async fn test_accept_then_respond_again() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Editor)
            .await
            .unwrap();

        let accepted = f
            .members
            .respond_to_invitation(&f.invitee, f.project_id, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(accepted.status, MemberStatus::Accepted);

        let projects = f.members.list_accepted(f.invitee.user_id).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert!(f.members.list_pending(f.invitee.user_id).await.unwrap().is_empty());

        for accept in [true, false] {
            let again = f
                .members
                .respond_to_invitation(&f.invitee, f.project_id, accept)
                .await;
            assert!(matches!(
                again,
                Err(ServiceError::Store(StoreError::AlreadyResolved {
                    status: MemberStatus::Accepted,
                    ..
                }))
            ));
        }
    }

    #[tokio::test]
    async fn test_reject_removes_membership() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Editor)
            .await
            .unwrap();

        let rejected = f
            .members
            .respond_to_invitation(&f.invitee, f.project_id, false)
            .await
            .unwrap();
        assert!(rejected.is_none());

        let invitee_id = f.invitee.user_id;
        assert!(matches!(
            f.members.lookup(f.project_id, invitee_id).await,
            Err(ServiceError::Store(StoreError::MembershipNotFound { project_id, user_id }))
                if project_id == f.project_id && user_id == invitee_id
        ));
        assert!(matches!(
            f.members.respond_to_invitation(&f.invitee, f.project_id, true).await,
            Err(ServiceError::Store(StoreError::InvitationNotFound { .. }))
        ));

        // a fresh invitation is allowed after a rejection
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Viewer)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_respond_without_invitation() {
        let f = fixture().await;

        let result = f
            .members
            .respond_to_invitation(&f.invitee, f.project_id, true)
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::InvitationNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_responses_only_one_wins() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Editor)
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            f.members.respond_to_invitation(&f.invitee, f.project_id, true),
            f.members.respond_to_invitation(&f.invitee, f.project_id, false),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(ServiceError::Store(
                StoreError::InvitationNotFound { .. } | StoreError::AlreadyResolved { .. }
            ))
        )));
    }

    #[tokio::test]
    async fn test_list_members_requires_access() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Viewer)
            .await
            .unwrap();

        let members = f.members.list_members(&f.owner, f.project_id).await.unwrap();
        assert_eq!(members.len(), 2);

        // a pending invitee sees nothing
        assert!(matches!(
            f.members.list_members(&f.invitee, f.project_id).await,
            Err(ServiceError::Access(AuthzError::NoAccess { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_all_for_project() {
        let f = fixture().await;
        f.members
            .invite(&f.owner, f.project_id, f.invitee.user_id, MemberRole::Viewer)
            .await
            .unwrap();

        assert_eq!(f.members.delete_all_for_project(f.project_id).await.unwrap(), 2);
        assert!(f.members.list_accepted(f.owner.user_id).await.unwrap().is_empty());
    }
}

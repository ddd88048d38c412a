/// Comments on tasks
///
/// Any accepted member of the task's project may read and write comments.
/// A comment can be deleted by its author while they still have access, or
/// by the project owner.

use std::sync::Arc;

use tracing::{info, instrument};

use super::{ServiceError, ServiceResult};
use crate::auth::authorization::{AccessGate, ProjectPermission};
use crate::auth::middleware::Principal;
use crate::models::comment::{Comment, NewComment};
use crate::models::membership::MemberRole;
use crate::models::task::Task;
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
    gate: AccessGate,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            gate: AccessGate::new(store.clone()),
            store,
        }
    }

    #[instrument(skip(self, content))]
    pub async fn create(
        &self,
        principal: &Principal,
        task_id: i64,
        content: &str,
    ) -> ServiceResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("Comment content is required".to_string()));
        }

        let task = self.readable_task(principal, task_id).await?;

        let comment = self
            .store
            .create_comment(NewComment {
                task_id: task.id,
                user_id: principal.user_id,
                content: content.to_string(),
            })
            .await?;

        info!(comment_id = comment.id, task_id, "Comment added");
        Ok(comment)
    }

    /// Comments on a task, newest first
    pub async fn list(&self, principal: &Principal, task_id: i64) -> ServiceResult<Vec<Comment>> {
        self.readable_task(principal, task_id).await?;

        Ok(self.store.list_comments_for_task(task_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, principal: &Principal, comment_id: i64) -> ServiceResult<()> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Comment", comment_id))?;
        let task = self
            .store
            .find_task(comment.task_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Task", comment.task_id))?;

        let allowed: &[MemberRole] = if comment.user_id == principal.user_id {
            ProjectPermission::Read.allowed_roles()
        } else {
            ProjectPermission::Manage.allowed_roles()
        };
        self.gate.authorize(principal, task.project_id, allowed).await?;

        self.store.delete_comment(comment_id).await?;

        info!(comment_id, task_id = task.id, "Comment deleted");
        Ok(())
    }

    async fn readable_task(&self, principal: &Principal, task_id: i64) -> ServiceResult<Task> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Task", task_id))?;

        self.gate
            .authorize(principal, task.project_id, ProjectPermission::Read.allowed_roles())
            .await?;

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::models::task::CreateTask;
    use crate::services::membership::MembershipService;
    use crate::services::projects::ProjectLifecycle;
    use crate::services::tasks::TaskService;
    use crate::services::testing;

    struct Fixture {
        comments: CommentService,
        owner: Principal,
        editor: Principal,
        viewer: Principal,
        task_id: i64,
    }

    async fn fixture() -> Fixture {
        let (_, store) = testing::store();
        let owner = testing::register(&store, "a@x.com").await;
        let editor = testing::register(&store, "b@x.com").await;
        let viewer = testing::register(&store, "c@x.com").await;

        let projects = ProjectLifecycle::new(store.clone());
        let members = MembershipService::new(store.clone());
        let project = projects.create_project(&owner, "Launch", None, None, None).await.unwrap();
        for (who, role) in [(editor, MemberRole::Editor), (viewer, MemberRole::Viewer)] {
            projects.add_member(&owner, project.id, who.user_id, role).await.unwrap();
            members.respond_to_invitation(&who, project.id, true).await.unwrap();
        }

        let task = TaskService::new(store.clone())
            .create(
                &owner,
                project.id,
                CreateTask {
                    title: "Plan".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Fixture {
            comments: CommentService::new(store),
            owner,
            editor,
            viewer,
            task_id: task.id,
        }
    }

    #[tokio::test]
    async fn test_viewer_can_comment() {
        let f = fixture().await;

        let comment = f.comments.create(&f.viewer, f.task_id, " looks good ").await.unwrap();
        assert_eq!(comment.content, "looks good");
        assert_eq!(comment.user_id, f.viewer.user_id);

        assert!(matches!(
            f.comments.create(&f.viewer, f.task_id, "").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let f = fixture().await;
        f.comments.create(&f.owner, f.task_id, "first").await.unwrap();
        f.comments.create(&f.editor, f.task_id, "second").await.unwrap();

        let listed = f.comments.list(&f.viewer, f.task_id).await.unwrap();
        let contents: Vec<_> = listed.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["second", "first"]);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let f = fixture().await;
        let by_viewer = f.comments.create(&f.viewer, f.task_id, "mine").await.unwrap();
        let by_editor = f.comments.create(&f.editor, f.task_id, "theirs").await.unwrap();

        // an editor cannot remove someone else's comment
        assert!(matches!(
            f.comments.delete(&f.editor, by_viewer.id).await,
            Err(ServiceError::Access(AuthzError::InsufficientRole { .. }))
        ));

        f.comments.delete(&f.viewer, by_viewer.id).await.unwrap();
        f.comments.delete(&f.owner, by_editor.id).await.unwrap();

        assert!(f.comments.list(&f.owner, f.task_id).await.unwrap().is_empty());
        assert!(matches!(
            f.comments.delete(&f.owner, by_editor.id).await,
            Err(ServiceError::Store(StoreError::NotFound { entity: "Comment", .. }))
        ));
    }

    #[tokio::test]
    async fn test_outsider_is_denied() {
        let f = fixture().await;
        let outsider = Principal { user_id: 999 };

        assert!(matches!(
            f.comments.list(&outsider, f.task_id).await,
            Err(ServiceError::Access(AuthzError::NoAccess { .. }))
        ));
    }
}

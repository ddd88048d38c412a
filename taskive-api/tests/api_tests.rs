/// End-to-end tests for the HTTP surface
///
/// Each test builds the full router over a fresh in-memory store and drives
/// it with `tower::ServiceExt::oneshot`.

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let (status, body) = ctx.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice@example.com").await;

    let (status, body) = ctx.get("/auth/me", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());

    let (status, body) = ctx
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_register_conflicts_and_validation() {
    let ctx = TestContext::new();
    ctx.user("alice@example.com").await;

    let (status, _) = ctx
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "alice@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "not-an-email", "password": "secret1" })),
        )
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let (status, _) = ctx.request(Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/api/projects", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invitation_rejected_scenario() {
    let ctx = TestContext::new();
    let owner = ctx.user("owner@example.com").await;
    let invitee = ctx.user("invitee@example.com").await;
    let project_id = ctx.project(&owner, "Launch").await;

    let (status, body) = ctx
        .post(
            &format!("/api/projects/{}/invite", project_id),
            &owner.token,
            json!({ "user_id": invitee.id, "role": "EDITOR" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");

    let (status, body) = ctx.get("/api/invitations", &invitee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["project_name"], "Launch");

    let (status, body) = ctx
        .post(
            &format!("/api/invitations/{}/respond", project_id),
            &invitee.token,
            json!({ "accept": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
    assert!(body["membership"].is_null());

    // the invitee never gained access
    let (status, _) = ctx
        .get(&format!("/api/projects/{}", project_id), &invitee.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.get("/api/projects", &invitee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    // answering again finds nothing
    let (status, _) = ctx
        .post(
            &format!("/api/invitations/{}/accept", project_id),
            &invitee.token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invitation_accepted_and_duplicates() {
    let ctx = TestContext::new();
    let owner = ctx.user("owner@example.com").await;
    let invitee = ctx.user("invitee@example.com").await;
    let project_id = ctx.project(&owner, "Launch").await;

    ctx.add_member(&owner, project_id, &invitee, "EDITOR").await;

    let (status, _) = ctx
        .post(
            &format!("/api/projects/{}/invite", project_id),
            &owner.token,
            json!({ "user_id": invitee.id, "role": "VIEWER" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .post(
            &format!("/api/invitations/{}/reject", project_id),
            &invitee.token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx.get("/api/projects", &invitee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], project_id);

    let (status, body) = ctx
        .get(&format!("/api/projects/{}/members", project_id), &invitee.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let ctx = TestContext::new();
    let owner = ctx.user("owner@example.com").await;
    let editor = ctx.user("editor@example.com").await;
    let viewer = ctx.user("viewer@example.com").await;
    let project_id = ctx.project(&owner, "Launch").await;
    ctx.add_member(&owner, project_id, &editor, "EDITOR").await;
    ctx.add_member(&owner, project_id, &viewer, "VIEWER").await;

    let tasks_uri = format!("/api/projects/{}/tasks", project_id);

    let (status, _) = ctx.post(&tasks_uri, &viewer.token, json!({ "title": "Plan" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, task) = ctx.post(&tasks_uri, &editor.token, json!({ "title": "Plan" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["priority"], "MEDIUM");

    let (status, body) = ctx.get(&tasks_uri, &viewer.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let task_id = task["id"].as_i64().unwrap();
    let (status, body) = ctx
        .patch(
            &format!("/api/tasks/{}/status", task_id),
            &editor.token,
            json!({ "status": "DONE" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DONE");

    // only the owner manages the project
    let (status, _) = ctx
        .put(
            &format!("/api/projects/{}", project_id),
            &editor.token,
            json!({ "name": "Renamed" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post(
            &format!("/api/projects/{}/invite", project_id),
            &editor.token,
            json!({ "user_id": viewer.id, "role": "VIEWER" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .delete(&format!("/api/projects/{}", project_id), &editor.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_project_cascades() {
    let ctx = TestContext::new();
    let owner = ctx.user("owner@example.com").await;
    let member = ctx.user("member@example.com").await;
    let project_id = ctx.project(&owner, "Launch").await;
    ctx.add_member(&owner, project_id, &member, "EDITOR").await;

    let tasks_uri = format!("/api/projects/{}/tasks", project_id);
    let (_, task) = ctx.post(&tasks_uri, &owner.token, json!({ "title": "Plan" })).await;
    ctx.post(&tasks_uri, &owner.token, json!({ "title": "Ship" })).await;

    let comments_uri = format!("/api/tasks/{}/comments", task["id"]);
    let (status, _) = ctx
        .post(&comments_uri, &member.token, json!({ "content": "on it" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .delete(&format!("/api/projects/{}", project_id), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_id"], project_id);
    assert_eq!(body["memberships_removed"], 2);
    assert_eq!(body["tasks_removed"], 2);
    assert_eq!(body["comments_removed"], 1);

    assert_eq!(ctx.store.row_counts().await, (0, 0, 0));

    let (status, _) = ctx
        .get(&format!("/api/projects/{}", project_id), &owner.token)
        .await;
    assert!(status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_lifecycle() {
    let ctx = TestContext::new();
    let owner = ctx.user("owner@example.com").await;
    let viewer = ctx.user("viewer@example.com").await;
    let project_id = ctx.project(&owner, "Launch").await;
    ctx.add_member(&owner, project_id, &viewer, "VIEWER").await;

    let (_, task) = ctx
        .post(
            &format!("/api/projects/{}/tasks", project_id),
            &owner.token,
            json!({ "title": "Plan" }),
        )
        .await;
    let comments_uri = format!("/api/tasks/{}/comments", task["id"]);

    let (status, comment) = ctx
        .post(&comments_uri, &viewer.token, json!({ "content": "looks good" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["user_id"], viewer.id);

    let (status, _) = ctx
        .post(&comments_uri, &viewer.token, json!({ "content": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx.get(&comments_uri, &owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = ctx
        .delete(&format!("/api/comments/{}", comment["id"]), &owner.token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = ctx
        .delete(&format!("/api/tasks/{}", task["id"]), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comments_removed"], 0);
}

#[tokio::test]
async fn test_find_user_by_email() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice@example.com").await;
    let bob = ctx.user("bob@example.com").await;

    let (status, body) = ctx
        .get("/api/users?email=bob@example.com", &alice.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], bob.id);

    let (status, _) = ctx
        .get("/api/users?email=nobody@example.com", &alice.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_present() {
    let ctx = TestContext::new();
    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        ctx.app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap()
    };

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.get("strict-transport-security").is_none());
}

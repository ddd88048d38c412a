//! Common test utilities for integration tests
//!
//! Every `TestContext` owns a fresh in-memory store, so tests are isolated
//! from each other and need no database.
//!
//! - Router construction with a test configuration
//! - User registration and login through the real endpoints
//! - JSON request helpers

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use taskive_api::app::{build_router, AppState};
use taskive_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskive_shared::store::memory::MemoryStore;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "secret1";

/// A registered user with a valid token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            ttl_hours: 24,
        },
    }
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = test_config();
        let app = build_router(AppState::new(store.clone(), config.clone()));

        TestContext { store, app, config }
    }

    /// Sends a request and returns the status and the JSON body (`Null` if empty)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers and logs in a user through the API
    pub async fn user(&self, email: &str) -> TestUser {
        let name = email.split('@').next().unwrap_or(email);
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            email: email.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a project owned by `owner` and returns its ID
    pub async fn project(&self, owner: &TestUser, name: &str) -> i64 {
        let (status, body) = self
            .post("/api/projects", &owner.token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        body["id"].as_i64().unwrap()
    }

    /// Invites `user` into the project and accepts on their behalf
    pub async fn add_member(&self, owner: &TestUser, project_id: i64, user: &TestUser, role: &str) {
        let (status, body) = self
            .post(
                &format!("/api/projects/{}/invite", project_id),
                &owner.token,
                json!({ "user_id": user.id, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);

        let (status, body) = self
            .post(
                &format!("/api/invitations/{}/accept", project_id),
                &user.token,
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "accept failed: {}", body);
    }
}

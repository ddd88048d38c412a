/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskive_api::{app::AppState, config::Config};
/// use taskive_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = taskive_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use taskive_shared::{
    auth::middleware::{bearer_auth, IdentityResolver},
    services::{
        accounts::AccountService, comments::CommentService, membership::MembershipService,
        projects::ProjectLifecycle, tasks::TaskService,
    },
    store::Store,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Services are
/// built once here; each is a handful of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// The only shared mutable resource
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    pub resolver: IdentityResolver,
    pub accounts: AccountService,
    pub members: MembershipService,
    pub projects: ProjectLifecycle,
    pub tasks: TaskService,
    pub comments: CommentService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let secret: Arc<str> = Arc::from(config.jwt.secret.as_str());

        Self {
            resolver: IdentityResolver::new(secret.clone()),
            accounts: AccountService::new(store.clone(), secret, config.jwt.ttl_hours),
            members: MembershipService::new(store.clone()),
            projects: ProjectLifecycle::new(store.clone()),
            tasks: TaskService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                         # public
/// ├── POST /auth/register                  # public
/// ├── POST /auth/login                     # public
/// ├── GET  /auth/me                        # bearer
/// └── /api/                                # bearer
///     ├── GET  /users?email=
///     ├── /projects
///     │   ├── POST /  GET /
///     │   ├── GET|PUT|DELETE /:id
///     │   ├── POST /:id/invite
///     │   ├── GET  /:id/members
///     │   └── GET|POST /:id/tasks
///     ├── /invitations
///     │   ├── GET  /
///     │   └── POST /:id/accept  /:id/reject  /:id/respond
///     ├── /tasks
///     │   ├── GET|PUT|DELETE /:id
///     │   ├── PATCH /:id/status
///     │   └── GET|POST /:id/comments
///     └── DELETE /comments/:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Bearer authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login));

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id/invite", post(routes::projects::invite_member))
        .route("/:id/members", get(routes::projects::list_members))
        .route(
            "/:id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        );

    let invitation_routes = Router::new()
        .route("/", get(routes::invitations::list_invitations))
        .route("/:id/accept", post(routes::invitations::accept_invitation))
        .route("/:id/reject", post(routes::invitations::reject_invitation))
        .route("/:id/respond", post(routes::invitations::respond_to_invitation));

    let task_routes = Router::new()
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_task_status))
        .route(
            "/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        );

    let api_routes = Router::new()
        .route("/users", get(routes::users::find_user))
        .nest("/projects", project_routes)
        .nest("/invitations", invitation_routes)
        .nest("/tasks", task_routes)
        .route("/comments/:id", delete(routes::comments::delete_comment));

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.resolver.clone(),
            bearer_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.allows_any_origin() {
        // Development mode: any origin, no credentials
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

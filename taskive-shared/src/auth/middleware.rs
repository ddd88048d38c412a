/// Bearer-token authentication for Axum
///
/// [`IdentityResolver`] turns a raw `Authorization` header value into a
/// [`Principal`] or a classified [`AuthError`]. Resolution is purely
/// cryptographic and time-based: no database lookup, no revocation list.
///
/// [`bearer_auth`] wraps the resolver as Axum middleware. On success it inserts
/// the `Principal` into the request extensions, where handlers pick it up with
/// `Extension<Principal>`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskive_shared::auth::middleware::{bearer_auth, IdentityResolver, Principal};
///
/// async fn whoami(Extension(principal): Extension<Principal>) -> String {
///     format!("user {}", principal.user_id)
/// }
///
/// let resolver = IdentityResolver::new("your-jwt-secret-at-least-32-bytes!");
/// let app: Router = Router::new()
///     .route("/me", get(whoami))
///     .layer(middleware::from_fn_with_state(resolver, bearer_auth));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::jwt::{verify_token, JwtError};

/// The authenticated user for the duration of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
}

/// Classified authentication failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header, or an empty one
    #[error("Missing credentials")]
    MissingCredentials,

    /// Header is not of the form `Bearer <token>`
    #[error("Malformed credentials: expected 'Bearer <token>'")]
    MalformedCredentials,

    /// Token failed verification
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::MalformedCredentials => "malformed_credentials",
            AuthError::InvalidToken(_) => "invalid_token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(body),
        )
            .into_response()
    }
}

/// Resolves bearer tokens into principals
///
/// Cheap to clone; the secret is shared.
#[derive(Clone)]
pub struct IdentityResolver {
    secret: Arc<str>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Resolves an `Authorization` header value
    ///
    /// - absent or blank header: `MissingCredentials`
    /// - anything but exactly two whitespace-separated parts with a
    ///   case-insensitive `bearer` scheme: `MalformedCredentials`
    /// - token that fails verification: `InvalidToken`
    pub fn resolve(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let header = header.map(str::trim).unwrap_or_default();
        if header.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let mut parts = header.split_whitespace();
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => token,
            _ => return Err(AuthError::MalformedCredentials),
        };

        let user_id = verify_token(token, &self.secret).map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("token expired".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        })?;

        Ok(Principal { user_id })
    }
}

/// Bearer authentication middleware
///
/// Use with `axum::middleware::from_fn_with_state`. Rejects with 401 and a JSON
/// body; a header that is not valid UTF-8 counts as malformed.
pub async fn bearer_auth(
    State(resolver): State<IdentityResolver>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedCredentials)?),
    };

    let principal = resolver.resolve(header).map_err(|e| {
        debug!(error = %e, path = %req.uri().path(), "Authentication rejected");
        e
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// JWT token generation and validation
///
/// Access tokens are signed with HS256 using the service secret and carry the
/// user ID as `sub` plus an absolute expiry. Verification is all-or-nothing:
/// signature, algorithm, issuer, `nbf` and `exp` must all check out, with no
/// clock leeway.
///
/// # Security
///
/// - **Algorithm**: HS256 only. Tokens declaring any other algorithm,
///   including `none`, are rejected.
/// - **Expiration**: 24 hours by default ([`DEFAULT_TOKEN_TTL_HOURS`])
/// - **Secret**: must be non-empty; production configs require 32+ bytes
/// - **Revocation**: none. A token is valid until it expires.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use taskive_shared::auth::jwt::{issue_token, verify_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let token = issue_token(42, secret, Duration::hours(24))?;
///
/// assert_eq!(verify_token(&token, secret)?, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer written into and required from every token
pub const TOKEN_ISSUER: &str = "taskive";

/// Default token lifetime in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// No signing secret configured
    #[error("JWT secret is empty")]
    MissingSecret,

    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature, algorithm, issuer or structure check failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims
///
/// - `sub`: user ID in decimal, as a string
/// - `iss`: always [`TOKEN_ISSUER`]
/// - `iat` / `nbf`: issue time (Unix seconds)
/// - `exp`: absolute expiry (Unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
}

impl Claims {
    /// Creates claims for `user_id` expiring `ttl` from now
    ///
    /// A negative `ttl` produces already-expired claims, which is only
    /// useful in tests.
    pub fn new(user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
        }
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// - `JwtError::MissingSecret` if `secret` is empty
/// - `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a token for `user_id` valid for `ttl`
pub fn issue_token(user_id: i64, secret: &str, ttl: Duration) -> Result<String, JwtError> {
    create_token(&Claims::new(user_id, ttl), secret)
}

/// Validates a token and returns its claims
///
/// Verifies:
/// - Algorithm is HS256 and the signature matches `secret`
/// - Issuer is [`TOKEN_ISSUER`]
/// - `nbf` has passed and `exp` has not, with zero leeway
///
/// # Errors
///
/// - `JwtError::Expired` if the token is past its expiry
/// - `JwtError::InvalidToken` for every other failure
/// - `JwtError::MissingSecret` if `secret` is empty
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and returns the user ID it was issued for
///
/// A `sub` that is not a decimal user ID is `InvalidToken`.
pub fn verify_token(token: &str, secret: &str) -> Result<i64, JwtError> {
    let claims = validate_token(token, secret)?;

    claims
        .sub
        .parse::<i64>()
        .map_err(|_| JwtError::InvalidToken(format!("Subject is not a user ID: {}", claims.sub)))
}

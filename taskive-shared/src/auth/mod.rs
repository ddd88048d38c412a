/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 token issuance and verification
/// - [`middleware`]: bearer-token identity resolution for Axum
/// - [`authorization`]: project-scoped role checks against the membership store
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use taskive_shared::auth::jwt::issue_token;
/// use taskive_shared::auth::middleware::IdentityResolver;
/// use taskive_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let secret = "a-secret-of-at-least-thirty-two-bytes";
/// let token = issue_token(1, secret, Duration::hours(24))?;
///
/// let principal = IdentityResolver::new(secret).resolve(Some(&format!("Bearer {}", token)))?;
/// assert_eq!(principal.user_id, 1);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;

/// User accounts: registration, login and lookup
///
/// Passwords go through [`hash_password`], tokens through [`issue_token`].
/// Login failures never reveal whether the email exists.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskive_shared::services::accounts::AccountService;
/// use taskive_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let accounts = AccountService::new(
///     Arc::new(MemoryStore::new()),
///     "a-secret-of-at-least-thirty-two-bytes",
///     24,
/// );
///
/// accounts.register("Ada", "ada@example.com", "secret1").await?;
/// let (token, user) = accounts.login("ada@example.com", "secret1").await?;
/// println!("{} logged in with {}", user.name, token);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, instrument, warn};
use validator::ValidateEmail;

use super::{ServiceError, ServiceResult};
use crate::auth::jwt::issue_token;
use crate::auth::middleware::Principal;
use crate::auth::password::{hash_password, verify_password};
use crate::models::user::{CreateUser, User};
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    jwt_secret: Arc<str>,
    token_ttl: Duration,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: impl Into<Arc<str>>, token_ttl_hours: i64) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    /// Creates a user account
    ///
    /// Name and email are trimmed; the email is stored lowercased.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty name or a malformed email
    /// - `Password(WeakSecret)` for a password under 6 characters
    /// - `Store(DuplicateEmail)` if the email is taken
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ServiceResult<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();

        if name.is_empty() {
            return Err(ServiceError::Validation("Name is required".to_string()));
        }
        if !email.as_str().validate_email() {
            return Err(ServiceError::Validation("Invalid email format".to_string()));
        }

        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(CreateUser {
                name: name.to_string(),
                email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Checks credentials and issues an access token
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown email or a wrong password
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(String, User)> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("Login failed: unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login failed: wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = issue_token(user.id, &self.jwt_secret, self.token_ttl)?;

        info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    /// The user behind an authenticated request
    pub async fn current_user(&self, principal: &Principal) -> ServiceResult<User> {
        self.store
            .find_user_by_id(principal.user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", principal.user_id).into())
    }

    /// Looks a user up by email, e.g. to invite them
    pub async fn find_by_email(&self, email: &str) -> ServiceResult<User> {
        let email = email.trim().to_lowercase();

        self.store
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::UnknownEmail(email))
    }
}

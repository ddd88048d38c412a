/// Domain services
///
/// Each service is a thin, cloneable handle over the shared `Arc<dyn Store>`.
/// Operations on project-scoped data take the acting [`Principal`] and pass it
/// through the [`AccessGate`] before touching anything.
///
/// - [`accounts`]: registration, login, user lookup
/// - [`membership`]: invitations and the membership state machine
/// - [`projects`]: project lifecycle, including atomic create and cascading deletes
/// - [`tasks`]: task CRUD
/// - [`comments`]: comments on tasks
///
/// [`Principal`]: crate::auth::middleware::Principal
/// [`AccessGate`]: crate::auth::authorization::AccessGate

pub mod accounts;
pub mod comments;
pub mod membership;
pub mod projects;
pub mod tasks;

use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Access(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No account is registered under this email
    #[error("No user with email {0}")]
    UnknownEmail(String),

    /// Input rejected before reaching the store
    #[error("{0}")]
    Validation(String),
}

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests

    use std::sync::Arc;

    use super::accounts::AccountService;
    use crate::auth::middleware::Principal;
    use crate::store::memory::MemoryStore;
    use crate::store::Store;

    pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    pub fn store() -> (Arc<MemoryStore>, Arc<dyn Store>) {
        let memory = Arc::new(MemoryStore::new());
        let shared: Arc<dyn Store> = memory.clone();
        (memory, shared)
    }

    pub async fn register(store: &Arc<dyn Store>, email: &str) -> Principal {
        let accounts = AccountService::new(store.clone(), SECRET, 24);
        let name = email.split('@').next().unwrap_or(email);
        let user = accounts.register(name, email, "secret1").await.unwrap();
        Principal { user_id: user.id }
    }
}

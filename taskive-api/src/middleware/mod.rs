/// Response middleware for the API server
///
/// Authentication is not here; it lives in the shared crate as
/// `taskive_shared::auth::middleware::bearer_auth` so other binaries can
/// reuse it.

pub mod security;
